//! JSON Lines dataset writer
//!
//! The artifact's first line is a header object holding the global
//! attributes, dimensions and variable catalog; every following line is one
//! [`RadarRecord`]. Global attributes depend on the time coverage, which is
//! only known at the end, so rows are staged in a `.part` file next to the
//! artifact and copied under the header by [`JsonLinesWriter::finish`].

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use super::catalog;
use super::metadata::{computed_attributes, merge_attributes, ReferenceMetadata, RunContext};
use super::record::RadarRecord;
use super::{MessageSink, OutputError, WriteError};
use crate::arinc::Arinc708Message;

/// What [`JsonLinesWriter::finish`] produced
#[derive(Debug, Clone)]
pub struct OutputSummary {
    pub path: PathBuf,
    pub rows: u64,
    /// Reference attributes replaced by computed values
    pub overridden: Vec<String>,
    /// Reference attributes dropped by computed nulls
    pub removed: Vec<String>,
}

#[derive(Debug)]
pub struct JsonLinesWriter {
    path: PathBuf,
    staging_path: PathBuf,
    staging: BufWriter<File>,
    metadata: ReferenceMetadata,
    rows: u64,
    coverage: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

fn io_error(path: &Path, source: io::Error) -> OutputError {
    OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl JsonLinesWriter {
    /// Open the staging file for the flight described by `metadata`
    pub fn create(output_dir: &Path, metadata: ReferenceMetadata) -> Result<Self, OutputError> {
        let stem = metadata.output_stem();
        let path = output_dir.join(format!("{}.jsonl", stem));
        let staging_path = output_dir.join(format!("{}.jsonl.part", stem));

        let file = File::create(&staging_path).map_err(|e| io_error(&staging_path, e))?;
        debug!("Staging rows in {}", staging_path.display());

        Ok(Self {
            path,
            staging_path,
            staging: BufWriter::new(file),
            metadata,
            rows: 0,
            coverage: None,
        })
    }

    /// Final artifact path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Drop the staged rows without writing the artifact
    pub fn discard(self) -> Result<(), OutputError> {
        let Self { staging_path, staging, .. } = self;
        drop(staging);
        fs::remove_file(&staging_path).map_err(|e| io_error(&staging_path, e))
    }

    /// Write the artifact with attributes computed now
    pub fn finish(self) -> Result<OutputSummary, OutputError> {
        let run = RunContext::now(self.coverage);
        self.finish_with(run)
    }

    /// Write the artifact: header line, then the staged rows
    pub fn finish_with(self, run: RunContext) -> Result<OutputSummary, OutputError> {
        let Self {
            path,
            staging_path,
            mut staging,
            metadata,
            rows,
            ..
        } = self;

        staging.flush().map_err(|e| io_error(&staging_path, e))?;
        drop(staging);

        let merged = merge_attributes(&metadata.attributes, computed_attributes(&metadata, &run));
        let header = json!({
            "global_attributes": merged.attributes,
            "dimensions": catalog::dimensions(rows),
            "variables": catalog::variables(),
        });

        let file = File::create(&path).map_err(|e| io_error(&path, e))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer(&mut out, &header)?;
        out.write_all(b"\n").map_err(|e| io_error(&path, e))?;

        let mut staged = File::open(&staging_path).map_err(|e| io_error(&staging_path, e))?;
        io::copy(&mut staged, &mut out).map_err(|e| io_error(&path, e))?;
        out.flush().map_err(|e| io_error(&path, e))?;
        drop(staged);

        fs::remove_file(&staging_path).map_err(|e| io_error(&staging_path, e))?;
        info!("Wrote {} rows to {}", rows, path.display());

        Ok(OutputSummary {
            path,
            rows,
            overridden: merged.overridden,
            removed: merged.removed,
        })
    }
}

impl MessageSink for JsonLinesWriter {
    fn write_message(&mut self, time: DateTime<Utc>, message: &Arinc708Message) -> Result<(), WriteError> {
        let record = RadarRecord::from_message(time, message)?;

        serde_json::to_writer(&mut self.staging, &record).map_err(io::Error::from)?;
        self.staging.write_all(b"\n")?;
        self.rows += 1;

        self.coverage = Some(match self.coverage {
            Some((start, end)) => (start.min(time), end.max(time)),
            None => (time, time),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arinc::parser::tests::build_frame;
    use crate::arinc::{decode_frame, fields};
    use chrono::TimeZone;
    use serde_json::Value;
    use uuid::Uuid;

    fn metadata() -> ReferenceMetadata {
        ReferenceMetadata::from_json(r#"{"flight_number": "c321", "flight_date": "2023-05-17", "project": "WCRP"}"#)
            .unwrap()
    }

    #[test]
    fn test_writes_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonLinesWriter::create(dir.path(), metadata()).unwrap();
        assert_eq!(writer.path(), dir.path().join("faam-wxrx_20230517_r0_c321_l0.jsonl"));

        let t0 = Utc.with_ymd_and_hms(2023, 5, 17, 10, 0, 0).unwrap();
        let good = decode_frame(&build_frame(&[(fields::RANGE, 4)])).unwrap();
        let bad = decode_frame(&build_frame(&[(fields::RANGE, 5)])).unwrap();

        writer.write_message(t0, &good).unwrap();
        assert!(matches!(writer.write_message(t0, &bad), Err(WriteError::Rejected(_))));
        writer
            .write_message(t0 + chrono::Duration::seconds(90), &good)
            .unwrap();
        assert_eq!(writer.rows(), 2);

        let summary = writer
            .finish_with(RunContext {
                created: t0,
                uuid: Uuid::nil(),
                coverage: Some((t0, t0 + chrono::Duration::seconds(90))),
            })
            .unwrap();
        assert_eq!(summary.rows, 2);

        let text = std::fs::read_to_string(&summary.path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let header: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header["global_attributes"]["project"], "WCRP");
        assert_eq!(header["global_attributes"]["time_coverage_duration"], "PT0H1M30S");
        assert_eq!(header["dimensions"]["time"], 2);
        assert_eq!(header["variables"][0]["name"], "time");

        let row: Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(row["range"], 20);
        assert_eq!(row["time"], 1684317690.0);

        assert!(!dir.path().join("faam-wxrx_20230517_r0_c321_l0.jsonl.part").exists());
    }

    #[test]
    fn test_empty_output_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonLinesWriter::create(dir.path(), metadata()).unwrap();
        let summary = writer.finish().unwrap();

        let text = std::fs::read_to_string(&summary.path).unwrap();
        assert_eq!(text.lines().count(), 1);
        let header: Value = serde_json::from_str(&text).unwrap();
        assert!(header["global_attributes"].get("time_coverage_start").is_none());
        assert_eq!(header["dimensions"]["time"], 0);
    }

    #[test]
    fn test_discard_removes_staging() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonLinesWriter::create(dir.path(), metadata()).unwrap();
        let artifact = writer.path().to_path_buf();
        writer.discard().unwrap();
        assert!(!artifact.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let err = JsonLinesWriter::create(Path::new("/nonexistent/output"), metadata()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/output"));
    }
}

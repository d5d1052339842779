//! Size/time log reader
//!
//! The capture computer writes a delimited text log with a short preamble,
//! then one row per poll: wall-clock time, the byte size reached by the
//! capture file, and that file's name.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Records before the first data row: three preamble lines plus the column header
pub const DEFAULT_SKIP_ROWS: usize = 4;

/// Accepted timestamp layouts besides RFC 3339, all read as UTC
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

#[derive(Error, Debug)]
pub enum LogError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}

/// One row of the size/time log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSample {
    pub time: DateTime<Utc>,
    /// Cumulative bytes written to the capture file at `time`
    pub size: u64,
    /// Capture file name the size refers to
    pub file: String,
}

impl LogSample {
    pub fn new(time: DateTime<Utc>, size: u64, file: impl Into<String>) -> Self {
        Self {
            time,
            size,
            file: file.into(),
        }
    }
}

/// Read a size/time log from disk
pub fn read_log(path: &Path, skip_rows: usize) -> Result<Vec<LogSample>, LogError> {
    let file = File::open(path)?;
    parse_log(BufReader::new(file), skip_rows)
}

/// Parse a size/time log, skipping the first `skip_rows` records
pub fn parse_log<R: Read>(reader: R, skip_rows: usize) -> Result<Vec<LogSample>, LogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();

    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        if index < skip_rows {
            continue;
        }

        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(index as u64 + 1);
        let invalid = |reason: String| LogError::InvalidRow { line, reason };

        if record.len() < 3 {
            return Err(invalid(format!("expected 3 fields, found {}", record.len())));
        }

        let time = parse_timestamp(&record[0])
            .ok_or_else(|| invalid(format!("unparseable timestamp {:?}", &record[0])))?;
        let size = record[1]
            .parse::<u64>()
            .map_err(|e| invalid(format!("bad size {:?}: {}", &record[1], e)))?;
        let file = record[2].to_string();
        if file.is_empty() {
            return Err(invalid("empty file name".to_string()));
        }

        samples.push(LogSample { time, size, file });
    }

    Ok(samples)
}

/// Parse a log timestamp. Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.with_timezone(&Utc));
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LOG: &str = "\
Copilot WxRx size log
Started 2023-05-17 09:59:58
Card LP708-1
time,size,file
2023-05-17 10:00:00,0,c1234.tmp
2023-05-17 10:00:10,2000,c1234.tmp
2023-05-17T10:00:20.5,4000,c1234.tmp
";

    #[test]
    fn test_parse_skips_preamble() {
        let samples = parse_log(LOG.as_bytes(), DEFAULT_SKIP_ROWS).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(
            samples[0],
            LogSample::new(Utc.with_ymd_and_hms(2023, 5, 17, 10, 0, 0).unwrap(), 0, "c1234.tmp")
        );
        assert_eq!(samples[1].size, 2000);
        assert_eq!(
            samples[2].time,
            Utc.with_ymd_and_hms(2023, 5, 17, 10, 0, 20).unwrap() + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_parse_trims_fields() {
        let samples = parse_log("2023-05-17 10:00:00 , 12 , a.tmp\n".as_bytes(), 0).unwrap();
        assert_eq!(samples[0].size, 12);
        assert_eq!(samples[0].file, "a.tmp");
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        let err = parse_log("yesterday,12,a.tmp\n".as_bytes(), 0).unwrap_err();
        assert!(matches!(err, LogError::InvalidRow { line: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_parse_rejects_negative_size() {
        let err = parse_log("2023-05-17 10:00:00,-5,a.tmp\n".as_bytes(), 0).unwrap_err();
        assert!(matches!(err, LogError::InvalidRow { .. }));
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let err = parse_log("2023-05-17 10:00:00,5\n".as_bytes(), 0).unwrap_err();
        assert_eq!(err.to_string(), "line 1: expected 3 fields, found 2");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 17, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2023-05-17 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-05-17T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2023/05/17 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-05-17T11:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("17 May"), None);
    }

    #[test]
    fn test_read_log_missing_file() {
        let err = read_log(Path::new("/nonexistent/wxrx.log"), DEFAULT_SKIP_ROWS).unwrap_err();
        assert!(matches!(err, LogError::Io(_)));
    }
}

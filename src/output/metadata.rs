//! Flight metadata and global attributes
//!
//! The reference dataset is a JSON object of global attributes for the flight
//! (flight number, flight date, project, platform ...). Those attributes form
//! the base set; the writer then applies a fixed set of computed attributes
//! on top of them.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const SOFTWARE_URL: &str = "https://www.github.com/FAAM-146/faam-wxrx";
const SOFTWARE_DOI: &str = "10.5281/zenodo.7944619";
const REFERENCES: &str = "https://doi.org/10.5281/zenodo.7944511";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("reference dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reference dataset must be a JSON object of global attributes")]
    NotAnObject,
    #[error("reference dataset has no {0} attribute")]
    MissingAttribute(&'static str),
    #[error("flight_date {0:?} is not a YYYY-MM-DD date")]
    InvalidFlightDate(String),
}

/// Flight identity and base global attributes
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMetadata {
    pub flight_number: String,
    pub flight_date: NaiveDate,
    pub attributes: Map<String, Value>,
}

impl ReferenceMetadata {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        match serde_json::from_str(text)? {
            Value::Object(attributes) => Self::from_attributes(attributes),
            _ => Err(MetadataError::NotAnObject),
        }
    }

    pub fn from_attributes(attributes: Map<String, Value>) -> Result<Self, MetadataError> {
        let flight_number = string_attribute(&attributes, "flight_number")?.to_string();
        let date = string_attribute(&attributes, "flight_date")?;
        let flight_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| MetadataError::InvalidFlightDate(date.to_string()))?;

        Ok(Self {
            flight_number,
            flight_date,
            attributes,
        })
    }

    /// Output file name without extension
    pub fn output_stem(&self) -> String {
        format!(
            "faam-wxrx_{}_r0_{}_l0",
            self.flight_date.format("%Y%m%d"),
            self.flight_number
        )
    }
}

fn string_attribute<'a>(attributes: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, MetadataError> {
    attributes
        .get(key)
        .and_then(Value::as_str)
        .ok_or(MetadataError::MissingAttribute(key))
}

/// Result of merging computed attributes over the base set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedAttributes {
    pub attributes: Map<String, Value>,
    /// Base keys replaced by a computed value
    pub overridden: Vec<String>,
    /// Base keys removed by a computed null
    pub removed: Vec<String>,
}

/// Merge `computed` over `base`.
///
/// Computed values always win. A computed `null` removes the key. Every base
/// key that is replaced or removed is listed in the result.
pub fn merge_attributes(base: &Map<String, Value>, computed: Vec<(&'static str, Value)>) -> MergedAttributes {
    let mut merged = MergedAttributes {
        attributes: base.clone(),
        ..Default::default()
    };

    for (key, value) in computed {
        if value.is_null() {
            if merged.attributes.remove(key).is_some() {
                debug!("Global attribute {} removed", key);
                merged.removed.push(key.to_string());
            }
        } else if merged.attributes.insert(key.to_string(), value).is_some() {
            debug!("Global attribute {} overridden", key);
            merged.overridden.push(key.to_string());
        }
    }

    merged
}

/// Inputs of the computed attribute set that vary per run
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub created: DateTime<Utc>,
    pub uuid: Uuid,
    /// First and last timestamps written, if any rows were written
    pub coverage: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl RunContext {
    pub fn now(coverage: Option<(DateTime<Utc>, DateTime<Utc>)>) -> Self {
        Self {
            created: Utc::now(),
            uuid: Uuid::new_v4(),
            coverage,
        }
    }
}

/// Attributes this tool sets on every output, in application order
pub fn computed_attributes(metadata: &ReferenceMetadata, run: &RunContext) -> Vec<(&'static str, Value)> {
    let date = run
        .coverage
        .map(|(start, _)| start.date_naive())
        .unwrap_or(metadata.flight_date);
    let coverage = |pick: fn(&(DateTime<Utc>, DateTime<Utc>)) -> Value| {
        run.coverage.as_ref().map(pick).unwrap_or(Value::Null)
    };

    vec![
        (
            "comment",
            json!("This file is a JSON Lines representation of the weather radar data from the ARINC708 databus."),
        ),
        ("constants_file", Value::Null),
        ("date_created", json!(run.created.format("%Y-%m-%dT%H:%M:%SZ").to_string())),
        ("processing_software_version", json!(env!("CARGO_PKG_VERSION"))),
        ("processing_software_url", json!(SOFTWARE_URL)),
        ("processing_software_doi", json!(SOFTWARE_DOI)),
        ("processing_software_commit", Value::Null),
        ("references", json!(REFERENCES)),
        (
            "source",
            json!("Captured from the ARINC708 databus on the FAAM WxRx computer, using Copilot v3 and a Ballard Technology LP708-1 interface card."),
        ),
        ("revision_number", json!(0)),
        ("revision_date", json!(run.created.format("%Y-%m-%d").to_string())),
        ("uuid", json!(run.uuid.to_string())),
        ("time_coverage_duration", coverage(|(start, end)| json!(iso8601_duration(*end - *start)))),
        ("time_coverage_end", coverage(|(_, end)| json!(end.format("%Y-%m-%dT%H:%M:%SZ").to_string()))),
        ("time_coverage_start", coverage(|(start, _)| json!(start.format("%Y-%m-%dT%H:%M:%SZ").to_string()))),
        (
            "title",
            json!(format!(
                "FAAM Weather Radar Data for flight {} on {}",
                metadata.flight_number,
                date.format("%Y-%m-%d")
            )),
        ),
        (
            "summary",
            json!(format!(
                "This file contains the weather radar data from the FAAM aircraft, captured during flight {}",
                metadata.flight_number
            )),
        ),
        ("id", json!(metadata.output_stem())),
    ]
}

/// ISO 8601 duration with whole hours, minutes and seconds, e.g. `PT5H3M0S`
pub fn iso8601_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("PT{}H{}M{}S", total / 3600, (total % 3600) / 60, total % 60)
}

//! Output dataset
//!
//! The processor hands every timestamped message to a [`MessageSink`]. The
//! sink converts raw codes to physical units at write time, so a message
//! with an unknown gain or range code is rejected per row without touching
//! the rest of the run.

pub mod catalog;
mod jsonl;
pub mod metadata;
mod record;

pub use jsonl::{JsonLinesWriter, OutputSummary};
pub use metadata::{ReferenceMetadata, MetadataError};
pub use record::RadarRecord;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::arinc::{Arinc708Message, ConvertError};

/// Per-message write failure
#[derive(Error, Debug)]
pub enum WriteError {
    /// The message cannot be represented; skip it and carry on
    #[error(transparent)]
    Rejected(#[from] ConvertError),
    /// The sink itself failed; the run cannot continue
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Destination for timestamped messages, in write order
pub trait MessageSink {
    fn write_message(&mut self, time: DateTime<Utc>, message: &Arinc708Message) -> Result<(), WriteError>;
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode output header: {0}")]
    Json(#[from] serde_json::Error),
}

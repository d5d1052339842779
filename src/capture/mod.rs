//! Raw ARINC 708 capture files
//!
//! The capture card writes bus traffic to disk with no timestamps or framing
//! beyond the delimiter byte that starts every message.

mod scan;

pub use scan::{FrameScanner, RawFrame};

use std::path::Path;

/// Identifier of a capture in the size/time log: its file name
pub fn capture_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

//! Frame boundary detection
//!
//! Scans byte by byte for the delimiter. A delimiter starts a 200-byte frame
//! and the scan resumes after it; the frame body is never re-scanned, so
//! delimiter values inside a payload are not mistaken for frame starts.

use tracing::trace;

use crate::arinc::{DELIMITER, FRAME_LEN};

/// One 200-byte frame borrowed from the capture buffer
pub type RawFrame<'a> = &'a [u8; FRAME_LEN];

/// Iterator over `(byte_offset, frame)` pairs of a capture buffer
pub struct FrameScanner<'a> {
    data: &'a [u8],
    cursor: usize,
    /// Offset and length of a delimiter found too close to the end
    truncated: Option<(usize, usize)>,
}

impl<'a> FrameScanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            truncated: None,
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// A trailing partial frame, as `(offset, available_len)`, once the scan
    /// has reached it. Partial frames are never yielded.
    pub fn truncated_tail(&self) -> Option<(usize, usize)> {
        self.truncated
    }
}

impl<'a> Iterator for FrameScanner<'a> {
    type Item = (usize, RawFrame<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.data.get(self.cursor..)?;
        let start = self.cursor + remaining.iter().position(|&b| b == DELIMITER)?;

        let window = self
            .data
            .get(start..start + FRAME_LEN)
            .and_then(|bytes| <RawFrame<'a>>::try_from(bytes).ok());

        match window {
            Some(frame) => {
                self.cursor = start + FRAME_LEN;
                Some((start, frame))
            }
            None => {
                let len = self.data.len() - start;
                trace!("Partial frame at offset {} ({} bytes)", start, len);
                self.truncated = Some((start, len));
                self.cursor = self.data.len();
                None
            }
        }
    }
}

//! ARINC 708 message parser

use thiserror::Error;

use super::fields::{self, extract_bits};
use super::types::Arinc708Message;
use super::{FRAME_LEN, HEADER_LEN, SAMPLE_BITS, SAMPLE_COUNT};

/// Parse error types
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame is {len} bytes, expected 200")]
    FrameTooShort { len: usize },
}

/// Decode one 200-byte frame.
///
/// Header fields are returned as raw codes; no unit conversion or semantic
/// validation happens here.
pub fn decode_frame(frame: &[u8]) -> Result<Arinc708Message, DecodeError> {
    if frame.len() != FRAME_LEN {
        return Err(DecodeError::FrameTooShort { len: frame.len() });
    }

    let header = &frame[..HEADER_LEN];

    Ok(Arinc708Message {
        label: fields::LABEL.read(header) as u8,
        control_accept: fields::CONTROL_ACCEPT.read(header) as u8,
        slave: fields::SLAVE.read(header) == 1,
        spare1: fields::SPARE1.read(header) as u8,
        mode_annunciation: fields::MODE_ANNUNCIATION.read(header) as u8,
        faults: fields::FAULTS.read(header) as u8,
        stabilization: fields::STABILIZATION.read(header) == 1,
        operating_mode: fields::OPERATING_MODE.read(header) as u8,
        tilt: fields::TILT.read(header) as u8,
        gain: fields::GAIN.read(header) as u8,
        range: fields::RANGE.read(header) as u8,
        spare2: fields::SPARE2.read(header) as u8,
        data_accept: fields::DATA_ACCEPT.read(header) as u8,
        scan_angle: fields::SCAN_ANGLE.read(header) as u16,
        data: decode_samples(&frame[HEADER_LEN..]),
    })
}

/// Split the 1536-bit little-endian payload into 3-bit groups, highest group
/// (bit offset 1533) first.
fn decode_samples(payload: &[u8]) -> Vec<u8> {
    (0..SAMPLE_COUNT)
        .rev()
        .map(|group| extract_bits(payload, group * SAMPLE_BITS, SAMPLE_BITS) as u8)
        .collect()
}

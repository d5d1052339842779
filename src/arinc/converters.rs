//! Raw bitfield to physical unit conversion

use thiserror::Error;

/// Scan angle resolution: 180 degrees over 2^11 codes
const SCAN_ANGLE_LSB_DEG: f32 = 180.0 / 2048.0;

/// Tilt resolution in degrees
const TILT_LSB_DEG: f32 = 0.25;

/// Tilt contribution of the sign bit (bit 6)
const TILT_SIGN_DEG: f32 = -16.0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertError {
    #[error("unknown range code: {0}")]
    UnknownRangeCode(u8),
    #[error("unknown gain code: {0}")]
    UnknownGainCode(u8),
}

/// Scan angle in degrees from the 12-bit code
pub fn scan_angle(raw: u16) -> f32 {
    (raw & 0xFFF) as f32 * SCAN_ANGLE_LSB_DEG
}

/// Tilt in degrees from the 7-bit two's complement code (0.25 degree steps, -16 to +15.75)
pub fn tilt(raw: u8) -> f32 {
    let sign = if raw & 0x40 != 0 { TILT_SIGN_DEG } else { 0.0 };
    sign + (raw & 0x3F) as f32 * TILT_LSB_DEG
}

/// Display range in nautical miles. Code 0 is the maximum range, 320 nm.
pub fn range(raw: u8) -> Result<u16, ConvertError> {
    let nm = match raw & 0x7F {
        1 => 5,
        2 => 10,
        4 => 20,
        8 => 40,
        16 => 80,
        32 => 160,
        63 => 315,
        0 => 320,
        other => return Err(ConvertError::UnknownRangeCode(other)),
    };
    Ok(nm)
}

/// Receiver gain in dB. Code 0 is maximum gain; code 63 reports 1, the
/// calibration marker.
pub fn gain(raw: u8) -> Result<i8, ConvertError> {
    let db = match raw & 0x3F {
        0 => 0,
        63 => 1,
        5 => -5,
        11 => -11,
        62 => -62,
        other => return Err(ConvertError::UnknownGainCode(other)),
    };
    Ok(db)
}

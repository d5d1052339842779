//! Output row with physical units applied

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::arinc::{Arinc708Message, ConvertError};

/// One timestamped radar message, converted for the output dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarRecord {
    /// Seconds since 1970-01-01T00:00:00Z
    pub time: f64,
    pub control_accept: u8,
    pub slave: u8,
    pub mode_annunciation: u8,
    pub faults: u8,
    pub stabilization: u8,
    pub operating_mode: u8,
    /// degrees
    pub tilt: f32,
    /// dB, or 1 while calibrating
    pub gain: i8,
    /// nautical miles
    pub range: u16,
    pub data_accept: u8,
    /// degrees
    pub scan_angle: f32,
    /// Sample codes, nearest range bin first
    pub reflectivity: Vec<u8>,
}

impl RadarRecord {
    /// Convert a decoded message. Fails if the gain or range code is not in
    /// the lookup tables; such messages are dropped rather than defaulted.
    pub fn from_message(time: DateTime<Utc>, message: &Arinc708Message) -> Result<Self, ConvertError> {
        Ok(Self {
            time: time.timestamp_micros() as f64 / 1e6,
            control_accept: message.control_accept,
            slave: message.slave as u8,
            mode_annunciation: message.mode_annunciation,
            faults: message.faults,
            stabilization: message.stabilization as u8,
            operating_mode: message.operating_mode,
            tilt: message.tilt_deg(),
            gain: message.gain_db()?,
            range: message.range_nm()?,
            data_accept: message.data_accept,
            scan_angle: message.scan_angle_deg(),
            reflectivity: message.reflectivity().collect(),
        })
    }
}

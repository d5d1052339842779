//! Variable catalog written into the output header

use serde_json::{json, Value};

use crate::arinc::{ControlAccept, DataAccept, OperatingMode, Reflectivity, SAMPLE_COUNT};

/// Name of the per-row reflectivity dimension
pub const BIN_DIMENSION: &str = "range_bin";

fn flags(values: impl Iterator<Item = (u8, &'static str)>) -> (Value, Value) {
    let (codes, meanings): (Vec<u8>, Vec<&str>) = values.unzip();
    (json!(codes), json!(meanings))
}

fn flag_variable(name: &str, long_name: &str, values: impl Iterator<Item = (u8, &'static str)>) -> Value {
    let (flag_values, flag_meanings) = flags(values);
    json!({
        "name": name,
        "datatype": "u8",
        "dimensions": ["time"],
        "long_name": long_name,
        "flag_values": flag_values,
        "flag_meanings": flag_meanings,
    })
}

fn plain_variable(name: &str, datatype: &str, long_name: &str, units: Option<&str>) -> Value {
    let mut variable = json!({
        "name": name,
        "datatype": datatype,
        "dimensions": ["time"],
        "long_name": long_name,
    });
    if let Some(units) = units {
        variable["units"] = json!(units);
    }
    variable
}

/// Output variables in row field order
pub fn variables() -> Value {
    let (refl_values, refl_meanings) = flags(Reflectivity::ALL.iter().map(|r| (*r as u8, r.description())));

    json!([
        plain_variable("time", "f64", "Time of message", Some("seconds since 1970-01-01 00:00:00 +0000")),
        flag_variable(
            "control_accept",
            "Indicator control acceptance",
            ControlAccept::ALL.iter().map(|c| (*c as u8, c.description())),
        ),
        plain_variable("slave", "u8", "Slave flag", None),
        plain_variable("mode_annunciation", "u8", "Mode annunciation bits", None),
        plain_variable("faults", "u8", "Fault bits", None),
        plain_variable("stabilization", "u8", "Antenna stabilization flag", None),
        flag_variable(
            "operating_mode",
            "Radar operating mode",
            OperatingMode::ALL.iter().map(|m| (*m as u8, m.description())),
        ),
        plain_variable("tilt", "f32", "Antenna tilt", Some("degree")),
        plain_variable("gain", "i8", "Receiver gain (1 indicates calibration)", Some("dB")),
        plain_variable("range", "u16", "Display range", Some("nautical_mile")),
        flag_variable(
            "data_accept",
            "Indicator data acceptance",
            DataAccept::ALL.iter().map(|d| (*d as u8, d.description())),
        ),
        plain_variable("scan_angle", "f32", "Antenna scan angle", Some("degree")),
        {
            "name": "reflectivity",
            "datatype": "u8",
            "dimensions": ["time", BIN_DIMENSION],
            "long_name": "Reflectivity and turbulence code per range bin, nearest bin first",
            "flag_values": refl_values,
            "flag_meanings": refl_meanings,
        },
    ])
}

/// Dimension sizes; `time` is the number of rows written
pub fn dimensions(rows: u64) -> Value {
    json!({
        "time": rows,
        BIN_DIMENSION: SAMPLE_COUNT,
    })
}

//! ARINC 708 data types

use super::converters::{self, ConvertError};

/// Radar operating mode (3-bit field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperatingMode {
    Standby = 0,
    WeatherOnly = 1,
    Map = 2,
    Contour = 3,
    Test = 4,
    TurbulenceOnly = 5,
    TurbulenceAndWeather = 6,
    CalibrationAnnunciation = 7,
}

impl OperatingMode {
    pub const ALL: [Self; 8] = [
        Self::Standby,
        Self::WeatherOnly,
        Self::Map,
        Self::Contour,
        Self::Test,
        Self::TurbulenceOnly,
        Self::TurbulenceAndWeather,
        Self::CalibrationAnnunciation,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Self::Standby => "Standby",
            Self::WeatherOnly => "Weather (only)",
            Self::Map => "Map",
            Self::Contour => "Contour",
            Self::Test => "Test",
            Self::TurbulenceOnly => "Turbulence (only)",
            Self::TurbulenceAndWeather => "Turbulence and Weather",
            Self::CalibrationAnnunciation => "Reserved (calibration annunciation)",
        }
    }
}

impl From<u8> for OperatingMode {
    fn from(raw: u8) -> Self {
        Self::ALL[(raw & 0x7) as usize]
    }
}

/// Indicator control acceptance (2-bit field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlAccept {
    DoNotAccept = 0,
    Ind1 = 1,
    Ind2 = 2,
    AllInds = 3,
}

impl ControlAccept {
    pub const ALL: [Self; 4] = [Self::DoNotAccept, Self::Ind1, Self::Ind2, Self::AllInds];

    pub fn description(self) -> &'static str {
        match self {
            Self::DoNotAccept => "Do not accept control",
            Self::Ind1 => "IND1 accept control",
            Self::Ind2 => "IND2 accept control",
            Self::AllInds => "All INDs accept control",
        }
    }
}

impl From<u8> for ControlAccept {
    fn from(raw: u8) -> Self {
        Self::ALL[(raw & 0x3) as usize]
    }
}

/// Indicator data acceptance (2-bit field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataAccept {
    DoNotAccept = 0,
    Data1 = 1,
    Data2 = 2,
    AnyData = 3,
}

impl DataAccept {
    pub const ALL: [Self; 4] = [Self::DoNotAccept, Self::Data1, Self::Data2, Self::AnyData];

    pub fn description(self) -> &'static str {
        match self {
            Self::DoNotAccept => "Do not accept",
            Self::Data1 => "Accept data 1",
            Self::Data2 => "Accept data 2",
            Self::AnyData => "Accept any data",
        }
    }
}

impl From<u8> for DataAccept {
    fn from(raw: u8) -> Self {
        Self::ALL[(raw & 0x3) as usize]
    }
}

/// Reflectivity/turbulence code of one range bin (3-bit sample)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reflectivity {
    None = 0,
    Light = 1,
    Moderate = 2,
    Heavy = 3,
    VeryHeavy = 4,
    OutOfCalibration = 5,
    MediumTurbulence = 6,
    SevereTurbulence = 7,
}

impl Reflectivity {
    pub const ALL: [Self; 8] = [
        Self::None,
        Self::Light,
        Self::Moderate,
        Self::Heavy,
        Self::VeryHeavy,
        Self::OutOfCalibration,
        Self::MediumTurbulence,
        Self::SevereTurbulence,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Self::None => "No Precipitation (<Z2)",
            Self::Light => "Light Precipitation (Z2 to Z3)",
            Self::Moderate => "Moderate Precipitation (Z3 to Z4)",
            Self::Heavy => "Heavy Precipitation (Z4 to Z5)",
            Self::VeryHeavy => "Very Heavy Precipitation (>Z5)",
            Self::OutOfCalibration => "Reserved (out of cal. indication)",
            Self::MediumTurbulence => "Medium Turbulence",
            Self::SevereTurbulence => "Severe Turbulence",
        }
    }
}

impl From<u8> for Reflectivity {
    fn from(raw: u8) -> Self {
        Self::ALL[(raw & 0x7) as usize]
    }
}

/// Decoded ARINC 708 message.
///
/// Header fields hold the raw bitfield values; the physical-unit accessors
/// below apply the converters on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arinc708Message {
    pub label: u8,
    pub control_accept: u8,
    pub slave: bool,
    pub spare1: u8,
    pub mode_annunciation: u8,
    pub faults: u8,
    pub stabilization: bool,
    pub operating_mode: u8,
    pub tilt: u8,
    pub gain: u8,
    pub range: u8,
    pub spare2: u8,
    pub data_accept: u8,
    pub scan_angle: u16,
    /// Sample codes, most significant payload group first
    pub data: Vec<u8>,
}

impl Arinc708Message {
    pub fn control_accept_kind(&self) -> ControlAccept {
        ControlAccept::from(self.control_accept)
    }

    pub fn data_accept_kind(&self) -> DataAccept {
        DataAccept::from(self.data_accept)
    }

    pub fn operating_mode_kind(&self) -> OperatingMode {
        OperatingMode::from(self.operating_mode)
    }

    /// Antenna tilt in degrees
    pub fn tilt_deg(&self) -> f32 {
        converters::tilt(self.tilt)
    }

    /// Antenna scan angle in degrees
    pub fn scan_angle_deg(&self) -> f32 {
        converters::scan_angle(self.scan_angle)
    }

    /// Receiver gain in dB, or 1 for calibration
    pub fn gain_db(&self) -> Result<i8, ConvertError> {
        converters::gain(self.gain)
    }

    /// Display range in nautical miles
    pub fn range_nm(&self) -> Result<u16, ConvertError> {
        converters::range(self.range)
    }

    /// Samples in reversed order, nearest range bin first
    pub fn reflectivity(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.iter().rev().copied()
    }
}

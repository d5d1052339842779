//! Header bit layout
//!
//! Each header field is a contiguous bit range of the little-endian 64-bit
//! header word, allocated least-significant bit first. The decoder reads every
//! field through [`extract_bits`] using this table, so the layout lives in
//! exactly one place.

/// A named bit range inside a little-endian bit string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    /// Offset of the least significant bit
    pub offset: usize,
    /// Width in bits (at most 57)
    pub width: usize,
}

impl Field {
    const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self { name, offset, width }
    }

    /// Read this field from a little-endian byte string
    pub fn read(&self, bytes: &[u8]) -> u64 {
        extract_bits(bytes, self.offset, self.width)
    }

    /// Largest value the field can hold
    pub fn max(&self) -> u64 {
        (1u64 << self.width) - 1
    }
}

pub const LABEL: Field = Field::new("label", 0, 8);
pub const CONTROL_ACCEPT: Field = Field::new("control_accept", 8, 2);
pub const SLAVE: Field = Field::new("slave", 10, 1);
pub const SPARE1: Field = Field::new("spare1", 11, 2);
pub const MODE_ANNUNCIATION: Field = Field::new("mode_annunciation", 13, 5);
pub const FAULTS: Field = Field::new("faults", 18, 7);
pub const STABILIZATION: Field = Field::new("stabilization", 25, 1);
pub const OPERATING_MODE: Field = Field::new("operating_mode", 26, 3);
pub const TILT: Field = Field::new("tilt", 29, 7);
pub const GAIN: Field = Field::new("gain", 36, 6);
pub const RANGE: Field = Field::new("range", 42, 7);
pub const SPARE2: Field = Field::new("spare2", 49, 1);
pub const DATA_ACCEPT: Field = Field::new("data_accept", 50, 2);
pub const SCAN_ANGLE: Field = Field::new("scan_angle", 52, 12);

/// Header fields in bit order
pub const HEADER_FIELDS: [Field; 14] = [
    LABEL,
    CONTROL_ACCEPT,
    SLAVE,
    SPARE1,
    MODE_ANNUNCIATION,
    FAULTS,
    STABILIZATION,
    OPERATING_MODE,
    TILT,
    GAIN,
    RANGE,
    SPARE2,
    DATA_ACCEPT,
    SCAN_ANGLE,
];

/// Extract `width` bits starting at bit `offset` of a little-endian bit string.
///
/// Bit `n` of the string is bit `n % 8` of byte `n / 8`. Bits past the end of
/// `bytes` read as zero.
pub fn extract_bits(bytes: &[u8], offset: usize, width: usize) -> u64 {
    debug_assert!(width <= 57, "field wider than a single window read");

    let start = offset / 8;
    let shift = offset % 8;

    let mut window = [0u8; 8];
    if start < bytes.len() {
        let end = (start + 8).min(bytes.len());
        window[..end - start].copy_from_slice(&bytes[start..end]);
    }

    (u64::from_le_bytes(window) >> shift) & ((1u64 << width) - 1)
}

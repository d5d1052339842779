//! ARINC 708 weather radar message decoding
//!
//! A message is 1600 bits on the bus: a 64-bit header of packed status fields
//! followed by 512 three-bit reflectivity/turbulence samples. The capture
//! card writes each message as 200 bytes starting with a delimiter byte.

pub mod converters;
pub mod fields;
pub mod parser;
mod types;

pub use converters::ConvertError;
pub use fields::{extract_bits, Field, HEADER_FIELDS};
pub use parser::{decode_frame, DecodeError};
pub use types::{Arinc708Message, ControlAccept, DataAccept, OperatingMode, Reflectivity};

/// Frame delimiter (octal label 055, LSB first)
pub const DELIMITER: u8 = 0b1011_0100;

/// Length of one message as written by the capture card
pub const FRAME_LEN: usize = 200;

/// Header length in bytes
pub const HEADER_LEN: usize = 8;

/// Number of 3-bit samples in the payload
pub const SAMPLE_COUNT: usize = 512;

/// Width of one sample in bits
pub const SAMPLE_BITS: usize = 3;

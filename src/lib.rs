//! FAAM WxRx - ARINC 708 weather radar capture decoder
//!
//! Turns raw ARINC 708 bus captures into a timestamped radar dataset. Frames
//! are found by their delimiter byte, decoded into header fields and
//! reflectivity samples, and timestamped from a log of capture file sizes.

pub mod arinc;
pub mod capture;
pub mod config;
pub mod output;
pub mod processor;
pub mod timeline;

pub use config::Config;
pub use processor::{FrameStats, ProcessStats, Processor};

//! Wire formats delivered to the flight controller.
//!
//! Both encoders write into caller-supplied buffers and never allocate;
//! the host owns the UART and just forwards the bytes.

pub mod msp;
pub mod nmea;

pub use msp::{encode_msp_set_raw_gps, MspGps, MSP_FRAME_LEN};
pub use nmea::{encode_gga, encode_rmc, nmea_checksum, MIN_SENTENCE_BUF};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("output buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
}

//! HID transport plumbing for the Oasis focuser driver
//!
//! This crate describes the minimal capability the focuser core needs from a
//! USB HID stack (enumerate, open, read, write, non-blocking mode, serial
//! string) and ships two implementations: an in-memory mock for tests and,
//! behind the `hidapi` feature, a backend on top of the `hidapi` crate.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod device_info;
#[cfg(feature = "hidapi")]
pub mod hidapi_backend;
pub mod report_parser;
pub mod transport;

pub use device_info::*;
#[cfg(feature = "hidapi")]
pub use hidapi_backend::HidApiBackend;
pub use report_parser::*;
pub use transport::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidCommonError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenError(String),

    #[error("Failed to read from device: {0}")]
    ReadError(String),

    #[error("Failed to write to device: {0}")]
    WriteError(String),

    #[error("Invalid report format: {0}")]
    InvalidReport(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type HidCommonResult<T> = Result<T, HidCommonError>;

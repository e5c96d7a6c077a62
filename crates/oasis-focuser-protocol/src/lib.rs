//! Oasis focuser HID protocol: frame layouts, command encoding, response
//! decoding and temperature conversion.
//!
//! This crate is I/O-free. It provides pure types and functions that can be
//! tested without hardware; the transport lives in `oasis-focuser`.

#![deny(static_mut_refs)]

pub mod codes;
pub mod command;
pub mod error;
pub mod ids;
pub mod names;
pub mod response;
pub mod temperature;
pub mod version;

// Flat re-exports so callers can use `oasis_focuser_protocol::Foo`.
pub use codes::{
    BUILD_TAG_LEN, NAME_LEN, PAYLOAD_LEN, REPORT_ID, REPORT_LEN, command_codes, config_mask,
    frame_lengths,
};
pub use command::{Command, ConfigField, ConfigFrame, Report};
pub use error::{ProtocolError, ProtocolResult};
pub use ids::{OASIS_FOCUSER_PRODUCT_ID, OASIS_VENDOR_ID, is_oasis_focuser};
pub use names::{decode_c_string, effective_name, name_field};
pub use response::{Response, StatusReport};
pub use temperature::{
    AD_MAX, EXTERNAL_PROBE_PRESENT, centi_to_celsius, external_probe_centi_celsius,
    ntc_centi_celsius,
};
pub use version::FirmwareVersion;

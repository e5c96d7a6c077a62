//! Firmware version decoding.

#![deny(static_mut_refs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Firmware version from the version ack.
///
/// The 32-bit firmware word packs four one-byte components, most significant
/// first once read in network order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub protocol: u32,
    pub hardware: u32,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub build: u8,
    /// ASCII build tag, e.g. a build date.
    pub built: String,
}

impl FirmwareVersion {
    pub fn from_words(protocol: u32, hardware: u32, firmware: u32, built: String) -> Self {
        let [major, minor, patch, build] = firmware.to_be_bytes();
        Self {
            protocol,
            hardware,
            major,
            minor,
            patch,
            build,
            built,
        }
    }

    pub fn firmware_word(&self) -> u32 {
        u32::from_be_bytes([self.major, self.minor, self.patch, self.build])
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{} {}",
            self.major, self.minor, self.patch, self.build, self.built
        )
    }
}

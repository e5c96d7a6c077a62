//! Enumeration entries for attached HID devices

use serde::{Deserialize, Serialize};

/// What enumeration reports about one attached device.
///
/// Focusers are told apart by `serial_number`; `path` is only meaningful to
/// the backend that produced the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    pub path: String,
}

impl HidDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            serial_number: None,
            manufacturer: None,
            product_name: None,
            path: path.into(),
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    /// True when this entry carries exactly the given serial number.
    pub fn has_serial(&self, serial: &str) -> bool {
        self.serial_number.as_deref() == Some(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOCUSER: (u16, u16) = (0x338f, 0xa0f0);

    #[test]
    fn test_entry_matches_only_its_ids() {
        let info = HidDeviceInfo::new(FOCUSER.0, FOCUSER.1, "/dev/hidraw3");
        assert!(info.matches(FOCUSER.0, FOCUSER.1));
        assert!(!info.matches(FOCUSER.0, 0xa0f1));
        assert!(!info.matches(0x0483, FOCUSER.1));
    }

    #[test]
    fn test_serial_must_match_exactly() {
        let info = HidDeviceInfo::new(FOCUSER.0, FOCUSER.1, "/dev/hidraw3").with_serial("OF0042");
        assert!(info.has_serial("OF0042"));
        assert!(!info.has_serial("OF004"));
        assert!(!info.has_serial(""));

        let anonymous = HidDeviceInfo::new(FOCUSER.0, FOCUSER.1, "/dev/hidraw4");
        assert!(!anonymous.has_serial(""));
    }

    #[test]
    fn test_descriptor_strings_carried() {
        let info = HidDeviceInfo::new(FOCUSER.0, FOCUSER.1, "/dev/hidraw3")
            .with_manufacturer("Astroasis")
            .with_product_name("Oasis Focuser");
        assert_eq!(info.manufacturer.as_deref(), Some("Astroasis"));
        assert_eq!(info.product_name.as_deref(), Some("Oasis Focuser"));
        assert_eq!(info.serial_number, None);
    }
}

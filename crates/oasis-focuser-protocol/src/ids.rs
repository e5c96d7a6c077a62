//! Oasis focuser USB identifiers.

#![deny(static_mut_refs)]

/// Astroasis USB Vendor ID.
pub const OASIS_VENDOR_ID: u16 = 0x338F;

/// Oasis focuser USB Product ID.
pub const OASIS_FOCUSER_PRODUCT_ID: u16 = 0xA0F0;

/// Returns `true` for the vendor/product pair of an Oasis focuser.
pub fn is_oasis_focuser(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == OASIS_VENDOR_ID && product_id == OASIS_FOCUSER_PRODUCT_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifies_focuser() {
        assert!(is_oasis_focuser(0x338F, 0xA0F0));
        assert!(!is_oasis_focuser(0x338F, 0xA0F1));
        assert!(!is_oasis_focuser(0x346E, 0xA0F0));
    }
}

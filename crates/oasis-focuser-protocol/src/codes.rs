//! Frame command codes, config mask bits and fixed frame geometry.

#![deny(static_mut_refs)]

/// Full HID report length: one report-id byte plus a 64-byte payload.
pub const REPORT_LEN: usize = 65;

/// Payload bytes after the report id.
pub const PAYLOAD_LEN: usize = 64;

/// Report id used for every outgoing frame.
pub const REPORT_ID: u8 = 0x00;

/// Width of every name field (model, friendly name, bluetooth name, serial).
pub const NAME_LEN: usize = 32;

/// Width of the ASCII build tag in the version ack.
pub const BUILD_TAG_LEN: usize = 24;

/// Frame command codes (second byte of an outgoing report, first byte of an
/// incoming one).
pub mod command_codes {
    pub const GET_PRODUCT_MODEL: u8 = 0x01;
    pub const GET_VERSION: u8 = 0x02;
    pub const GET_SERIAL_NUMBER: u8 = 0x03;
    pub const GET_FRIENDLY_NAME: u8 = 0x04;
    pub const SET_FRIENDLY_NAME: u8 = 0x05;
    pub const GET_BLUETOOTH_NAME: u8 = 0x06;
    pub const SET_BLUETOOTH_NAME: u8 = 0x07;
    pub const GET_USER_ID: u8 = 0x10;
    pub const SET_USER_ID: u8 = 0x11;
    pub const GET_CONFIG: u8 = 0x30;
    pub const SET_CONFIG: u8 = 0x31;
    pub const GET_STATUS: u8 = 0x32;
    pub const FACTORY_RESET: u8 = 0x33;
    pub const SET_ZERO_POSITION: u8 = 0x34;
    pub const MOVE_STEP: u8 = 0x35;
    pub const MOVE_TO: u8 = 0x36;
    pub const STOP_MOVE: u8 = 0x37;
    pub const SYNC_POSITION: u8 = 0x38;
    pub const SET_SERIAL_NUMBER: u8 = 0x39;
}

/// Set-config mask bits. The device applies only the fields whose bit is set.
pub mod config_mask {
    pub const MAX_STEP: u32 = 0x0000_0001;
    pub const BACKLASH: u32 = 0x0000_0002;
    pub const BACKLASH_DIRECTION: u32 = 0x0000_0004;
    pub const REVERSE_DIRECTION: u32 = 0x0000_0008;
    pub const SPEED: u32 = 0x0000_0010;
    pub const BEEP_ON_MOVE: u32 = 0x0000_0020;
    pub const BEEP_ON_STARTUP: u32 = 0x0000_0040;
    pub const BLUETOOTH: u32 = 0x0000_0080;
    pub const ALL: u32 = 0xFFFF_FFFF;
}

/// Payload length byte carried in the frame header for each outgoing layout.
pub mod frame_lengths {
    use super::NAME_LEN;

    pub const HEAD_ONLY: u8 = 0;
    pub const POSITION: u8 = 4;
    /// mask + maxStep + backlash (3 x u32) + six single-byte fields.
    pub const CONFIG: u8 = 18;
    pub const NAME: u8 = NAME_LEN as u8;
}

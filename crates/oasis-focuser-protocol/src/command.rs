//! Outgoing command frames.
//!
//! Layout of every report: `[REPORT_ID, code, len, payload.., 0-padding]`,
//! 65 bytes in total. Multi-byte integers are big-endian.
//!
//! | Frame | Payload offsets (after `len`) |
//! |---|---|
//! | move-to / sync | `0..4` position |
//! | config | `0..4` mask, `4..8` maxStep, `8..12` backlash, `12` backlashDir, `13` reverse, `14` speed, `15` beepOnMove, `16` beepOnStartup, `17` bluetoothOn |
//! | names | `0..32` NUL-padded bytes |

#![deny(static_mut_refs)]

use crate::codes::{NAME_LEN, REPORT_ID, REPORT_LEN, command_codes, config_mask, frame_lengths};
use crate::error::{ProtocolError, ProtocolResult};
use crate::names::name_field;
use oasis_hid_common::{HidCommonResult, ReportBuilder, ReportParser};
use serde::{Deserialize, Serialize};

/// One complete outgoing HID report.
pub type Report = [u8; REPORT_LEN];

/// A single device setting carried by a set-config frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigField {
    MaxStep(u32),
    Backlash(u32),
    BacklashDirection(u8),
    ReverseDirection(bool),
    Speed(u8),
    BeepOnMove(bool),
    BeepOnStartup(bool),
    Bluetooth(bool),
}

impl ConfigField {
    pub fn mask(&self) -> u32 {
        match self {
            Self::MaxStep(_) => config_mask::MAX_STEP,
            Self::Backlash(_) => config_mask::BACKLASH,
            Self::BacklashDirection(_) => config_mask::BACKLASH_DIRECTION,
            Self::ReverseDirection(_) => config_mask::REVERSE_DIRECTION,
            Self::Speed(_) => config_mask::SPEED,
            Self::BeepOnMove(_) => config_mask::BEEP_ON_MOVE,
            Self::BeepOnStartup(_) => config_mask::BEEP_ON_STARTUP,
            Self::Bluetooth(_) => config_mask::BLUETOOTH,
        }
    }
}

/// Wire image of the config layout, shared by get-config acks and set-config
/// commands. In a set-config frame only fields whose `mask` bit is set matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFrame {
    pub mask: u32,
    pub max_step: u32,
    pub backlash: u32,
    pub backlash_direction: u8,
    pub reverse_direction: u8,
    pub speed: u8,
    pub beep_on_move: u8,
    pub beep_on_startup: u8,
    pub bluetooth_on: u8,
}

impl ConfigFrame {
    /// A set-config frame touching exactly one field.
    pub fn single(field: ConfigField) -> Self {
        let mut frame = Self {
            mask: field.mask(),
            ..Self::default()
        };
        frame.apply(field);
        frame
    }

    /// Overwrite one field's value (the mask is left alone).
    pub fn apply(&mut self, field: ConfigField) {
        match field {
            ConfigField::MaxStep(v) => self.max_step = v,
            ConfigField::Backlash(v) => self.backlash = v,
            ConfigField::BacklashDirection(v) => self.backlash_direction = v,
            ConfigField::ReverseDirection(v) => self.reverse_direction = u8::from(v),
            ConfigField::Speed(v) => self.speed = v,
            ConfigField::BeepOnMove(v) => self.beep_on_move = u8::from(v),
            ConfigField::BeepOnStartup(v) => self.beep_on_startup = u8::from(v),
            ConfigField::Bluetooth(v) => self.bluetooth_on = u8::from(v),
        }
    }

    /// The fields selected by `mask`, in mask-bit order.
    pub fn masked_fields(&self) -> Vec<ConfigField> {
        [
            ConfigField::MaxStep(self.max_step),
            ConfigField::Backlash(self.backlash),
            ConfigField::BacklashDirection(self.backlash_direction),
            ConfigField::ReverseDirection(self.reverse_direction != 0),
            ConfigField::Speed(self.speed),
            ConfigField::BeepOnMove(self.beep_on_move != 0),
            ConfigField::BeepOnStartup(self.beep_on_startup != 0),
            ConfigField::Bluetooth(self.bluetooth_on != 0),
        ]
        .into_iter()
        .filter(|field| self.mask & field.mask() != 0)
        .collect()
    }

    pub(crate) fn write_into(&self, builder: &mut ReportBuilder) {
        builder
            .write_u32_be(self.mask)
            .write_u32_be(self.max_step)
            .write_u32_be(self.backlash)
            .write_u8(self.backlash_direction)
            .write_u8(self.reverse_direction)
            .write_u8(self.speed)
            .write_u8(self.beep_on_move)
            .write_u8(self.beep_on_startup)
            .write_u8(self.bluetooth_on);
    }

    pub(crate) fn read_from(parser: &mut ReportParser) -> HidCommonResult<Self> {
        Ok(Self {
            mask: parser.read_u32_be()?,
            max_step: parser.read_u32_be()?,
            backlash: parser.read_u32_be()?,
            backlash_direction: parser.read_u8()?,
            reverse_direction: parser.read_u8()?,
            speed: parser.read_u8()?,
            beep_on_move: parser.read_u8()?,
            beep_on_startup: parser.read_u8()?,
            bluetooth_on: parser.read_u8()?,
        })
    }
}

/// Commands the host sends to the focuser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetProductModel,
    GetVersion,
    GetSerialNumber,
    GetFriendlyName,
    SetFriendlyName([u8; NAME_LEN]),
    GetBluetoothName,
    SetBluetoothName([u8; NAME_LEN]),
    GetConfig,
    SetConfig(ConfigFrame),
    GetStatus,
    MoveTo(u32),
    StopMove,
    SyncPosition(u32),
}

impl Command {
    pub fn set_config(field: ConfigField) -> Self {
        Self::SetConfig(ConfigFrame::single(field))
    }

    /// Trims and truncates `name` into the fixed name field.
    pub fn set_friendly_name(name: &str) -> Self {
        Self::SetFriendlyName(name_field(name))
    }

    /// Trims and truncates `name` into the fixed name field.
    pub fn set_bluetooth_name(name: &str) -> Self {
        Self::SetBluetoothName(name_field(name))
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::GetProductModel => command_codes::GET_PRODUCT_MODEL,
            Self::GetVersion => command_codes::GET_VERSION,
            Self::GetSerialNumber => command_codes::GET_SERIAL_NUMBER,
            Self::GetFriendlyName => command_codes::GET_FRIENDLY_NAME,
            Self::SetFriendlyName(_) => command_codes::SET_FRIENDLY_NAME,
            Self::GetBluetoothName => command_codes::GET_BLUETOOTH_NAME,
            Self::SetBluetoothName(_) => command_codes::SET_BLUETOOTH_NAME,
            Self::GetConfig => command_codes::GET_CONFIG,
            Self::SetConfig(_) => command_codes::SET_CONFIG,
            Self::GetStatus => command_codes::GET_STATUS,
            Self::MoveTo(_) => command_codes::MOVE_TO,
            Self::StopMove => command_codes::STOP_MOVE,
            Self::SyncPosition(_) => command_codes::SYNC_POSITION,
        }
    }

    fn payload_len(&self) -> u8 {
        match self {
            Self::MoveTo(_) | Self::SyncPosition(_) => frame_lengths::POSITION,
            Self::SetConfig(_) => frame_lengths::CONFIG,
            Self::SetFriendlyName(_) | Self::SetBluetoothName(_) => frame_lengths::NAME,
            _ => frame_lengths::HEAD_ONLY,
        }
    }

    /// Encode into a zero-padded 65-byte report.
    pub fn encode(&self) -> Report {
        let mut builder = ReportBuilder::default();
        builder
            .write_u8(REPORT_ID)
            .write_u8(self.code())
            .write_u8(self.payload_len());

        match self {
            Self::MoveTo(position) | Self::SyncPosition(position) => {
                builder.write_u32_be(*position);
            }
            Self::SetConfig(frame) => frame.write_into(&mut builder),
            Self::SetFriendlyName(name) | Self::SetBluetoothName(name) => {
                builder.write_bytes(name);
            }
            _ => {}
        }

        builder.pad_to(REPORT_LEN);
        let mut report = [0u8; REPORT_LEN];
        if let Some(bytes) = builder.as_slice().get(..REPORT_LEN) {
            report.copy_from_slice(bytes);
        }
        report
    }

    /// Decode an outgoing report (report id included), as a device would.
    ///
    /// Returns `Ok(None)` for codes this driver never sends.
    pub fn decode(report: &[u8]) -> ProtocolResult<Option<Self>> {
        let mut parser = ReportParser::from_slice(report);
        let report_id = parser.read_u8().map_err(ProtocolError::malformed(0))?;
        if report_id != REPORT_ID {
            return Err(ProtocolError::UnexpectedReportId(report_id));
        }
        let code = parser.read_u8().map_err(ProtocolError::malformed(0))?;
        let malformed = ProtocolError::malformed;
        parser.skip(1);

        let command = match code {
            command_codes::GET_PRODUCT_MODEL => Self::GetProductModel,
            command_codes::GET_VERSION => Self::GetVersion,
            command_codes::GET_SERIAL_NUMBER => Self::GetSerialNumber,
            command_codes::GET_FRIENDLY_NAME => Self::GetFriendlyName,
            command_codes::SET_FRIENDLY_NAME => {
                Self::SetFriendlyName(parser.read_array().map_err(malformed(code))?)
            }
            command_codes::GET_BLUETOOTH_NAME => Self::GetBluetoothName,
            command_codes::SET_BLUETOOTH_NAME => {
                Self::SetBluetoothName(parser.read_array().map_err(malformed(code))?)
            }
            command_codes::GET_CONFIG => Self::GetConfig,
            command_codes::SET_CONFIG => {
                Self::SetConfig(ConfigFrame::read_from(&mut parser).map_err(malformed(code))?)
            }
            command_codes::GET_STATUS => Self::GetStatus,
            command_codes::MOVE_TO => Self::MoveTo(parser.read_u32_be().map_err(malformed(code))?),
            command_codes::STOP_MOVE => Self::StopMove,
            command_codes::SYNC_POSITION => {
                Self::SyncPosition(parser.read_u32_be().map_err(malformed(code))?)
            }
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

//! Incoming response frames.
//!
//! Input reports arrive without the report id: `[code, len, payload..]`.
//! The command code alone decides the layout; nothing pairs a response with
//! the request that caused it.
//!
//! | Ack | Payload offsets (after `len`) |
//! |---|---|
//! | model / names / serial | `0..32` NUL-padded bytes |
//! | version | `0..4` protocol, `4..8` hardware, `8..12` firmware, `12..36` build tag |
//! | config | same layout as the set-config frame |
//! | status | `0..4` temperatureInt, `4..8` temperatureExt, `8` tempDetect, `9` moving, `10..14` position |

#![deny(static_mut_refs)]

use crate::codes::{BUILD_TAG_LEN, NAME_LEN, PAYLOAD_LEN, command_codes};
use crate::command::ConfigFrame;
use crate::error::{ProtocolError, ProtocolResult};
use crate::names::decode_c_string;
use crate::temperature::{
    EXTERNAL_PROBE_PRESENT, external_probe_centi_celsius, ntc_centi_celsius,
};
use crate::version::FirmwareVersion;
use oasis_hid_common::{HidCommonResult, ReportBuilder, ReportParser};
use serde::{Deserialize, Serialize};
use tracing::trace;

const VERSION_LEN: u8 = (12 + BUILD_TAG_LEN) as u8;
const STATUS_LEN: u8 = 14;

/// Periodic status ack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Raw internal thermistor ADC reading.
    pub temperature_int: u32,
    /// Raw external probe word (low 16 bits significant).
    pub temperature_ext: u32,
    pub temperature_detection: u8,
    pub moving: bool,
    /// Signed on the wire: the firmware may report small negative positions.
    pub position: i32,
}

impl StatusReport {
    pub fn internal_centi_celsius(&self) -> i32 {
        ntc_centi_celsius(i32::try_from(self.temperature_int).unwrap_or(i32::MAX))
    }

    pub fn external_probe_present(&self) -> bool {
        self.temperature_detection == EXTERNAL_PROBE_PRESENT
    }

    /// External probe temperature, `None` when the probe is absent.
    pub fn external_centi_celsius(&self) -> Option<f32> {
        self.external_probe_present()
            .then(|| external_probe_centi_celsius(self.temperature_ext))
    }

    fn read_from(parser: &mut ReportParser) -> HidCommonResult<Self> {
        Ok(Self {
            temperature_int: parser.read_u32_be()?,
            temperature_ext: parser.read_u32_be()?,
            temperature_detection: parser.read_u8()?,
            moving: parser.read_u8()? != 0,
            position: parser.read_i32_be()?,
        })
    }

    fn write_into(&self, builder: &mut ReportBuilder) {
        builder
            .write_u32_be(self.temperature_int)
            .write_u32_be(self.temperature_ext)
            .write_u8(self.temperature_detection)
            .write_u8(u8::from(self.moving))
            .write_bytes(&self.position.to_be_bytes());
    }
}

/// A decoded device response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ProductModel(String),
    Version(FirmwareVersion),
    /// Carried for completeness; the serial comes from the USB descriptor.
    SerialNumber(String),
    FriendlyName(String),
    BluetoothName(String),
    Config(ConfigFrame),
    Status(StatusReport),
    /// Known code whose ack carries nothing the driver tracks.
    Ack(u8),
}

impl Response {
    pub fn code(&self) -> u8 {
        match self {
            Self::ProductModel(_) => command_codes::GET_PRODUCT_MODEL,
            Self::Version(_) => command_codes::GET_VERSION,
            Self::SerialNumber(_) => command_codes::GET_SERIAL_NUMBER,
            Self::FriendlyName(_) => command_codes::GET_FRIENDLY_NAME,
            Self::BluetoothName(_) => command_codes::GET_BLUETOOTH_NAME,
            Self::Config(_) => command_codes::GET_CONFIG,
            Self::Status(_) => command_codes::GET_STATUS,
            Self::Ack(code) => *code,
        }
    }

    /// Decode one input report.
    ///
    /// Empty reports and unknown codes yield `Ok(None)`; a known code with a
    /// truncated payload is an error.
    pub fn decode(frame: &[u8]) -> ProtocolResult<Option<Self>> {
        let mut parser = ReportParser::from_slice(frame);
        let Ok(code) = parser.read_u8() else {
            return Ok(None);
        };
        parser.skip(1);
        let malformed = ProtocolError::malformed;

        let response = match code {
            command_codes::GET_PRODUCT_MODEL => {
                Self::ProductModel(read_name(&mut parser).map_err(malformed(code))?)
            }
            command_codes::GET_VERSION => {
                Self::Version(read_version(&mut parser).map_err(malformed(code))?)
            }
            command_codes::GET_SERIAL_NUMBER => {
                Self::SerialNumber(read_name(&mut parser).map_err(malformed(code))?)
            }
            command_codes::GET_FRIENDLY_NAME => {
                Self::FriendlyName(read_name(&mut parser).map_err(malformed(code))?)
            }
            command_codes::GET_BLUETOOTH_NAME => {
                Self::BluetoothName(read_name(&mut parser).map_err(malformed(code))?)
            }
            command_codes::GET_CONFIG => {
                Self::Config(ConfigFrame::read_from(&mut parser).map_err(malformed(code))?)
            }
            command_codes::GET_STATUS => {
                Self::Status(StatusReport::read_from(&mut parser).map_err(malformed(code))?)
            }
            command_codes::SET_FRIENDLY_NAME
            | command_codes::SET_BLUETOOTH_NAME
            | command_codes::GET_USER_ID
            | command_codes::SET_USER_ID
            | command_codes::SET_CONFIG
            | command_codes::FACTORY_RESET
            | command_codes::SET_ZERO_POSITION
            | command_codes::MOVE_STEP
            | command_codes::MOVE_TO
            | command_codes::STOP_MOVE
            | command_codes::SYNC_POSITION
            | command_codes::SET_SERIAL_NUMBER => Self::Ack(code),
            _ => {
                trace!(code = format_args!("0x{code:02X}"), "ignoring unknown response code");
                return Ok(None);
            }
        };
        Ok(Some(response))
    }

    /// Encode as the device would send it (64 bytes, no report id).
    pub fn encode(&self) -> Vec<u8> {
        let mut builder = ReportBuilder::with_capacity(PAYLOAD_LEN);
        builder.write_u8(self.code());
        match self {
            Self::ProductModel(name)
            | Self::SerialNumber(name)
            | Self::FriendlyName(name)
            | Self::BluetoothName(name) => {
                builder
                    .write_u8(NAME_LEN as u8)
                    .write_padded(name.as_bytes(), NAME_LEN);
            }
            Self::Version(version) => {
                builder
                    .write_u8(VERSION_LEN)
                    .write_u32_be(version.protocol)
                    .write_u32_be(version.hardware)
                    .write_u32_be(version.firmware_word())
                    .write_padded(version.built.as_bytes(), BUILD_TAG_LEN);
            }
            Self::Config(frame) => {
                builder.write_u8(crate::codes::frame_lengths::CONFIG);
                frame.write_into(&mut builder);
            }
            Self::Status(status) => {
                builder.write_u8(STATUS_LEN);
                status.write_into(&mut builder);
            }
            Self::Ack(_) => {
                builder.write_u8(0);
            }
        }
        builder.pad_to(PAYLOAD_LEN);
        builder.into_inner()
    }
}

fn read_name(parser: &mut ReportParser) -> HidCommonResult<String> {
    Ok(decode_c_string(&parser.read_array::<NAME_LEN>()?))
}

fn read_version(parser: &mut ReportParser) -> HidCommonResult<FirmwareVersion> {
    let protocol = parser.read_u32_be()?;
    let hardware = parser.read_u32_be()?;
    let firmware = parser.read_u32_be()?;
    let built = decode_c_string(&parser.read_array::<BUILD_TAG_LEN>()?);
    Ok(FirmwareVersion::from_words(protocol, hardware, firmware, built))
}

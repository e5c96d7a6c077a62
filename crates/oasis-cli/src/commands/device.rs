//! Discovery, status and settings commands

use anyhow::Result;
use oasis_focuser::{OasisFocuser, TemperatureSource};
use oasis_focuser_protocol::effective_name;
use serde::Serialize;
use tracing::info;

use crate::commands::{Session, Setting, SourceArg, parse_flag, parse_number};
use crate::output;

/// Everything `oasisctl status` reports.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub serial: String,
    pub model: String,
    pub firmware: String,
    pub friendly_name: String,
    pub bluetooth_name: String,
    pub position: u32,
    pub max_position: u32,
    pub moving: bool,
    pub reverse: bool,
    pub backlash: u32,
    pub backlash_direction: u8,
    pub speed: u8,
    pub beep_on_move: bool,
    pub beep_on_startup: bool,
    pub bluetooth_enabled: bool,
    pub temperature_c: f64,
    /// Present only while the external probe is plugged in.
    pub ambient_c: Option<f64>,
}

impl StatusView {
    pub fn read(focuser: &OasisFocuser) -> Self {
        let state = focuser.snapshot();
        Self {
            firmware: focuser.firmware_version(),
            position: state.position(),
            temperature_c: state.internal_temperature(),
            ambient_c: state
                .external_probe_present
                .then(|| state.ambient_temperature()),
            serial: state.serial,
            model: state.model,
            friendly_name: state.friendly_name,
            bluetooth_name: state.bluetooth_name,
            max_position: state.max_position,
            moving: state.is_moving,
            reverse: state.is_reversed,
            backlash: state.backlash_steps,
            backlash_direction: state.backlash_direction,
            speed: state.speed,
            beep_on_move: state.beep_on_move,
            beep_on_startup: state.beep_on_startup,
            bluetooth_enabled: state.bluetooth_enabled,
        }
    }
}

/// List attached focusers
pub fn list(session: &Session) -> Result<()> {
    let mut focuser = session.controller()?;
    let serials = focuser.list_focusers()?;
    output::print_serials(&serials, session.json);
    Ok(())
}

/// Show focuser status
pub fn status(session: &Session) -> Result<()> {
    let focuser = session.connect()?;
    output::print_status(&StatusView::read(&focuser), session.json);
    Ok(())
}

/// Change one setting and confirm it from the device's config ack.
pub fn set(session: &Session, setting: Setting, value: &str) -> Result<()> {
    let focuser = session.connect()?;
    let shown = apply_setting(&focuser, setting, value)?;

    match setting {
        Setting::BluetoothName => focuser.request_bluetooth_name()?,
        Setting::FriendlyName => focuser.request_friendly_name()?,
        _ => focuser.request_config()?,
    }
    info!(?setting, value = %shown, "setting applied");
    output::print_setting(setting, &shown, session.json);
    Ok(())
}

/// Send the setter for `setting`; returns the value as the device will store it.
fn apply_setting(focuser: &OasisFocuser, setting: Setting, value: &str) -> Result<String> {
    let shown = match setting {
        Setting::MaxStep => {
            let steps: u32 = parse_number(value)?;
            focuser.set_max_step(steps)?;
            steps.to_string()
        }
        Setting::Backlash => {
            let steps: u32 = parse_number(value)?;
            focuser.set_backlash(steps)?;
            steps.to_string()
        }
        Setting::BacklashDirection => {
            let direction: u8 = parse_number(value)?;
            focuser.set_backlash_direction(direction)?;
            direction.to_string()
        }
        Setting::Speed => {
            let speed: u8 = parse_number(value)?;
            focuser.set_speed(speed)?;
            speed.to_string()
        }
        Setting::Reverse => flag(value, |on| focuser.set_reverse(on))?,
        Setting::BeepOnMove => flag(value, |on| focuser.set_beep_on_move(on))?,
        Setting::BeepOnStartup => flag(value, |on| focuser.set_beep_on_startup(on))?,
        Setting::Bluetooth => flag(value, |on| focuser.set_bluetooth_enabled(on))?,
        Setting::BluetoothName => {
            focuser.set_bluetooth_name(value)?;
            effective_name(value)
        }
        Setting::FriendlyName => {
            focuser.set_friendly_name(value)?;
            effective_name(value)
        }
    };
    Ok(shown)
}

fn flag(value: &str, set: impl FnOnce(bool) -> oasis_focuser::FocuserResult<()>) -> Result<String> {
    let on = parse_flag(value)?;
    set(on)?;
    Ok(if on { "on" } else { "off" }.to_string())
}

/// Read the temperature from the chosen sensor
pub fn temperature(session: &Session, source: Option<SourceArg>) -> Result<()> {
    let focuser = session.connect()?;
    let source = source.map_or(focuser.temperature_source(), TemperatureSource::from);
    let probe_present = focuser.is_external_sensor_present();
    let celsius = focuser.temperature_from(source);
    output::print_temperature(source, celsius, probe_present, session.json);
    Ok(())
}

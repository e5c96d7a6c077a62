//! Device state derived from decoded responses.
//!
//! [`DeviceState`] is a plain value; [`StateStore`] shares one instance
//! between the poller (the only writer of device-reported fields) and the
//! controller's accessors. Each decoded response is applied under a single
//! lock acquisition, so readers never see half of one response.

use crate::config::TemperatureSource;
use oasis_focuser_protocol::{Response, centi_to_celsius};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Snapshot of everything the focuser has reported this session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    /// Raw reported position; the device may report small negative values.
    pub current_position: i32,
    pub max_position: u32,
    pub is_moving: bool,
    pub is_reversed: bool,
    pub firmware_version: String,
    pub model: String,
    pub serial: String,
    pub backlash_steps: u32,
    pub backlash_direction: u8,
    pub speed: u8,
    pub beep_on_move: bool,
    pub beep_on_startup: bool,
    pub bluetooth_enabled: bool,
    pub bluetooth_name: String,
    pub friendly_name: String,
    pub internal_temp_centi_c: f64,
    /// Last external probe reading; kept when the probe is unplugged.
    pub ambient_temp_centi_c: f64,
    pub external_probe_present: bool,
    pub got_config: bool,
    pub got_version: bool,
    pub got_model: bool,
    pub got_bluetooth_name: bool,
    pub got_friendly_name: bool,
}

impl DeviceState {
    /// Fold one decoded response into the state.
    pub fn apply(&mut self, response: &Response) {
        match response {
            Response::ProductModel(model) => {
                self.model.clone_from(model);
                self.got_model = true;
            }
            Response::Version(version) => {
                self.firmware_version = version.to_string();
                self.got_version = true;
            }
            // The serial comes from the USB descriptor instead.
            Response::SerialNumber(_) => {}
            Response::FriendlyName(name) => {
                self.friendly_name.clone_from(name);
                self.got_friendly_name = true;
            }
            Response::BluetoothName(name) => {
                self.bluetooth_name.clone_from(name);
                self.got_bluetooth_name = true;
            }
            Response::Config(config) => {
                self.max_position = config.max_step;
                self.backlash_steps = config.backlash;
                self.backlash_direction = config.backlash_direction;
                self.is_reversed = config.reverse_direction != 0;
                self.speed = config.speed;
                self.beep_on_move = config.beep_on_move != 0;
                self.beep_on_startup = config.beep_on_startup != 0;
                self.bluetooth_enabled = config.bluetooth_on != 0;
                self.got_config = true;
            }
            Response::Status(status) => {
                self.is_moving = status.moving;
                self.current_position = status.position;
                self.internal_temp_centi_c = f64::from(status.internal_centi_celsius());
                match status.external_centi_celsius() {
                    Some(centi) => {
                        self.external_probe_present = true;
                        self.ambient_temp_centi_c = f64::from(centi);
                    }
                    None => self.external_probe_present = false,
                }
            }
            Response::Ack(_) => {}
        }
    }

    /// Current position with negative transients floored to zero.
    pub fn position(&self) -> u32 {
        u32::try_from(self.current_position).unwrap_or(0)
    }

    /// Internal sensor temperature in degrees Celsius.
    pub fn internal_temperature(&self) -> f64 {
        centi_to_celsius(self.internal_temp_centi_c)
    }

    /// External probe temperature in degrees Celsius.
    pub fn ambient_temperature(&self) -> f64 {
        centi_to_celsius(self.ambient_temp_centi_c)
    }

    pub fn temperature(&self, source: TemperatureSource) -> f64 {
        match source {
            TemperatureSource::Internal => self.internal_temperature(),
            TemperatureSource::External => self.ambient_temperature(),
        }
    }

    /// All connection handshake items received.
    pub fn handshake_complete(&self) -> bool {
        self.got_config
            && self.got_version
            && self.got_model
            && self.got_bluetooth_name
            && self.got_friendly_name
    }
}

/// Shared, lock-guarded [`DeviceState`]. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<DeviceState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a decoded response atomically.
    pub fn apply(&self, response: &Response) {
        debug!(code = response.code(), "applying response");
        self.inner.lock().apply(response);
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> DeviceState {
        self.inner.lock().clone()
    }

    /// Read through a closure under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Like [`read`](Self::read), but gives up instead of waiting when the
    /// decoder holds the lock.
    pub fn try_read<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> Option<R> {
        self.inner.try_lock().map(|state| f(&state))
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut DeviceState)) {
        f(&mut self.inner.lock());
    }

    /// Forget everything from a previous session.
    pub(crate) fn reset(&self) {
        *self.inner.lock() = DeviceState::default();
    }
}

//! Controller facade.
//!
//! [`OasisFocuser`] owns the device handle, the transport pump, the shared
//! [`DeviceState`] and the goto session. Commands go out through
//! [`OasisFocuser::send_command`]; answers arrive asynchronously through the
//! poller, so getters only ever read cached state.

use crate::config::{ConfigError, ControllerConfig, TemperatureSource};
use crate::error::{FocuserError, FocuserResult};
use crate::goto::{GotoDecision, GotoPhase, GotoSession};
use crate::pump::{PumpTiming, SharedDevice, TransportPump, hex};
use crate::state::{DeviceState, StateStore};
use oasis_focuser_protocol::{Command, ConfigField};
use oasis_hid_common::{HidBackend, HidHandle, enumerate_serials};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

const NOT_AVAILABLE: &str = "NA";

type ReadyCheck = fn(&DeviceState) -> bool;

struct Link {
    device: SharedDevice,
    pump: TransportPump,
}

/// One Oasis focuser.
pub struct OasisFocuser {
    config: ControllerConfig,
    backend: Box<dyn HidBackend>,
    serial: Option<String>,
    link: Option<Link>,
    state: StateStore,
    goto: Mutex<GotoSession>,
    temperature_source: TemperatureSource,
}

impl OasisFocuser {
    /// Create a disconnected controller.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn new(backend: Box<dyn HidBackend>, config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let goto = GotoSession::new(
            config.goto_debounce(),
            config.max_goto_retry,
            config.goto_retry_policy,
        );
        Ok(Self {
            serial: config.serial.clone(),
            temperature_source: config.temperature_source,
            backend,
            link: None,
            state: StateStore::new(),
            goto: Mutex::new(goto),
            config,
        })
    }

    pub fn with_backend(
        backend: impl HidBackend + 'static,
        config: ControllerConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(Box::new(backend), config)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    // ---- discovery ---------------------------------------------------------

    /// Serial numbers of every attached focuser.
    ///
    /// # Errors
    ///
    /// Returns [`FocuserError::CantConnect`] if enumeration fails.
    pub fn list_focusers(&mut self) -> FocuserResult<Vec<String>> {
        enumerate_serials(
            self.backend.as_mut(),
            self.config.vendor_id,
            self.config.product_id,
        )
        .map_err(FocuserError::CantConnect)
    }

    /// # Errors
    ///
    /// Returns [`FocuserError::CantConnect`] if enumeration fails.
    pub fn is_focuser_present(&mut self, serial: &str) -> FocuserResult<bool> {
        Ok(self.list_focusers()?.iter().any(|s| s == serial))
    }

    /// Select the device `connect` opens. Takes effect on the next connect.
    pub fn set_focuser_serial(&mut self, serial: impl Into<String>) {
        self.serial = Some(serial.into());
    }

    pub fn focuser_serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    // ---- connection --------------------------------------------------------

    /// Open the device, start the pump and run the handshake.
    ///
    /// Handshake timeouts are logged and tolerated; the connection then
    /// carries whatever state arrived.
    ///
    /// # Errors
    ///
    /// Returns [`FocuserError::CantConnect`] if no device can be opened.
    pub fn connect(&mut self) -> FocuserResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        if self.serial.is_none() {
            self.serial = self.list_focusers()?.into_iter().next();
        }
        let (vendor_id, product_id) = (self.config.vendor_id, self.config.product_id);
        info!(
            vendor_id = %format!("{vendor_id:04X}"),
            product_id = %format!("{product_id:04X}"),
            serial = self.serial.as_deref().unwrap_or("<first>"),
            "connecting"
        );

        let mut handle = self
            .backend
            .open(vendor_id, product_id, self.serial.as_deref())
            .map_err(FocuserError::CantConnect)?;
        if let Err(e) = handle.set_nonblocking(true) {
            close_handle(&mut *handle);
            return Err(FocuserError::CantConnect(e));
        }

        self.state.reset();
        let device: SharedDevice = Arc::new(Mutex::new(handle));
        let timing = PumpTiming {
            status_interval: self.config.status_interval(),
            poll_interval: self.config.poll_interval(),
        };
        let pump = match TransportPump::start(Arc::clone(&device), self.state.clone(), timing) {
            Ok(pump) => pump,
            Err(e) => {
                close_handle(&mut **device.lock());
                return Err(e);
            }
        };
        self.link = Some(Link { device, pump });

        self.read_serial();
        self.handshake();
        info!(
            serial = %self.state.read(|s| s.serial.clone()),
            "connected"
        );
        Ok(())
    }

    /// Stop the pump, then close the device. Idempotent.
    pub fn disconnect(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };
        link.pump.stop();
        close_handle(&mut **link.device.lock());
        info!("disconnected");
    }

    fn device(&self) -> FocuserResult<&SharedDevice> {
        self.link
            .as_ref()
            .map(|link| &link.device)
            .ok_or(FocuserError::CommNoLink)
    }

    fn read_serial(&self) {
        let Ok(device) = self.device() else {
            return;
        };
        let mut serial = None;
        for attempt in 0..self.config.command_retry_limit {
            if let Some(mut handle) = device.try_lock() {
                match handle.serial_number() {
                    Ok(found) => {
                        serial = found;
                        break;
                    }
                    Err(e) => debug!(attempt, error = %e, "serial read failed"),
                }
            }
            thread::yield_now();
            thread::sleep(self.config.command_retry_interval());
        }
        let serial = serial.or_else(|| self.serial.clone()).unwrap_or_default();
        self.state.update(|s| s.serial = serial);
    }

    fn handshake(&self) {
        let max = self.config.handshake_max_attempts;
        let steps: [(&str, Command, u32, ReadyCheck); 5] = [
            ("config", Command::GetConfig, max, |s: &DeviceState| s.got_config),
            ("version", Command::GetVersion, max, |s: &DeviceState| s.got_version),
            (
                "model",
                Command::GetProductModel,
                self.config.model_max_attempts,
                |s: &DeviceState| s.got_model,
            ),
            ("bluetooth name", Command::GetBluetoothName, max, |s: &DeviceState| {
                s.got_bluetooth_name
            }),
            ("friendly name", Command::GetFriendlyName, max, |s: &DeviceState| {
                s.got_friendly_name
            }),
        ];
        for (item, command, max_attempts, ready) in steps {
            self.await_handshake_item(item, &command, max_attempts, ready);
        }
    }

    fn await_handshake_item(&self, item: &str, command: &Command, max_attempts: u32, ready: ReadyCheck) {
        let mut attempts: u32 = 0;
        while !self.state.read(ready) {
            if let Err(e) = self.send_command(command) {
                debug!(item, error = %e, "handshake request failed");
            }
            thread::yield_now();
            thread::sleep(self.config.handshake_interval());
            attempts = attempts.saturating_add(1);
            if attempts > max_attempts {
                warn!(item, attempts, "timed out waiting for handshake item");
                return;
            }
        }
        debug!(item, attempts, "handshake item received");
    }

    // ---- commands ----------------------------------------------------------

    /// Write one frame, retrying while the device is busy or the write fails.
    ///
    /// Always pauses `command_settle_ms` afterwards so the poller can pick up
    /// the ack.
    ///
    /// # Errors
    ///
    /// Returns [`FocuserError::CommNoLink`] when disconnected and
    /// [`FocuserError::CmdFailed`] when the retry budget runs out.
    pub fn send_command(&self, command: &Command) -> FocuserResult<()> {
        let device = self.device()?;
        let report = command.encode();
        trace!(report = %hex(&report), "sending report");

        let mut attempts: u32 = 0;
        let mut sent = false;
        while attempts < self.config.command_retry_limit {
            match device.try_lock().map(|mut handle| handle.write_report(&report)) {
                Some(Ok(_)) => {
                    sent = true;
                    break;
                }
                Some(Err(e)) => trace!(attempt = attempts, error = %e, "write failed"),
                None => {}
            }
            attempts = attempts.saturating_add(1);
            thread::yield_now();
            thread::sleep(self.config.command_retry_interval());
        }

        thread::sleep(self.config.command_settle());
        if sent {
            Ok(())
        } else {
            warn!(code = command.code(), attempts, "command retry budget exhausted");
            Err(FocuserError::CmdFailed {
                code: command.code(),
                attempts,
            })
        }
    }

    fn ensure_idle(&self) -> FocuserResult<()> {
        self.device()?;
        if self.state.read(|s| s.is_moving) {
            return Err(FocuserError::CmdInProgress);
        }
        Ok(())
    }

    /// Send a configuration frame carrying exactly one field.
    fn set_config(&self, field: ConfigField) -> FocuserResult<()> {
        self.ensure_idle()?;
        debug!(?field, "setting config field");
        self.send_command(&Command::set_config(field))
    }

    pub fn request_config(&self) -> FocuserResult<()> {
        self.send_command(&Command::GetConfig)
    }

    pub fn request_version(&self) -> FocuserResult<()> {
        self.send_command(&Command::GetVersion)
    }

    pub fn request_model(&self) -> FocuserResult<()> {
        self.send_command(&Command::GetProductModel)
    }

    pub fn request_bluetooth_name(&self) -> FocuserResult<()> {
        self.send_command(&Command::GetBluetoothName)
    }

    pub fn request_friendly_name(&self) -> FocuserResult<()> {
        self.send_command(&Command::GetFriendlyName)
    }

    // ---- motion ------------------------------------------------------------

    fn checked_target(&self, position: i64) -> FocuserResult<u32> {
        self.ensure_idle()?;
        let max = self.state.read(|s| s.max_position);
        let exceeded = FocuserError::LimitsExceeded {
            requested: position,
            max,
        };
        match u32::try_from(position) {
            Ok(target) if target <= max => Ok(target),
            _ => Err(exceeded),
        }
    }

    /// Start an absolute move and a fresh goto session.
    ///
    /// # Errors
    ///
    /// [`FocuserError::CommNoLink`], [`FocuserError::CmdInProgress`],
    /// [`FocuserError::LimitsExceeded`] (checked before any I/O), or
    /// [`FocuserError::CmdFailed`] from the send.
    pub fn goto_position(&self, position: i64) -> FocuserResult<()> {
        let target = self.checked_target(position)?;
        let result = self.send_command(&Command::MoveTo(target));
        self.goto.lock().begin(position, Instant::now());
        info!(target, "goto issued");
        result
    }

    fn reissue_goto(&self, position: i64) -> FocuserResult<()> {
        let target = self.checked_target(position)?;
        let result = self.send_command(&Command::MoveTo(target));
        self.goto.lock().reissued(Instant::now());
        result
    }

    /// Move by `steps` from the current raw position.
    ///
    /// # Errors
    ///
    /// Same as [`goto_position`](Self::goto_position).
    pub fn move_relative(&self, steps: i64) -> FocuserResult<()> {
        self.ensure_idle()?;
        let current = self.state.read(|s| s.current_position);
        self.goto_position(i64::from(current).saturating_add(steps))
    }

    /// Stop a running move and disable automatic goto retries.
    ///
    /// # Errors
    ///
    /// [`FocuserError::CommNoLink`], or [`FocuserError::CmdFailed`] if the
    /// stop frame could not be sent.
    pub fn halt(&self) -> FocuserResult<()> {
        self.device()?;
        let result = if self.state.read(|s| s.is_moving) {
            info!("halting focuser");
            self.send_command(&Command::StopMove)
        } else {
            Ok(())
        };
        self.goto.lock().halt();
        thread::sleep(self.config.halt_settle());
        result
    }

    /// Poll goto completion. May re-issue the move.
    ///
    /// A re-issue that cannot be sent is logged and the poll still reports
    /// not-complete; the session carries on from its retry state.
    ///
    /// # Errors
    ///
    /// [`FocuserError::CommNoLink`], or [`FocuserError::GotoFailed`] when the
    /// session gives up.
    pub fn is_goto_complete(&self) -> FocuserResult<bool> {
        self.device()?;
        let (moving, position) = self.state.read(|s| (s.is_moving, s.current_position));
        let decision = self.goto.lock().poll(moving, position, Instant::now());
        match decision {
            GotoDecision::Pending => Ok(false),
            GotoDecision::Complete => Ok(true),
            GotoDecision::Reissue(target) => {
                info!(target, position, "goto settled off target, re-issuing");
                if let Err(e) = self.reissue_goto(target) {
                    warn!(target, error = %e, "goto re-issue not sent");
                }
                Ok(false)
            }
            GotoDecision::Failed { target, reached } => {
                warn!(target, reached, "goto failed to reach target");
                Err(FocuserError::GotoFailed { target, reached })
            }
        }
    }

    pub fn goto_target(&self) -> i64 {
        self.goto.lock().target()
    }

    pub fn goto_phase(&self) -> GotoPhase {
        self.goto.lock().phase()
    }

    // ---- setters -----------------------------------------------------------

    pub fn set_max_step(&self, max_step: u32) -> FocuserResult<()> {
        self.set_config(ConfigField::MaxStep(max_step))
    }

    pub fn set_backlash(&self, steps: u32) -> FocuserResult<()> {
        self.set_config(ConfigField::Backlash(steps))
    }

    pub fn set_backlash_direction(&self, direction: u8) -> FocuserResult<()> {
        self.set_config(ConfigField::BacklashDirection(direction))
    }

    pub fn set_reverse(&self, reversed: bool) -> FocuserResult<()> {
        self.set_config(ConfigField::ReverseDirection(reversed))
    }

    pub fn set_speed(&self, speed: u8) -> FocuserResult<()> {
        self.set_config(ConfigField::Speed(speed))
    }

    pub fn set_beep_on_move(&self, enabled: bool) -> FocuserResult<()> {
        self.set_config(ConfigField::BeepOnMove(enabled))
    }

    pub fn set_beep_on_startup(&self, enabled: bool) -> FocuserResult<()> {
        self.set_config(ConfigField::BeepOnStartup(enabled))
    }

    pub fn set_bluetooth_enabled(&self, enabled: bool) -> FocuserResult<()> {
        self.set_config(ConfigField::Bluetooth(enabled))
    }

    /// Trimmed and cut to the 32-byte name field before sending.
    pub fn set_bluetooth_name(&self, name: &str) -> FocuserResult<()> {
        self.ensure_idle()?;
        self.send_command(&Command::set_bluetooth_name(name))
    }

    /// Trimmed and cut to the 32-byte name field before sending.
    pub fn set_friendly_name(&self, name: &str) -> FocuserResult<()> {
        self.ensure_idle()?;
        self.send_command(&Command::set_friendly_name(name))
    }

    /// Redefine the current position (sync) without moving.
    pub fn set_position(&self, position: u32) -> FocuserResult<()> {
        self.ensure_idle()?;
        self.send_command(&Command::SyncPosition(position))
    }

    pub fn set_temperature_source(&mut self, source: TemperatureSource) {
        self.temperature_source = source;
    }

    // ---- getters -----------------------------------------------------------

    pub fn temperature_source(&self) -> TemperatureSource {
        self.temperature_source
    }

    /// Consistent copy of the device state.
    pub fn snapshot(&self) -> DeviceState {
        self.state.snapshot()
    }

    pub fn position(&self) -> u32 {
        self.state.read(DeviceState::position)
    }

    pub fn position_limit(&self) -> u32 {
        self.state.read(|s| s.max_position)
    }

    pub fn is_moving(&self) -> bool {
        self.state.read(|s| s.is_moving)
    }

    pub fn backlash(&self) -> u32 {
        self.state.read(|s| s.backlash_steps)
    }

    pub fn backlash_direction(&self) -> u8 {
        self.state.read(|s| s.backlash_direction)
    }

    pub fn reverse(&self) -> bool {
        self.state.read(|s| s.is_reversed)
    }

    pub fn speed(&self) -> u8 {
        self.state.read(|s| s.speed)
    }

    pub fn beep_on_move(&self) -> bool {
        self.state.read(|s| s.beep_on_move)
    }

    pub fn beep_on_startup(&self) -> bool {
        self.state.read(|s| s.beep_on_startup)
    }

    pub fn bluetooth_enabled(&self) -> bool {
        self.state.read(|s| s.bluetooth_enabled)
    }

    /// Temperature in degrees Celsius from the configured source.
    pub fn temperature(&self) -> f64 {
        self.temperature_from(self.temperature_source)
    }

    pub fn temperature_from(&self, source: TemperatureSource) -> f64 {
        self.state.read(|s| s.temperature(source))
    }

    pub fn is_external_sensor_present(&self) -> bool {
        self.state.read(|s| s.external_probe_present)
    }

    /// `"NA"` until the version ack arrives, or while the decoder holds the
    /// state lock.
    pub fn firmware_version(&self) -> String {
        self.state
            .try_read(|s| {
                if s.firmware_version.is_empty() {
                    NOT_AVAILABLE.to_string()
                } else {
                    s.firmware_version.clone()
                }
            })
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn model(&self) -> String {
        self.state.read(|s| s.model.clone())
    }

    pub fn serial(&self) -> String {
        self.state.read(|s| s.serial.clone())
    }

    pub fn bluetooth_name(&self) -> String {
        self.state.read(|s| s.bluetooth_name.clone())
    }

    pub fn friendly_name(&self) -> String {
        self.state.read(|s| s.friendly_name.clone())
    }
}

fn close_handle(handle: &mut dyn HidHandle) {
    if let Err(e) = handle.close() {
        warn!(error = %e, "closing device failed");
    }
}

impl Drop for OasisFocuser {
    fn drop(&mut self) {
        self.disconnect();
    }
}

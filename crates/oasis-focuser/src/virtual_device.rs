//! Virtual focuser for tests and demos.
//!
//! [`VirtualFocuser`] emulates the firmware side of the HID protocol: it
//! decodes the reports the controller writes, updates its own settings,
//! moves toward goto targets over wall-clock time and queues the matching
//! acks for the controller to read. [`VirtualBackend`] makes one or more of
//! them discoverable through the [`HidBackend`] trait.

use oasis_focuser_protocol::{
    Command, ConfigFrame, FirmwareVersion, OASIS_FOCUSER_PRODUCT_ID, OASIS_VENDOR_ID, Response,
    StatusReport, command_codes, config_mask, decode_c_string,
};
use oasis_hid_common::{HidBackend, HidCommonError, HidCommonResult, HidDeviceInfo, HidHandle};
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Default simulated travel speed.
pub const DEFAULT_STEPS_PER_MS: u32 = 20;

#[derive(Debug)]
struct Firmware {
    serial: String,
    model: String,
    version: FirmwareVersion,
    friendly_name: String,
    bluetooth_name: String,
    config: ConfigFrame,
    position: i32,
    target: i32,
    moving: bool,
    /// Motion stops here instead of at the target.
    stall_at: Option<i32>,
    /// Keep reporting "moving" without advancing.
    frozen: bool,
    steps_per_ms: u32,
    last_tick: Instant,
    temperature_ad: u32,
    probe: Option<u32>,
    /// Swallow requests without answering.
    muted: bool,
    connected: bool,
    open: bool,
    failing_writes: u32,
    outbox: VecDeque<Vec<u8>>,
    received: Vec<Command>,
}

impl Firmware {
    fn new(serial: String) -> Self {
        Self {
            serial,
            model: "Oasis Focuser".to_string(),
            version: FirmwareVersion::from_words(1, 1, 0x0102_0304, "Jun 12 2023".to_string()),
            friendly_name: "Oasis".to_string(),
            bluetooth_name: "OasisFocuser".to_string(),
            config: ConfigFrame {
                mask: config_mask::ALL,
                max_step: 100_000,
                backlash: 0,
                backlash_direction: 0,
                reverse_direction: 0,
                speed: 50,
                beep_on_move: 0,
                beep_on_startup: 1,
                bluetooth_on: 1,
            },
            position: 0,
            target: 0,
            moving: false,
            stall_at: None,
            frozen: false,
            steps_per_ms: DEFAULT_STEPS_PER_MS,
            last_tick: Instant::now(),
            temperature_ad: 2048,
            probe: None,
            muted: false,
            connected: true,
            open: false,
            failing_writes: 0,
            outbox: VecDeque::new(),
            received: Vec::new(),
        }
    }

    /// Advance motion by the wall-clock time since the last tick.
    fn tick(&mut self) {
        let now = Instant::now();
        let elapsed_ms = now.saturating_duration_since(self.last_tick).as_millis();
        self.last_tick = now;
        if !self.moving || self.frozen {
            return;
        }

        let budget = i64::try_from(elapsed_ms.saturating_mul(u128::from(self.steps_per_ms)))
            .unwrap_or(i64::MAX);
        let stop_at = self.stall_at.unwrap_or(self.target);
        let remaining = i64::from(stop_at) - i64::from(self.position);
        let step = remaining.clamp(-budget, budget);
        self.position = i32::try_from(i64::from(self.position) + step).unwrap_or(stop_at);
        if self.position == stop_at {
            self.moving = false;
            if self.stall_at.is_some() {
                debug!(position = self.position, target = self.target, "virtual focuser stalled");
            }
        }
    }

    fn status(&self) -> StatusReport {
        StatusReport {
            temperature_int: self.temperature_ad,
            temperature_ext: self.probe.unwrap_or(0),
            temperature_detection: u8::from(self.probe.is_some()),
            moving: self.moving,
            position: self.position,
        }
    }

    fn apply_config(&mut self, frame: &ConfigFrame) {
        for field in frame.masked_fields() {
            self.config.apply(field);
        }
    }

    fn handle(&mut self, command: &Command) -> Response {
        match command {
            Command::GetProductModel => Response::ProductModel(self.model.clone()),
            Command::GetVersion => Response::Version(self.version.clone()),
            Command::GetSerialNumber => Response::SerialNumber(self.serial.clone()),
            Command::GetFriendlyName => Response::FriendlyName(self.friendly_name.clone()),
            Command::SetFriendlyName(name) => {
                self.friendly_name = decode_c_string(name);
                Response::Ack(command_codes::SET_FRIENDLY_NAME)
            }
            Command::GetBluetoothName => Response::BluetoothName(self.bluetooth_name.clone()),
            Command::SetBluetoothName(name) => {
                self.bluetooth_name = decode_c_string(name);
                Response::Ack(command_codes::SET_BLUETOOTH_NAME)
            }
            Command::GetConfig => Response::Config(self.config),
            Command::SetConfig(frame) => {
                self.apply_config(frame);
                Response::Ack(command_codes::SET_CONFIG)
            }
            Command::GetStatus => Response::Status(self.status()),
            Command::MoveTo(target) => {
                let target = (*target).min(self.config.max_step);
                self.target = i32::try_from(target).unwrap_or(i32::MAX);
                self.moving = self.target != self.position;
                Response::Ack(command_codes::MOVE_TO)
            }
            Command::StopMove => {
                self.moving = false;
                self.frozen = false;
                self.target = self.position;
                Response::Ack(command_codes::STOP_MOVE)
            }
            Command::SyncPosition(position) => {
                self.position = i32::try_from(*position).unwrap_or(i32::MAX);
                self.target = self.position;
                Response::Ack(command_codes::SYNC_POSITION)
            }
        }
    }
}

/// Shared handle to one simulated focuser. Clones control the same device.
#[derive(Debug, Clone)]
pub struct VirtualFocuser {
    firmware: Arc<Mutex<Firmware>>,
}

impl VirtualFocuser {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            firmware: Arc::new(Mutex::new(Firmware::new(serial.into()))),
        }
    }

    fn firmware(&self) -> MutexGuard<'_, Firmware> {
        self.firmware.lock()
    }

    #[must_use]
    pub fn with_max_step(self, max_step: u32) -> Self {
        self.firmware().config.max_step = max_step;
        self
    }

    #[must_use]
    pub fn with_position(self, position: i32) -> Self {
        {
            let mut fw = self.firmware();
            fw.position = position;
            fw.target = position;
        }
        self
    }

    #[must_use]
    pub fn with_steps_per_ms(self, steps: u32) -> Self {
        self.firmware().steps_per_ms = steps.max(1);
        self
    }

    #[must_use]
    pub fn with_names(self, friendly: impl Into<String>, bluetooth: impl Into<String>) -> Self {
        {
            let mut fw = self.firmware();
            fw.friendly_name = friendly.into();
            fw.bluetooth_name = bluetooth.into();
        }
        self
    }

    pub fn serial(&self) -> String {
        self.firmware().serial.clone()
    }

    pub fn info(&self) -> HidDeviceInfo {
        HidDeviceInfo::new(
            OASIS_VENDOR_ID,
            OASIS_FOCUSER_PRODUCT_ID,
            format!("virtual:{}", self.serial()),
        )
        .with_serial(self.serial())
        .with_manufacturer("Astroasis")
        .with_product_name("Oasis Focuser (virtual)")
    }

    pub fn position(&self) -> i32 {
        let mut fw = self.firmware();
        fw.tick();
        fw.position
    }

    pub fn is_moving(&self) -> bool {
        let mut fw = self.firmware();
        fw.tick();
        fw.moving
    }

    pub fn config(&self) -> ConfigFrame {
        self.firmware().config
    }

    pub fn friendly_name(&self) -> String {
        self.firmware().friendly_name.clone()
    }

    pub fn bluetooth_name(&self) -> String {
        self.firmware().bluetooth_name.clone()
    }

    /// Start a motion that never finishes until stopped or unfrozen.
    pub fn hold_moving(&self) {
        let mut fw = self.firmware();
        fw.moving = true;
        fw.frozen = true;
    }

    /// Let a held motion run again.
    pub fn release(&self) {
        let mut fw = self.firmware();
        fw.frozen = false;
        if fw.position == fw.target {
            fw.moving = false;
        }
    }

    /// Make every later motion stop at `position` instead of its target.
    pub fn stall_at(&self, position: Option<i32>) {
        self.firmware().stall_at = position;
    }

    pub fn set_temperature_raw(&self, ad: u32) {
        self.firmware().temperature_ad = ad;
    }

    /// Plug in the external probe with a raw reading, or unplug it.
    pub fn set_probe(&self, raw: Option<u32>) {
        self.firmware().probe = raw;
    }

    /// Stop answering requests.
    pub fn set_muted(&self, muted: bool) {
        self.firmware().muted = muted;
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.firmware().failing_writes = count;
    }

    pub fn unplug(&self) {
        self.firmware().connected = false;
    }

    pub fn is_open(&self) -> bool {
        self.firmware().open
    }

    /// Commands received so far, status polls excluded.
    pub fn commands(&self) -> Vec<Command> {
        self.firmware()
            .received
            .iter()
            .filter(|c| **c != Command::GetStatus)
            .cloned()
            .collect()
    }

    pub fn clear_commands(&self) {
        self.firmware().received.clear();
    }

    fn open_handle(&self) -> HidCommonResult<VirtualHandle> {
        let mut fw = self.firmware();
        if !fw.connected {
            return Err(HidCommonError::Disconnected);
        }
        fw.open = true;
        fw.outbox.clear();
        fw.last_tick = Instant::now();
        Ok(VirtualHandle {
            focuser: self.clone(),
            nonblocking: false,
        })
    }
}

/// Open handle onto a [`VirtualFocuser`].
#[derive(Debug)]
pub struct VirtualHandle {
    focuser: VirtualFocuser,
    nonblocking: bool,
}

impl VirtualHandle {
    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }
}

impl HidHandle for VirtualHandle {
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
        let mut fw = self.focuser.firmware();
        if !fw.connected || !fw.open {
            return Err(HidCommonError::Disconnected);
        }
        if fw.failing_writes > 0 {
            fw.failing_writes -= 1;
            return Err(HidCommonError::WriteError("injected failure".to_string()));
        }
        fw.tick();

        let command = Command::decode(data)
            .map_err(|e| HidCommonError::InvalidReport(e.to_string()))?;
        if let Some(command) = command {
            trace!(?command, "virtual focuser received");
            fw.received.push(command.clone());
            if !fw.muted {
                let reply = fw.handle(&command).encode();
                fw.outbox.push_back(reply);
            }
        }
        Ok(data.len())
    }

    fn read_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize> {
        let mut fw = self.focuser.firmware();
        if !fw.connected || !fw.open {
            return Err(HidCommonError::Disconnected);
        }
        fw.tick();
        let Some(report) = fw.outbox.pop_front() else {
            return Ok(0);
        };
        let len = report.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..len), report.get(..len)) {
            dst.copy_from_slice(src);
        }
        Ok(len)
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> HidCommonResult<()> {
        self.nonblocking = nonblocking;
        Ok(())
    }

    fn serial_number(&mut self) -> HidCommonResult<Option<String>> {
        Ok(Some(self.focuser.serial()))
    }

    fn close(&mut self) -> HidCommonResult<()> {
        let mut fw = self.focuser.firmware();
        fw.open = false;
        fw.outbox.clear();
        Ok(())
    }
}

/// [`HidBackend`] over a set of virtual focusers.
#[derive(Debug, Default, Clone)]
pub struct VirtualBackend {
    devices: Vec<VirtualFocuser>,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_device(mut self, device: VirtualFocuser) -> Self {
        self.devices.push(device);
        self
    }

    pub fn add_device(&mut self, device: VirtualFocuser) {
        self.devices.push(device);
    }

    fn attached(&self, vendor_id: u16, product_id: u16) -> impl Iterator<Item = &VirtualFocuser> {
        self.devices.iter().filter(move |d| {
            d.firmware().connected
                && vendor_id == OASIS_VENDOR_ID
                && product_id == OASIS_FOCUSER_PRODUCT_ID
        })
    }
}

impl HidBackend for VirtualBackend {
    fn enumerate(&mut self, vendor_id: u16, product_id: u16) -> HidCommonResult<Vec<HidDeviceInfo>> {
        Ok(self
            .attached(vendor_id, product_id)
            .map(VirtualFocuser::info)
            .collect())
    }

    fn open(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        serial: Option<&str>,
    ) -> HidCommonResult<Box<dyn HidHandle>> {
        let device = self
            .attached(vendor_id, product_id)
            .find(|d| serial.is_none_or(|s| d.serial() == s))
            .ok_or_else(|| {
                HidCommonError::DeviceNotFound(format!(
                    "{vendor_id:04x}:{product_id:04x} serial={}",
                    serial.unwrap_or("<any>")
                ))
            })?;
        Ok(Box::new(device.open_handle()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasis_focuser_protocol::ConfigField;

    fn open(focuser: &VirtualFocuser) -> HidCommonResult<Box<dyn HidHandle>> {
        VirtualBackend::new()
            .with_device(focuser.clone())
            .open(OASIS_VENDOR_ID, OASIS_FOCUSER_PRODUCT_ID, None)
    }

    fn exchange(handle: &mut dyn HidHandle, command: Command) -> HidCommonResult<Option<Response>> {
        handle.write_report(&command.encode())?;
        let mut buf = [0u8; 64];
        let len = handle.read_report(&mut buf)?;
        Response::decode(buf.get(..len).unwrap_or_default())
            .map_err(|e| HidCommonError::InvalidReport(e.to_string()))
    }

    #[test]
    fn test_enumerate_and_open_by_serial() -> HidCommonResult<()> {
        let mut backend = VirtualBackend::new()
            .with_device(VirtualFocuser::new("OF001"))
            .with_device(VirtualFocuser::new("OF002"));
        let serials: Vec<_> = backend
            .enumerate(OASIS_VENDOR_ID, OASIS_FOCUSER_PRODUCT_ID)?
            .into_iter()
            .filter_map(|d| d.serial_number)
            .collect();
        assert_eq!(serials, vec!["OF001", "OF002"]);

        let mut handle = backend.open(OASIS_VENDOR_ID, OASIS_FOCUSER_PRODUCT_ID, Some("OF002"))?;
        assert_eq!(handle.serial_number()?, Some("OF002".to_string()));

        assert!(backend.open(OASIS_VENDOR_ID, OASIS_FOCUSER_PRODUCT_ID, Some("nope")).is_err());
        assert!(backend.enumerate(0x1234, 0x5678)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_config_round_trip() -> HidCommonResult<()> {
        let focuser = VirtualFocuser::new("OF001").with_max_step(5000);
        let mut handle = open(&focuser)?;

        let ack = exchange(handle.as_mut(), Command::set_config(ConfigField::Speed(80)))?;
        assert_eq!(ack, Some(Response::Ack(command_codes::SET_CONFIG)));

        let Some(Response::Config(config)) = exchange(handle.as_mut(), Command::GetConfig)? else {
            return Err(HidCommonError::InvalidReport("expected config".to_string()));
        };
        assert_eq!(config.speed, 80);
        assert_eq!(config.max_step, 5000);
        Ok(())
    }

    #[test]
    fn test_motion_reaches_target() -> HidCommonResult<()> {
        let focuser = VirtualFocuser::new("OF001").with_steps_per_ms(1000);
        let mut handle = open(&focuser)?;
        exchange(handle.as_mut(), Command::MoveTo(400))?;
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(focuser.position(), 400);
        assert!(!focuser.is_moving());
        Ok(())
    }

    #[test]
    fn test_stall_and_stop() -> HidCommonResult<()> {
        let focuser = VirtualFocuser::new("OF001").with_steps_per_ms(1000);
        focuser.stall_at(Some(150));
        let mut handle = open(&focuser)?;
        exchange(handle.as_mut(), Command::MoveTo(400))?;
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(focuser.position(), 150);

        focuser.hold_moving();
        assert!(focuser.is_moving());
        exchange(handle.as_mut(), Command::StopMove)?;
        assert!(!focuser.is_moving());
        Ok(())
    }

    #[test]
    fn test_muted_device_only_records() -> HidCommonResult<()> {
        let focuser = VirtualFocuser::new("OF001");
        focuser.set_muted(true);
        let mut handle = open(&focuser)?;
        assert_eq!(exchange(handle.as_mut(), Command::GetVersion)?, None);
        assert_eq!(focuser.commands(), vec![Command::GetVersion]);
        Ok(())
    }

    #[test]
    fn test_close_and_unplug() -> HidCommonResult<()> {
        let focuser = VirtualFocuser::new("OF001");
        let mut handle = open(&focuser)?;
        assert!(focuser.is_open());
        handle.close()?;
        assert!(!focuser.is_open());
        assert!(handle.write_report(&Command::GetStatus.encode()).is_err());

        focuser.unplug();
        assert!(open(&focuser).is_err());
        Ok(())
    }
}

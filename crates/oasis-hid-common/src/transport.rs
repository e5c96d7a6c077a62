//! HID transport traits
//!
//! The focuser core talks to hardware only through these two traits. A
//! [`HidBackend`] enumerates and opens devices; the [`HidHandle`] it returns
//! performs report I/O on one open device. Closing is `close` or drop.

use crate::{HidCommonError, HidCommonResult, HidDeviceInfo};
use tracing::{debug, trace};

/// One open HID device.
///
/// Implementations must be `Send` so the handle can be shared by the
/// background loops behind a mutex. They are not required to be `Sync`.
pub trait HidHandle: Send {
    /// Write one output report, report id byte included. Returns bytes written.
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize>;

    /// Read one input report into `buf`.
    ///
    /// In non-blocking mode this returns `Ok(0)` when no report is pending.
    fn read_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize>;

    fn set_nonblocking(&mut self, nonblocking: bool) -> HidCommonResult<()>;

    /// Serial number string reported by the USB descriptor, if any.
    fn serial_number(&mut self) -> HidCommonResult<Option<String>>;

    fn close(&mut self) -> HidCommonResult<()> {
        Ok(())
    }
}

/// Device discovery and opening.
pub trait HidBackend: Send {
    /// All attached devices matching the vendor/product pair.
    fn enumerate(&mut self, vendor_id: u16, product_id: u16)
    -> HidCommonResult<Vec<HidDeviceInfo>>;

    /// Open a device, by serial number when one is given, otherwise the first match.
    fn open(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        serial: Option<&str>,
    ) -> HidCommonResult<Box<dyn HidHandle>>;
}

/// Serial numbers of all attached devices matching the vendor/product pair.
pub fn enumerate_serials(
    backend: &mut dyn HidBackend,
    vendor_id: u16,
    product_id: u16,
) -> HidCommonResult<Vec<String>> {
    let serials: Vec<String> = backend
        .enumerate(vendor_id, product_id)?
        .into_iter()
        .filter_map(|info| info.serial_number)
        .collect();
    debug!(
        vendor_id = %format!("{vendor_id:04x}"),
        product_id = %format!("{product_id:04x}"),
        count = serials.len(),
        "enumerated HID devices"
    );
    Ok(serials)
}

pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct MockShared {
        read_queue: VecDeque<Vec<u8>>,
        write_history: Vec<Vec<u8>>,
        failing_writes: usize,
        refuse_nonblocking: bool,
        nonblocking: bool,
        connected: bool,
        closed: bool,
    }

    /// In-memory HID device. Clones share the same queues.
    #[derive(Clone)]
    pub struct MockHidDevice {
        info: HidDeviceInfo,
        shared: Arc<Mutex<MockShared>>,
    }

    impl MockHidDevice {
        pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
            Self {
                info: HidDeviceInfo::new(vendor_id, product_id, path),
                shared: Arc::new(Mutex::new(MockShared {
                    connected: true,
                    ..MockShared::default()
                })),
            }
        }

        pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
            self.info = self.info.with_serial(serial);
            self
        }

        pub fn info(&self) -> &HidDeviceInfo {
            &self.info
        }

        fn shared(&self) -> std::sync::MutexGuard<'_, MockShared> {
            self.shared.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn queue_read(&self, data: Vec<u8>) {
            self.shared().read_queue.push_back(data);
        }

        pub fn get_write_history(&self) -> Vec<Vec<u8>> {
            self.shared().write_history.clone()
        }

        pub fn clear_write_history(&self) {
            self.shared().write_history.clear();
        }

        /// Make the next `count` writes fail with a write error.
        pub fn fail_next_writes(&self, count: usize) {
            self.shared().failing_writes = count;
        }

        /// Make `set_nonblocking` fail, as a device that rejects the mode change.
        pub fn refuse_nonblocking(&self, refuse: bool) {
            self.shared().refuse_nonblocking = refuse;
        }

        pub fn is_nonblocking(&self) -> bool {
            self.shared().nonblocking
        }

        pub fn is_closed(&self) -> bool {
            self.shared().closed
        }

        pub fn is_connected(&self) -> bool {
            self.shared().connected
        }

        pub fn disconnect(&self) {
            self.shared().connected = false;
        }

        pub fn reconnect(&self) {
            self.shared().connected = true;
        }
    }

    impl HidHandle for MockHidDevice {
        fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
            let mut shared = self.shared();
            if !shared.connected {
                return Err(HidCommonError::Disconnected);
            }
            if shared.failing_writes > 0 {
                shared.failing_writes -= 1;
                trace!(remaining = shared.failing_writes, "mock write failure injected");
                return Err(HidCommonError::WriteError("injected failure".to_string()));
            }
            trace!(len = data.len(), path = %self.info.path, "mock write");
            shared.write_history.push(data.to_vec());
            Ok(data.len())
        }

        fn read_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize> {
            let mut shared = self.shared();
            if !shared.connected {
                return Err(HidCommonError::Disconnected);
            }
            let Some(report) = shared.read_queue.pop_front() else {
                return Ok(0);
            };
            let len = report.len().min(buf.len());
            if let (Some(dst), Some(src)) = (buf.get_mut(..len), report.get(..len)) {
                dst.copy_from_slice(src);
            }
            Ok(len)
        }

        fn set_nonblocking(&mut self, nonblocking: bool) -> HidCommonResult<()> {
            let mut shared = self.shared();
            if shared.refuse_nonblocking {
                return Err(HidCommonError::OpenError(
                    "non-blocking mode refused".to_string(),
                ));
            }
            shared.nonblocking = nonblocking;
            Ok(())
        }

        fn serial_number(&mut self) -> HidCommonResult<Option<String>> {
            Ok(self.info.serial_number.clone())
        }

        fn close(&mut self) -> HidCommonResult<()> {
            debug!(path = %self.info.path, "mock device closed");
            self.shared().closed = true;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockHidBackend {
        devices: Vec<MockHidDevice>,
        fail_open: bool,
    }

    impl MockHidBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_device(&mut self, device: MockHidDevice) {
            self.devices.push(device);
        }

        pub fn device_count(&self) -> usize {
            self.devices.len()
        }

        /// Make every subsequent `open` fail.
        pub fn set_fail_open(&mut self, fail: bool) {
            self.fail_open = fail;
        }
    }

    impl HidBackend for MockHidBackend {
        fn enumerate(
            &mut self,
            vendor_id: u16,
            product_id: u16,
        ) -> HidCommonResult<Vec<HidDeviceInfo>> {
            Ok(self
                .devices
                .iter()
                .filter(|d| d.info.matches(vendor_id, product_id))
                .map(|d| d.info.clone())
                .collect())
        }

        fn open(
            &mut self,
            vendor_id: u16,
            product_id: u16,
            serial: Option<&str>,
        ) -> HidCommonResult<Box<dyn HidHandle>> {
            if self.fail_open {
                return Err(HidCommonError::OpenError("open refused".to_string()));
            }
            self.devices
                .iter()
                .filter(|d| d.info.matches(vendor_id, product_id))
                .find(|d| serial.is_none_or(|s| d.info.has_serial(s)))
                .map(|d| Box::new(d.clone()) as Box<dyn HidHandle>)
                .ok_or_else(|| {
                    HidCommonError::DeviceNotFound(format!(
                        "{vendor_id:04x}:{product_id:04x} serial={}",
                        serial.unwrap_or("<any>")
                    ))
                })
        }
    }
}

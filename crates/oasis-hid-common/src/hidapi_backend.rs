//! `hidapi`-backed transport for real hardware.

use crate::{HidBackend, HidCommonError, HidCommonResult, HidDeviceInfo, HidHandle};
use hidapi::{HidApi, HidDevice};
use tracing::debug;

pub struct HidApiBackend {
    api: HidApi,
}

impl HidApiBackend {
    pub fn new() -> HidCommonResult<Self> {
        let api = HidApi::new().map_err(|e| HidCommonError::OpenError(e.to_string()))?;
        Ok(Self { api })
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(
        &mut self,
        vendor_id: u16,
        product_id: u16,
    ) -> HidCommonResult<Vec<HidDeviceInfo>> {
        self.api
            .refresh_devices()
            .map_err(|e| HidCommonError::DeviceNotFound(e.to_string()))?;

        let devices: Vec<HidDeviceInfo> = self
            .api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(|d| HidDeviceInfo {
                vendor_id: d.vendor_id(),
                product_id: d.product_id(),
                serial_number: d.serial_number().map(str::to_string),
                manufacturer: d.manufacturer_string().map(str::to_string),
                product_name: d.product_string().map(str::to_string),
                path: d.path().to_string_lossy().into_owned(),
            })
            .collect();

        debug!(
            "Enumerated {} HID devices for {:04x}:{:04x}",
            devices.len(),
            vendor_id,
            product_id
        );
        Ok(devices)
    }

    fn open(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        serial: Option<&str>,
    ) -> HidCommonResult<Box<dyn HidHandle>> {
        let device = match serial {
            Some(serial) => self.api.open_serial(vendor_id, product_id, serial),
            None => self.api.open(vendor_id, product_id),
        }
        .map_err(|e| HidCommonError::OpenError(e.to_string()))?;

        Ok(Box::new(HidApiHandle { device }))
    }
}

struct HidApiHandle {
    device: HidDevice,
}

impl HidHandle for HidApiHandle {
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
        self.device
            .write(data)
            .map_err(|e| HidCommonError::WriteError(e.to_string()))
    }

    fn read_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize> {
        self.device
            .read(buf)
            .map_err(|e| HidCommonError::ReadError(e.to_string()))
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> HidCommonResult<()> {
        self.device
            .set_blocking_mode(!nonblocking)
            .map_err(|e| HidCommonError::OpenError(e.to_string()))
    }

    fn serial_number(&mut self) -> HidCommonResult<Option<String>> {
        self.device
            .get_serial_number_string()
            .map_err(|e| HidCommonError::ReadError(e.to_string()))
    }
}

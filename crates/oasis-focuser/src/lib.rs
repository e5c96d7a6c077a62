//! Device-control core for the Oasis USB HID focuser.
//!
//! [`OasisFocuser`] owns one connection: it opens the device through a
//! [`HidBackend`](oasis_hid_common::HidBackend), runs the transport pump
//! (status sender and report poller threads), folds decoded responses into a
//! shared [`DeviceState`] and tracks goto completion with automatic
//! re-issue. [`VirtualBackend`] simulates the firmware for tests and demos.
//!
//! ```no_run
//! use oasis_focuser::{ControllerConfig, OasisFocuser, VirtualBackend, VirtualFocuser};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = VirtualBackend::new().with_device(VirtualFocuser::new("OF0001"));
//! let mut focuser = OasisFocuser::with_backend(backend, ControllerConfig::default())?;
//! focuser.connect()?;
//! focuser.goto_position(1200)?;
//! while !focuser.is_goto_complete()? {
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]

pub mod capability;
pub mod config;
pub mod controller;
pub mod error;
pub mod goto;
pub mod pump;
pub mod state;
pub mod virtual_device;

pub use capability::{FocuserControl, MOVE_PRESETS, UNLINKED_TEMPERATURE};
pub use config::{ConfigError, ControllerConfig, ControllerConfigBuilder, GotoRetryPolicy, TemperatureSource};
pub use controller::OasisFocuser;
pub use error::{ErrorCode, FocuserError, FocuserResult};
pub use goto::{GotoDecision, GotoPhase, GotoSession};
pub use pump::{PumpTiming, SharedDevice, TransportPump};
pub use state::{DeviceState, StateStore};
pub use virtual_device::{VirtualBackend, VirtualFocuser, VirtualHandle};

#[cfg(feature = "hidapi")]
pub use oasis_hid_common::HidApiBackend;

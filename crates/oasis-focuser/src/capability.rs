//! Host-facing focuser capability.
//!
//! [`FocuserControl`] is the narrow surface a planetarium or imaging host
//! drives: link state, limits, absolute and relative moves, abort, goto
//! polling and temperature. Queries made while unlinked report
//! [`FocuserError::NotConnected`]; temperature falls back to
//! [`UNLINKED_TEMPERATURE`].

use crate::controller::OasisFocuser;
use crate::error::{FocuserError, FocuserResult};
use tracing::debug;

/// Relative-move step sizes offered to the host, smallest first.
pub const MOVE_PRESETS: [u32; 9] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000];

/// Temperature reported when no focuser is linked.
pub const UNLINKED_TEMPERATURE: f64 = -100.0;

pub trait FocuserControl {
    fn link(&mut self) -> FocuserResult<()>;

    fn unlink(&mut self);

    fn is_linked(&self) -> bool;

    /// Lowest reachable position. Always zero for the Oasis.
    fn min_limit(&self) -> u32 {
        0
    }

    fn max_limit(&self) -> FocuserResult<u32>;

    fn current_position(&self) -> FocuserResult<u32>;

    fn goto_absolute(&self, position: i64) -> FocuserResult<()>;

    fn goto_relative(&self, steps: i64) -> FocuserResult<()>;

    fn abort(&self) -> FocuserResult<()>;

    fn poll_goto_complete(&self) -> FocuserResult<bool>;

    /// Final position once a goto is over.
    fn end_goto(&self) -> FocuserResult<u32> {
        self.current_position()
    }

    fn temperature_celsius(&self) -> FocuserResult<f64>;

    fn temperature_or_sentinel(&self) -> f64 {
        self.temperature_celsius().unwrap_or(UNLINKED_TEMPERATURE)
    }

    fn firmware(&self) -> String;

    fn move_presets(&self) -> &'static [u32] {
        &MOVE_PRESETS
    }
}

impl OasisFocuser {
    fn linked<T>(&self, f: impl FnOnce(&Self) -> T) -> FocuserResult<T> {
        if self.is_connected() {
            Ok(f(self))
        } else {
            Err(FocuserError::NotConnected)
        }
    }
}

impl FocuserControl for OasisFocuser {
    fn link(&mut self) -> FocuserResult<()> {
        self.connect()
    }

    fn unlink(&mut self) {
        self.disconnect();
    }

    fn is_linked(&self) -> bool {
        self.is_connected()
    }

    fn max_limit(&self) -> FocuserResult<u32> {
        self.linked(OasisFocuser::position_limit)
    }

    fn current_position(&self) -> FocuserResult<u32> {
        self.linked(OasisFocuser::position)
    }

    fn goto_absolute(&self, position: i64) -> FocuserResult<()> {
        self.goto_position(position)
    }

    fn goto_relative(&self, steps: i64) -> FocuserResult<()> {
        self.move_relative(steps)
    }

    fn abort(&self) -> FocuserResult<()> {
        self.halt()
    }

    fn poll_goto_complete(&self) -> FocuserResult<bool> {
        self.is_goto_complete()
    }

    fn end_goto(&self) -> FocuserResult<u32> {
        let position = self.linked(OasisFocuser::position)?;
        debug!(position, "goto ended");
        Ok(position)
    }

    fn temperature_celsius(&self) -> FocuserResult<f64> {
        self.linked(OasisFocuser::temperature)
    }

    fn firmware(&self) -> String {
        self.firmware_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use oasis_hid_common::mock::MockHidBackend;

    #[test]
    fn test_unlinked_queries() -> Result<(), Box<dyn std::error::Error>> {
        let focuser =
            OasisFocuser::with_backend(MockHidBackend::new(), ControllerConfig::default())?;
        assert!(!focuser.is_linked());
        assert_eq!(focuser.min_limit(), 0);
        assert!(matches!(focuser.max_limit(), Err(FocuserError::NotConnected)));
        assert!(matches!(focuser.current_position(), Err(FocuserError::NotConnected)));
        assert!(matches!(focuser.end_goto(), Err(FocuserError::NotConnected)));
        assert_eq!(focuser.temperature_or_sentinel(), UNLINKED_TEMPERATURE);
        assert_eq!(focuser.firmware(), "NA");
        Ok(())
    }

    #[test]
    fn test_presets_ascend() {
        assert!(MOVE_PRESETS.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(MOVE_PRESETS.first(), Some(&10));
        assert_eq!(MOVE_PRESETS.last(), Some(&10000));
    }
}

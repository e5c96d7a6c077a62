//! Error types for focuser operations.
//!
//! Every failure a public operation can report maps onto one [`ErrorCode`],
//! the status taxonomy host adapters expose.

use oasis_focuser_protocol::ProtocolError;
use oasis_hid_common::HidCommonError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur during focuser operations.
#[derive(Debug, thiserror::Error)]
pub enum FocuserError {
    /// No controller session (used by host adapters before linking).
    #[error("Focuser not connected")]
    NotConnected,

    /// The device could not be enumerated or opened.
    #[error("Cannot connect to focuser: {0}")]
    CantConnect(#[source] HidCommonError),

    /// The operation needs an open device handle.
    #[error("No link to focuser")]
    CommNoLink,

    /// The I/O retry budget was exhausted.
    #[error("Command 0x{code:02X} failed after {attempts} attempts")]
    CmdFailed {
        /// Frame command code
        code: u8,
        /// Write attempts made
        attempts: u32,
    },

    /// A goto settled away from its target and will not be retried.
    #[error("Goto to {target} stopped at {reached}")]
    GotoFailed {
        /// Requested position
        target: i64,
        /// Position the focuser settled at
        reached: i32,
    },

    /// A position-changing call while the focuser is moving.
    #[error("Focuser is moving")]
    CmdInProgress,

    /// Goto target outside `[0, max_position]`.
    #[error("Position {requested} outside 0..={max}")]
    LimitsExceeded {
        /// Requested position
        requested: i64,
        /// Cached maximum position
        max: u32,
    },

    /// A device response could not be decoded.
    #[error("Bad response: {0}")]
    BadCmdResponse(#[from] ProtocolError),

    /// Worker thread could not be started.
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name
        name: &'static str,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl FocuserError {
    /// Status code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::NotConnected,
            Self::CantConnect(_) | Self::Spawn { .. } => ErrorCode::CantConnect,
            Self::CommNoLink => ErrorCode::CommNoLink,
            Self::CmdFailed { .. } | Self::GotoFailed { .. } => ErrorCode::CmdFailed,
            Self::CmdInProgress => ErrorCode::CmdInProgress,
            Self::LimitsExceeded { .. } => ErrorCode::LimitsExceeded,
            Self::BadCmdResponse(_) => ErrorCode::BadCmdResponse,
        }
    }
}

/// Status codes returned across the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Ok,
    NotConnected,
    CantConnect,
    BadCmdResponse,
    CmdFailed,
    CommNoLink,
    CmdInProgress,
    LimitsExceeded,
}

impl ErrorCode {
    /// Stable numeric value.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::NotConnected => 1,
            Self::CantConnect => 2,
            Self::BadCmdResponse => 3,
            Self::CmdFailed => 4,
            Self::CommNoLink => 5,
            Self::CmdInProgress => 6,
            Self::LimitsExceeded => 7,
        }
    }

    /// Collapse a result into its status code.
    pub fn from_result<T>(result: &FocuserResult<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => e.code(),
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::NotConnected => "NOT_CONNECTED",
            Self::CantConnect => "CANT_CONNECT",
            Self::BadCmdResponse => "BAD_CMD_RESPONSE",
            Self::CmdFailed => "CMDFAILED",
            Self::CommNoLink => "COMMNOLINK",
            Self::CmdInProgress => "CMD_IN_PROGRESS",
            Self::LimitsExceeded => "LIMITSEXCEEDED",
        };
        f.write_str(name)
    }
}

impl<T> From<&FocuserResult<T>> for ErrorCode {
    fn from(result: &FocuserResult<T>) -> Self {
        Self::from_result(result)
    }
}

/// A specialized `Result` type for focuser operations.
pub type FocuserResult<T> = Result<T, FocuserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(FocuserError::CommNoLink.code(), ErrorCode::CommNoLink);
        assert_eq!(FocuserError::CmdInProgress.code(), ErrorCode::CmdInProgress);
        assert_eq!(
            FocuserError::GotoFailed {
                target: 500,
                reached: 480
            }
            .code(),
            ErrorCode::CmdFailed
        );
        assert_eq!(
            FocuserError::CantConnect(HidCommonError::Disconnected).code(),
            ErrorCode::CantConnect
        );
    }

    #[test]
    fn test_numeric_values_are_distinct() {
        let codes = [
            ErrorCode::Ok,
            ErrorCode::NotConnected,
            ErrorCode::CantConnect,
            ErrorCode::BadCmdResponse,
            ErrorCode::CmdFailed,
            ErrorCode::CommNoLink,
            ErrorCode::CmdInProgress,
            ErrorCode::LimitsExceeded,
        ];
        for (i, code) in codes.iter().enumerate() {
            assert_eq!(code.as_i32(), i as i32);
        }
    }

    #[test]
    fn test_from_result() {
        let ok: FocuserResult<u32> = Ok(3);
        assert_eq!(ErrorCode::from_result(&ok), ErrorCode::Ok);

        let err: FocuserResult<u32> = Err(FocuserError::LimitsExceeded {
            requested: 6000,
            max: 5000,
        });
        assert_eq!(ErrorCode::from(&err), ErrorCode::LimitsExceeded);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::CmdFailed.to_string(), "CMDFAILED");
        let err = FocuserError::CmdFailed {
            code: 0x36,
            attempts: 1000,
        };
        assert_eq!(err.to_string(), "Command 0x36 failed after 1000 attempts");
    }
}

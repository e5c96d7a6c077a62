//! Error types for oasisctl

use oasis_focuser::{ConfigError, FocuserError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("No focuser found: {0}")]
    DeviceNotFound(String),

    #[error("Goto did not finish within {0} s")]
    Timeout(u64),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Hardware backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Refusing to overwrite {0} (use --force)")]
    FileExists(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Process exit code for a failed command.
///
/// Focuser failures exit with `10 + ErrorCode`, so scripts can tell a busy
/// focuser (16) from an out-of-range target (17).
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<FocuserError>() {
        return 10 + e.code().as_i32();
    }
    if error.downcast_ref::<ConfigError>().is_some() {
        return 4;
    }
    match error.downcast_ref::<CliError>() {
        Some(CliError::DeviceNotFound(_)) => 2,
        Some(CliError::Timeout(_)) => 3,
        Some(CliError::InvalidValue(_)) | Some(CliError::JsonError(_)) => 4,
        Some(CliError::BackendUnavailable(_)) => 5,
        Some(CliError::FileExists(_)) => 6,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focuser_errors_offset_by_ten() {
        let busy = anyhow::Error::from(FocuserError::CmdInProgress);
        assert_eq!(exit_code(&busy), 16);
        let limits = anyhow::Error::from(FocuserError::LimitsExceeded {
            requested: -1,
            max: 100,
        });
        assert_eq!(exit_code(&limits), 17);
    }

    #[test]
    fn cli_errors_have_fixed_codes() {
        assert_eq!(exit_code(&CliError::DeviceNotFound("x".into()).into()), 2);
        assert_eq!(exit_code(&CliError::Timeout(5).into()), 3);
        assert_eq!(exit_code(&CliError::InvalidValue("x".into()).into()), 4);
        assert_eq!(exit_code(&ConfigError::invalid("bad").into()), 4);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}

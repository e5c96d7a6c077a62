//! Command implementations for oasisctl

pub mod config;
pub mod device;
pub mod motion;

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use oasis_focuser::{
    ControllerConfig, OasisFocuser, TemperatureSource, VirtualBackend, VirtualFocuser,
};
use oasis_hid_common::HidBackend;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::CliError;

/// Serial number of the simulated focuser behind `--virtual`.
pub const VIRTUAL_SERIAL: &str = "OASIS-SIM-0001";

/// Global options every command sees.
pub struct Session {
    pub json: bool,
    pub config_path: Option<PathBuf>,
    pub serial: Option<String>,
    pub use_virtual: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective controller configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Destination (default: the per-user config path)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the per-user configuration file path
    Path,
}

/// Device settings changeable with `oasisctl set`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Setting {
    MaxStep,
    Backlash,
    #[value(alias = "backlash-dir")]
    BacklashDirection,
    Reverse,
    Speed,
    #[value(alias = "beep-move")]
    BeepOnMove,
    #[value(alias = "beep-startup")]
    BeepOnStartup,
    Bluetooth,
    BluetoothName,
    FriendlyName,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Internal,
    External,
}

impl From<SourceArg> for TemperatureSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Internal => TemperatureSource::Internal,
            SourceArg::External => TemperatureSource::External,
        }
    }
}

/// `$CONFIG_DIR/oasis/focuser.json`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("oasis").join("focuser.json"))
}

impl Session {
    /// Configuration from `--config`, else the per-user file when present,
    /// else defaults; `--serial` overrides the file.
    pub fn load_config(&self) -> Result<ControllerConfig> {
        let path = self
            .config_path
            .clone()
            .or_else(|| default_config_path().filter(|p| p.exists()));

        let mut config = match path {
            Some(path) => load_from(&path)?,
            None => ControllerConfig::default(),
        };
        if let Some(serial) = &self.serial {
            config.serial = Some(serial.clone());
            config.validate()?;
        }
        Ok(config)
    }

    fn backend(&self) -> Result<Box<dyn HidBackend>> {
        if self.use_virtual {
            debug!(serial = VIRTUAL_SERIAL, "using simulated focuser");
            let device = VirtualFocuser::new(VIRTUAL_SERIAL).with_names("Simulator", "OasisSim");
            return Ok(Box::new(VirtualBackend::new().with_device(device)));
        }
        hardware_backend()
    }

    /// A disconnected controller over the selected backend.
    pub fn controller(&self) -> Result<OasisFocuser> {
        let config = self.load_config()?;
        Ok(OasisFocuser::new(self.backend()?, config)?)
    }

    /// A controller connected to the selected focuser.
    pub fn connect(&self) -> Result<OasisFocuser> {
        let mut focuser = self.controller()?;
        if let Some(serial) = &self.serial
            && !focuser.is_focuser_present(serial)?
        {
            return Err(CliError::DeviceNotFound(serial.clone()).into());
        }
        if self.serial.is_none() && focuser.list_focusers()?.is_empty() {
            return Err(CliError::DeviceNotFound("no Oasis focuser attached".to_string()).into());
        }
        focuser.connect()?;
        info!(serial = %focuser.serial(), "focuser ready");
        Ok(focuser)
    }
}

fn load_from(path: &Path) -> Result<ControllerConfig> {
    let config = ControllerConfig::load(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

#[cfg(feature = "hardware")]
fn hardware_backend() -> Result<Box<dyn HidBackend>> {
    let backend = oasis_focuser::HidApiBackend::new()
        .map_err(|e| CliError::BackendUnavailable(e.to_string()))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "hardware"))]
fn hardware_backend() -> Result<Box<dyn HidBackend>> {
    Err(CliError::BackendUnavailable(
        "built without the `hardware` feature; use --virtual".to_string(),
    )
    .into())
}

/// Parse an on/off style flag value.
pub fn parse_flag(value: &str) -> Result<bool, CliError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(CliError::InvalidValue(format!(
            "expected on/off, got '{other}'"
        ))),
    }
}

pub fn parse_number<T>(value: &str) -> Result<T, CliError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CliError::InvalidValue(format!("'{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn flags_accept_common_spellings() -> TestResult {
        assert!(parse_flag("on")?);
        assert!(parse_flag("TRUE")?);
        assert!(parse_flag(" 1 ")?);
        assert!(!parse_flag("off")?);
        assert!(!parse_flag("no")?);
        assert!(matches!(parse_flag("maybe"), Err(CliError::InvalidValue(_))));
        Ok(())
    }

    #[test]
    fn numbers_reject_garbage() -> TestResult {
        assert_eq!(parse_number::<u32>("1500")?, 1500);
        assert!(matches!(parse_number::<u8>("300"), Err(CliError::InvalidValue(_))));
        assert!(matches!(parse_number::<u32>("-4"), Err(CliError::InvalidValue(_))));
        Ok(())
    }

    #[test]
    fn setting_short_names_resolve() -> TestResult {
        assert_eq!(Setting::from_str("backlash-dir", false)?, Setting::BacklashDirection);
        assert_eq!(Setting::from_str("beep-move", false)?, Setting::BeepOnMove);
        assert_eq!(Setting::from_str("beep-startup", false)?, Setting::BeepOnStartup);
        assert_eq!(Setting::from_str("max-step", false)?, Setting::MaxStep);
        Ok(())
    }

    #[test]
    fn serial_override_applies() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("focuser.json");
        std::fs::write(&path, r#"{ "serial": "FROMFILE", "goto_debounce_ms": 250 }"#)?;

        let session = Session {
            json: false,
            config_path: Some(path),
            serial: Some("OVERRIDE".to_string()),
            use_virtual: true,
        };
        let config = session.load_config()?;
        assert_eq!(config.serial.as_deref(), Some("OVERRIDE"));
        assert_eq!(config.goto_debounce_ms, 250);
        Ok(())
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let session = Session {
            json: false,
            config_path: Some(PathBuf::from("/nonexistent/oasis/focuser.json")),
            serial: None,
            use_virtual: true,
        };
        assert!(session.load_config().is_err());
    }
}

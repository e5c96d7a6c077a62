//! Controller configuration file commands

use anyhow::Result;
use oasis_focuser::ControllerConfig;
use std::fs;
use tracing::info;

use crate::commands::{ConfigCommands, Session, default_config_path};
use crate::error::CliError;
use crate::output;

/// Execute config command
pub fn execute(cmd: &ConfigCommands, session: &Session) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = session.load_config()?;
            output::print_config(&config, session.json)
        }
        ConfigCommands::Init { path, force } => {
            let path = path
                .clone()
                .or_else(default_config_path)
                .ok_or_else(|| CliError::InvalidValue("no config directory; pass --path".to_string()))?;
            if path.exists() && !force {
                return Err(CliError::FileExists(path.display().to_string()).into());
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(CliError::from)?;
            }
            let body = serde_json::to_string_pretty(&ControllerConfig::default())
                .map_err(CliError::from)?;
            fs::write(&path, body).map_err(CliError::from)?;
            info!(path = %path.display(), "configuration written");
            output::print_path("written", &path, session.json);
            Ok(())
        }
        ConfigCommands::Path => {
            let path = default_config_path()
                .ok_or_else(|| CliError::InvalidValue("no config directory on this platform".to_string()))?;
            output::print_path("path", &path, session.json);
            Ok(())
        }
    }
}

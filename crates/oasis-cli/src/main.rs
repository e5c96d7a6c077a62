//! oasisctl - Oasis focuser control CLI
//!
//! Moves, configures and monitors Oasis USB HID focusers from the shell.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{ConfigCommands, Session, Setting, SourceArg};

#[derive(Parser)]
#[command(name = "oasisctl")]
#[command(about = "Oasis Focuser Control CLI - Move, configure and monitor Oasis USB focusers")]
#[command(version)]
#[command(long_about = "
oasisctl drives Astroasis Oasis focusers over USB HID.
Every command opens the focuser, runs the connection handshake, performs its
action and disconnects again.

Use --json for machine-readable output. Focuser failures exit with
10 + the driver error code (16 = focuser busy, 17 = position out of range).
Use --virtual to run against a simulated focuser.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Controller configuration file (JSON)
    #[arg(long, global = true, env = "OASISCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Serial number of the focuser to use (default: first found)
    #[arg(short, long, global = true, env = "OASISCTL_SERIAL")]
    serial: Option<String>,

    /// Use a simulated focuser instead of USB hardware
    #[arg(long = "virtual", global = true)]
    use_virtual: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached focusers by serial number
    List,

    /// Show position, settings and temperatures
    Status,

    /// Move to an absolute position
    Goto {
        /// Target position in steps
        #[arg(allow_hyphen_values = true)]
        position: i64,
        /// Return as soon as the move is issued
        #[arg(long)]
        no_wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },

    /// Move by a signed number of steps
    Move {
        /// Steps to move; negative moves inward
        #[arg(allow_hyphen_values = true)]
        steps: i64,
        /// Return as soon as the move is issued
        #[arg(long)]
        no_wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },

    /// Stop any motion
    Halt,

    /// Redefine the current position without moving
    Sync {
        /// New value for the current position
        position: u32,
    },

    /// Change one device setting
    Set {
        #[arg(value_enum)]
        setting: Setting,
        /// New value (numbers, on/off, or a name)
        value: String,
    },

    /// Read the focuser temperature
    Temp {
        /// Sensor to read (default: from configuration)
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
    },

    /// List relative-move step presets
    Presets,

    /// Controller configuration file management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("oasisctl={log_level},oasis_focuser={log_level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = execute_command(&cli) {
        if cli.json {
            output::print_error_json(&e);
        } else {
            output::print_error_human(&e);
        }
        std::process::exit(error::exit_code(&e));
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let session = Session {
        json: cli.json,
        config_path: cli.config.clone(),
        serial: cli.serial.clone(),
        use_virtual: cli.use_virtual,
    };

    match &cli.command {
        Commands::List => commands::device::list(&session),
        Commands::Status => commands::device::status(&session),
        Commands::Goto {
            position,
            no_wait,
            timeout,
        } => commands::motion::goto(&session, *position, !*no_wait, *timeout),
        Commands::Move {
            steps,
            no_wait,
            timeout,
        } => commands::motion::move_by(&session, *steps, !*no_wait, *timeout),
        Commands::Halt => commands::motion::halt(&session),
        Commands::Sync { position } => commands::motion::sync(&session, *position),
        Commands::Set { setting, value } => commands::device::set(&session, *setting, value),
        Commands::Temp { source } => commands::device::temperature(&session, *source),
        Commands::Presets => {
            output::print_presets(oasis_focuser::MOVE_PRESETS.as_slice(), cli.json);
            Ok(())
        }
        Commands::Config(cmd) => commands::config::execute(cmd, &session),
        Commands::Completion { shell } => {
            completion::generate_completion(*shell);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_list_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["oasisctl", "list"])?;
        assert!(!cli.json);
        assert!(!cli.use_virtual);
        assert_eq!(cli.verbose, 0);
        assert!(cli.serial.is_none());
        assert!(matches!(cli.command, Commands::List));
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from([
            "oasisctl", "status", "--json", "--virtual", "-vv", "--serial", "OF1",
        ])?;
        assert!(cli.json);
        assert!(cli.use_virtual);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.serial.as_deref(), Some("OF1"));
        Ok(())
    }

    #[test]
    fn parse_negative_move() -> TestResult {
        let cli = Cli::try_parse_from(["oasisctl", "move", "-250", "--no-wait"])?;
        match cli.command {
            Commands::Move {
                steps,
                no_wait,
                timeout,
            } => {
                assert_eq!(steps, -250);
                assert!(no_wait);
                assert_eq!(timeout, 120);
            }
            _ => return Err("expected move".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_set_setting() -> TestResult {
        let cli = Cli::try_parse_from(["oasisctl", "set", "beep-on-move", "on"])?;
        assert!(matches!(
            cli.command,
            Commands::Set {
                setting: Setting::BeepOnMove,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_rejects_unknown_setting() {
        assert!(Cli::try_parse_from(["oasisctl", "set", "warp", "9"]).is_err());
    }

    #[test]
    fn parse_temp_source() -> TestResult {
        let cli = Cli::try_parse_from(["oasisctl", "temp", "--source", "external"])?;
        assert!(matches!(
            cli.command,
            Commands::Temp {
                source: Some(SourceArg::External)
            }
        ));
        Ok(())
    }
}

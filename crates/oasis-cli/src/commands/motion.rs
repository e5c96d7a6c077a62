//! Motion commands: goto, relative move, halt and sync

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use oasis_focuser::OasisFocuser;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::commands::Session;
use crate::error::CliError;
use crate::output;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Move to an absolute position
pub fn goto(session: &Session, position: i64, wait: bool, timeout_secs: u64) -> Result<()> {
    let focuser = session.connect()?;
    focuser.goto_position(position)?;
    finish_move(&focuser, session, wait, timeout_secs)
}

/// Move relative to the current position
pub fn move_by(session: &Session, steps: i64, wait: bool, timeout_secs: u64) -> Result<()> {
    let focuser = session.connect()?;
    focuser.move_relative(steps)?;
    finish_move(&focuser, session, wait, timeout_secs)
}

/// Stop the focuser
pub fn halt(session: &Session) -> Result<()> {
    let focuser = session.connect()?;
    let was_moving = focuser.is_moving();
    focuser.halt()?;
    output::print_motion("halted", focuser.position(), session.json);
    debug!(was_moving, "halt sent");
    Ok(())
}

/// Redefine the current position
pub fn sync(session: &Session, position: u32) -> Result<()> {
    let focuser = session.connect()?;
    focuser.set_position(position)?;
    output::print_motion("synced", position, session.json);
    Ok(())
}

fn finish_move(focuser: &OasisFocuser, session: &Session, wait: bool, timeout_secs: u64) -> Result<()> {
    let target = focuser.goto_target();
    if !wait {
        output::print_motion("moving", focuser.position(), session.json);
        return Ok(());
    }

    let spinner = if session.json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        match ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            Ok(style) => pb.set_style(style),
            Err(e) => warn!(error = %e, "spinner template rejected"),
        }
        pb
    };

    let result = wait_for_goto(focuser, &spinner, target, Duration::from_secs(timeout_secs));
    match &result {
        Ok(()) => spinner.finish_with_message(format!("✓ Reached {}", focuser.position())),
        Err(_) => spinner.abandon(),
    }
    result?;
    output::print_motion("arrived", focuser.position(), session.json);
    Ok(())
}

/// Poll goto completion until it finishes, fails or times out.
fn wait_for_goto(focuser: &OasisFocuser, spinner: &ProgressBar, target: i64, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if focuser.is_goto_complete()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            warn!(target, "stopping focuser after wait timeout");
            focuser.halt()?;
            return Err(CliError::Timeout(timeout.as_secs()).into());
        }
        spinner.set_message(format!("Moving to {target}: at {}", focuser.position()));
        spinner.tick();
        thread::sleep(POLL_INTERVAL);
    }
}

//! Output formatting for CLI responses

use anyhow::Error;
use clap::ValueEnum;
use colored::*;
use oasis_focuser::{ControllerConfig, TemperatureSource};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use crate::commands::Setting;
use crate::commands::device::StatusView;

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format output as JSON: {}", e),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    print_json(&json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "exitCode": crate::error::exit_code(error)
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print attached focuser serials
pub fn print_serials(serials: &[String], json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "focusers": serials
        }));
        return;
    }
    if serials.is_empty() {
        println!("{}", "No focusers found".yellow());
        return;
    }
    println!("{}", "Attached Focusers:".bold());
    for serial in serials {
        println!("  {} {}", "●".green(), serial.bold());
    }
}

fn on_off(value: bool) -> ColoredString {
    if value { "on".green() } else { "off".dimmed() }
}

/// Print focuser status
pub fn print_status(status: &StatusView, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "status": status
        }));
        return;
    }

    println!("{} {} ({})", "Focuser:".bold(), status.model, status.serial.dimmed());
    println!("  Firmware: {}", status.firmware);
    println!("  Name: {}", status.friendly_name);
    let motion = if status.moving {
        "moving".yellow()
    } else {
        "idle".green()
    };
    println!(
        "  Position: {} / {} ({})",
        status.position.to_string().bold(),
        status.max_position,
        motion
    );
    println!("  Speed: {}", status.speed);
    println!(
        "  Backlash: {} steps, direction {}",
        status.backlash, status.backlash_direction
    );
    println!("  Reverse: {}", on_off(status.reverse));
    println!(
        "  Beep: on move {}, on startup {}",
        on_off(status.beep_on_move),
        on_off(status.beep_on_startup)
    );
    println!(
        "  Bluetooth: {} ({})",
        on_off(status.bluetooth_enabled),
        status.bluetooth_name
    );
    println!("  Temperature: {:.2} °C", status.temperature_c);
    match status.ambient_c {
        Some(ambient) => println!("  Ambient: {:.2} °C", ambient),
        None => println!("  Ambient: {}", "no probe".dimmed()),
    }
}

/// Print the outcome of a motion command
pub fn print_motion(action: &str, position: u32, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "action": action,
            "position": position
        }));
    } else {
        println!("{} {} at {}", "✓".green(), action, position.to_string().bold());
    }
}

/// Print a changed setting
pub fn print_setting(setting: Setting, value: &str, json: bool) {
    let name = setting
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| format!("{setting:?}"));
    if json {
        print_json(&json!({
            "success": true,
            "setting": name,
            "value": value
        }));
    } else {
        println!("{} {} = {}", "✓".green(), name, value.bold());
    }
}

/// Print a temperature reading
pub fn print_temperature(source: TemperatureSource, celsius: f64, probe_present: bool, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "source": source,
            "celsius": celsius,
            "externalProbe": probe_present
        }));
        return;
    }
    let label = match source {
        TemperatureSource::Internal => "Internal",
        TemperatureSource::External => "External",
    };
    println!("{}: {:.2} °C", label.bold(), celsius);
    if source == TemperatureSource::External && !probe_present {
        println!("  {}", "probe not connected, showing last reading".yellow());
    }
}

/// Print relative-move presets
pub fn print_presets(presets: &[u32], json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "presets": presets
        }));
        return;
    }
    println!("{}", "Relative move presets (steps):".bold());
    for steps in presets {
        println!("  {}", steps);
    }
}

/// Print the effective controller configuration
pub fn print_config(config: &ControllerConfig, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&json!({
            "success": true,
            "config": config
        }));
    } else {
        println!("{}", serde_json::to_string_pretty(config)?);
    }
    Ok(())
}

#[derive(Serialize)]
struct PathReport<'a> {
    success: bool,
    action: &'a str,
    path: &'a Path,
}

/// Print a file path result
pub fn print_path(action: &str, path: &Path, json: bool) {
    if json {
        match serde_json::to_value(PathReport {
            success: true,
            action,
            path,
        }) {
            Ok(value) => print_json(&value),
            Err(e) => eprintln!("Failed to format output as JSON: {}", e),
        }
    } else {
        println!("{} {}", action.bold(), path.display());
    }
}

//! Integration tests for oasisctl
//!
//! Every device command runs with `--virtual` against the simulated focuser,
//! checking output and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Custom predicate to check if output is valid JSON
fn is_json() -> impl predicates::Predicate<[u8]> {
    predicates::function::function(|s: &[u8]| {
        std::str::from_utf8(s)
            .map(|text| serde_json::from_str::<Value>(text).is_ok())
            .unwrap_or(false)
    })
}

/// An oasisctl command on the simulated focuser, isolated from any user config.
fn oasisctl(config_dir: &TempDir) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("oasisctl")?;
    cmd.arg("--virtual")
        .env_remove("OASISCTL_SERIAL")
        .env_remove("RUST_LOG")
        .env("OASISCTL_CONFIG", config_dir.path().join("focuser.json"))
        .env("XDG_CONFIG_HOME", config_dir.path());
    Ok(cmd)
}

/// A config directory holding a fast-polling configuration.
fn fast_config_dir() -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = serde_json::json!({
        "status_interval_ms": 20,
        "command_settle_ms": 5,
        "command_retry_interval_ms": 5,
        "handshake_interval_ms": 5,
        "halt_settle_ms": 10,
        "goto_debounce_ms": 100
    });
    std::fs::write(
        dir.path().join("focuser.json"),
        serde_json::to_string_pretty(&config)?,
    )?;
    Ok(dir)
}

fn json_stdout(cmd: &mut Command) -> Result<Value, Box<dyn std::error::Error>> {
    let output = cmd.output()?;
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn test_cli_help() -> TestResult {
    Command::cargo_bin("oasisctl")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Oasis"));
    Ok(())
}

#[test]
fn test_cli_version() -> TestResult {
    Command::cargo_bin("oasisctl")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("oasisctl"));
    Ok(())
}

#[test]
fn test_completion_generation() -> TestResult {
    Command::cargo_bin("oasisctl")?
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("oasisctl"));
    Ok(())
}

#[test]
fn test_list_virtual() -> TestResult {
    let dir = fast_config_dir()?;
    oasisctl(&dir)?
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("OASIS-SIM-0001"));

    let value = json_stdout(oasisctl(&dir)?.args(["list", "--json"]))?;
    assert_eq!(value["success"], true);
    assert_eq!(value["focusers"][0], "OASIS-SIM-0001");
    Ok(())
}

#[test]
fn test_status_json() -> TestResult {
    let dir = fast_config_dir()?;
    oasisctl(&dir)?
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(is_json());

    let value = json_stdout(oasisctl(&dir)?.args(["status", "--json"]))?;
    let status = &value["status"];
    assert_eq!(status["serial"], "OASIS-SIM-0001");
    assert_eq!(status["model"], "Oasis Focuser");
    assert_eq!(status["friendly_name"], "Simulator");
    assert_eq!(status["max_position"], 100_000);
    assert_eq!(status["moving"], false);
    assert!(status["ambient_c"].is_null());
    Ok(())
}

#[test]
fn test_status_human() -> TestResult {
    let dir = fast_config_dir()?;
    oasisctl(&dir)?
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Position:"))
        .stdout(predicate::str::contains("1.2.3.4"));
    Ok(())
}

#[test]
fn test_goto_waits_for_arrival() -> TestResult {
    let dir = fast_config_dir()?;
    let value = json_stdout(oasisctl(&dir)?.args(["goto", "1500", "--json"]))?;
    assert_eq!(value["success"], true);
    assert_eq!(value["action"], "arrived");
    assert_eq!(value["position"], 1500);
    Ok(())
}

#[test]
fn test_goto_out_of_range_exit_code() -> TestResult {
    let dir = fast_config_dir()?;
    oasisctl(&dir)?
        .args(["goto", "200000"])
        .assert()
        .code(17)
        .stderr(predicate::str::contains("outside"));

    oasisctl(&dir)?
        .args(["move", "-10", "--json"])
        .assert()
        .code(17)
        .stdout(is_json());
    Ok(())
}

#[test]
fn test_halt_and_sync() -> TestResult {
    let dir = fast_config_dir()?;
    oasisctl(&dir)?
        .arg("halt")
        .assert()
        .success()
        .stdout(predicate::str::contains("halted"));

    let value = json_stdout(oasisctl(&dir)?.args(["sync", "4200", "--json"]))?;
    assert_eq!(value["action"], "synced");
    assert_eq!(value["position"], 4200);
    Ok(())
}

#[test]
fn test_set_settings() -> TestResult {
    let dir = fast_config_dir()?;
    let value = json_stdout(oasisctl(&dir)?.args(["set", "speed", "3", "--json"]))?;
    assert_eq!(value["setting"], "speed");
    assert_eq!(value["value"], "3");

    oasisctl(&dir)?
        .args(["set", "beep-on-move", "on"])
        .assert()
        .success()
        .stdout(predicate::str::contains("beep-on-move"));

    let value = json_stdout(oasisctl(&dir)?.args(["set", "friendly-name", "  Main scope  ", "--json"]))?;
    assert_eq!(value["value"], "Main scope");
    Ok(())
}

#[test]
fn test_set_invalid_value_exit_code() -> TestResult {
    let dir = fast_config_dir()?;
    oasisctl(&dir)?
        .args(["set", "reverse", "sideways"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Invalid value"));

    oasisctl(&dir)?
        .args(["set", "speed", "9000"])
        .assert()
        .code(4);
    Ok(())
}

#[test]
fn test_temperature() -> TestResult {
    let dir = fast_config_dir()?;
    let value = json_stdout(oasisctl(&dir)?.args(["temp", "--json"]))?;
    assert_eq!(value["source"], "internal");
    assert_eq!(value["externalProbe"], false);
    let celsius = value["celsius"].as_f64().ok_or("celsius missing")?;
    assert!((celsius - 25.01).abs() < 0.01);

    oasisctl(&dir)?
        .args(["temp", "--source", "external"])
        .assert()
        .success()
        .stdout(predicate::str::contains("probe not connected"));
    Ok(())
}

#[test]
fn test_unknown_serial_exit_code() -> TestResult {
    let dir = fast_config_dir()?;
    oasisctl(&dir)?
        .args(["status", "--serial", "NOPE"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No focuser found"));
    Ok(())
}

#[test]
fn test_presets() -> TestResult {
    let dir = fast_config_dir()?;
    let value = json_stdout(oasisctl(&dir)?.args(["presets", "--json"]))?;
    let presets = value["presets"].as_array().ok_or("presets missing")?;
    assert_eq!(presets.len(), 9);
    assert_eq!(presets.first(), Some(&Value::from(10)));
    Ok(())
}

#[test]
fn test_config_init_and_show() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("focuser.json");

    oasisctl(&dir)?
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    oasisctl(&dir)?
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .code(6);

    let value = json_stdout(
        oasisctl(&dir)?
            .args(["config", "show", "--json", "--config"])
            .arg(&path),
    )?;
    assert_eq!(value["config"]["goto_debounce_ms"], 500);
    assert_eq!(value["config"]["goto_retry_policy"], "single");
    Ok(())
}

#[test]
fn test_invalid_config_exit_code() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("focuser.json"), r#"{ "status_interval_ms": 0 }"#)?;
    oasisctl(&dir)?
        .arg("status")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("status_interval_ms"));
    Ok(())
}

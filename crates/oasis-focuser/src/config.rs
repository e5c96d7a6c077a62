//! Controller configuration.
//!
//! Every timing constant of the controller lives here so tests and host
//! adapters can shrink or stretch them. Defaults match the firmware's
//! expectations.

use oasis_focuser_protocol::{OASIS_FOCUSER_PRODUCT_ID, OASIS_VENDOR_ID};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest accepted goto debounce window.
pub const MAX_GOTO_DEBOUNCE_MS: u64 = 60_000;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The config file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Which sensor `temperature()` reads by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureSource {
    /// On-board NTC thermistor.
    #[default]
    Internal,
    /// External ambient probe.
    External,
}

/// How the goto tracker reacts to a focuser that settles off target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GotoRetryPolicy {
    /// Re-issue once, then keep waiting. Only a halt ends the session with
    /// a failure.
    #[default]
    Single,
    /// Re-issue on every settled off-target poll and fail after
    /// `max_goto_retry` re-issues.
    Escalating,
}

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Explicit serial number; `None` picks the first enumerated device.
    pub serial: Option<String>,
    /// Sender loop period.
    pub status_interval_ms: u64,
    /// Poller loop period.
    pub poll_interval_ms: u64,
    /// Write attempts per command before giving up.
    pub command_retry_limit: u32,
    pub command_retry_interval_ms: u64,
    /// Pause after every command so the poller can pick up the ack.
    pub command_settle_ms: u64,
    pub handshake_interval_ms: u64,
    pub handshake_max_attempts: u32,
    /// The model query gets a much shorter budget than the other
    /// handshake items.
    pub model_max_attempts: u32,
    pub halt_settle_ms: u64,
    /// Grace period after a goto before "not moving" is trusted.
    pub goto_debounce_ms: u64,
    pub max_goto_retry: u32,
    pub goto_retry_policy: GotoRetryPolicy,
    pub temperature_source: TemperatureSource,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            vendor_id: OASIS_VENDOR_ID,
            product_id: OASIS_FOCUSER_PRODUCT_ID,
            serial: None,
            status_interval_ms: 1000,
            poll_interval_ms: 1,
            command_retry_limit: 1000,
            command_retry_interval_ms: 100,
            command_settle_ms: 100,
            handshake_interval_ms: 10,
            handshake_max_attempts: 1000,
            model_max_attempts: 10,
            halt_settle_ms: 100,
            goto_debounce_ms: 500,
            max_goto_retry: 3,
            goto_retry_policy: GotoRetryPolicy::Single,
            temperature_source: TemperatureSource::Internal,
        }
    }
}

impl ControllerConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any interval or limit is zero, or the debounce
    /// window exceeds [`MAX_GOTO_DEBOUNCE_MS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("status_interval_ms", self.status_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("command_retry_interval_ms", self.command_retry_interval_ms),
            ("handshake_interval_ms", self.handshake_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::invalid(format!("{name} must be non-zero")));
        }

        let limits = [
            ("command_retry_limit", self.command_retry_limit),
            ("handshake_max_attempts", self.handshake_max_attempts),
            ("model_max_attempts", self.model_max_attempts),
            ("max_goto_retry", self.max_goto_retry),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::invalid(format!("{name} must be non-zero")));
        }

        if self.goto_debounce_ms > MAX_GOTO_DEBOUNCE_MS {
            return Err(ConfigError::invalid(format!(
                "goto_debounce_ms must not exceed {MAX_GOTO_DEBOUNCE_MS}"
            )));
        }
        if self.serial.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ConfigError::invalid("serial must not be blank"));
        }
        Ok(())
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn command_retry_interval(&self) -> Duration {
        Duration::from_millis(self.command_retry_interval_ms)
    }

    pub fn command_settle(&self) -> Duration {
        Duration::from_millis(self.command_settle_ms)
    }

    pub fn handshake_interval(&self) -> Duration {
        Duration::from_millis(self.handshake_interval_ms)
    }

    pub fn halt_settle(&self) -> Duration {
        Duration::from_millis(self.halt_settle_ms)
    }

    pub fn goto_debounce(&self) -> Duration {
        Duration::from_millis(self.goto_debounce_ms)
    }
}

/// Builder for `ControllerConfig`.
#[derive(Debug, Default)]
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    #[must_use]
    pub fn usb_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.config.vendor_id = vendor_id;
        self.config.product_id = product_id;
        self
    }

    #[must_use]
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.config.serial = Some(serial.into());
        self
    }

    #[must_use]
    pub fn status_interval_ms(mut self, ms: u64) -> Self {
        self.config.status_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the command retry budget and the pause between failed attempts.
    #[must_use]
    pub fn command_retry(mut self, limit: u32, interval_ms: u64) -> Self {
        self.config.command_retry_limit = limit;
        self.config.command_retry_interval_ms = interval_ms;
        self
    }

    #[must_use]
    pub fn command_settle_ms(mut self, ms: u64) -> Self {
        self.config.command_settle_ms = ms;
        self
    }

    /// Set the handshake pause and the per-item attempt budgets.
    #[must_use]
    pub fn handshake(mut self, interval_ms: u64, max_attempts: u32, model_max_attempts: u32) -> Self {
        self.config.handshake_interval_ms = interval_ms;
        self.config.handshake_max_attempts = max_attempts;
        self.config.model_max_attempts = model_max_attempts;
        self
    }

    #[must_use]
    pub fn halt_settle_ms(mut self, ms: u64) -> Self {
        self.config.halt_settle_ms = ms;
        self
    }

    #[must_use]
    pub fn goto_debounce_ms(mut self, ms: u64) -> Self {
        self.config.goto_debounce_ms = ms;
        self
    }

    #[must_use]
    pub fn max_goto_retry(mut self, retries: u32) -> Self {
        self.config.max_goto_retry = retries;
        self
    }

    #[must_use]
    pub fn goto_retry_policy(mut self, policy: GotoRetryPolicy) -> Self {
        self.config.goto_retry_policy = policy;
        self
    }

    #[must_use]
    pub fn temperature_source(mut self, source: TemperatureSource) -> Self {
        self.config.temperature_source = source;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<ControllerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.vendor_id, 0x338F);
        assert_eq!(config.product_id, 0xA0F0);
        assert_eq!(config.status_interval(), Duration::from_secs(1));
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.command_retry_limit, 1000);
        assert_eq!(config.model_max_attempts, 10);
        assert_eq!(config.goto_debounce(), Duration::from_millis(500));
        assert_eq!(config.max_goto_retry, 3);
        assert_eq!(config.goto_retry_policy, GotoRetryPolicy::Single);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = ControllerConfig {
            poll_interval_ms: 0,
            ..ControllerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ControllerConfig {
            model_max_attempts: 0,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ControllerConfig {
            goto_debounce_ms: MAX_GOTO_DEBOUNCE_MS + 1,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ControllerConfig {
            serial: Some("  ".to_string()),
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() -> Result<(), ConfigError> {
        let config = ControllerConfig::builder()
            .serial("OF123")
            .status_interval_ms(5)
            .command_retry(3, 1)
            .handshake(1, 50, 5)
            .goto_retry_policy(GotoRetryPolicy::Escalating)
            .temperature_source(TemperatureSource::External)
            .build()?;
        assert_eq!(config.serial.as_deref(), Some("OF123"));
        assert_eq!(config.status_interval_ms, 5);
        assert_eq!(config.command_retry_limit, 3);
        assert_eq!(config.handshake_max_attempts, 50);
        assert_eq!(config.goto_retry_policy, GotoRetryPolicy::Escalating);
        assert_eq!(config.temperature_source, TemperatureSource::External);
        Ok(())
    }

    #[test]
    fn test_builder_rejects_zero_retry_limit() {
        let result = ControllerConfig::builder().command_retry(0, 10).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() -> Result<(), ConfigError> {
        let config = ControllerConfig::from_json_str(
            r#"{ "serial": "OF42", "goto_retry_policy": "escalating", "temperature_source": "external" }"#,
        )?;
        assert_eq!(config.serial.as_deref(), Some("OF42"));
        assert_eq!(config.goto_retry_policy, GotoRetryPolicy::Escalating);
        assert_eq!(config.temperature_source, TemperatureSource::External);
        assert_eq!(config.command_retry_limit, 1000);
        Ok(())
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        assert!(matches!(
            ControllerConfig::from_json_str(r#"{ "status_interval_ms": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ControllerConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("focuser.json");
        std::fs::write(&path, r#"{ "halt_settle_ms": 5 }"#)?;
        let config = ControllerConfig::load(&path)?;
        assert_eq!(config.halt_settle(), Duration::from_millis(5));

        assert!(matches!(
            ControllerConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
        Ok(())
    }
}

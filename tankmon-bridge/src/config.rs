//! Configuration for the bridge.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tankmon_common::config::{LoggingConfig, ZenohConfig};
use tankmon_push::{ExtraLabels, PushConfig};
use thiserror::Error;

use crate::args::BridgeArgs;
use crate::decoder::DeviceProfile;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Common(#[from] tankmon_common::Error),
    #[error("Push configuration error: {0}")]
    Push(#[from] tankmon_push::error::ConfigError),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// The sensor this bridge listens to.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Push destination settings.
    #[serde(default)]
    pub push: PushConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sensor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor name (required, usually set through `SENSOR`).
    #[serde(default)]
    pub name: String,

    /// Device profile used to decode messages.
    #[serde(default)]
    pub profile: DeviceProfile,

    /// Key expression template; `{sensor}` is replaced by the name
    /// (default: "tele/{sensor}/SENSOR").
    #[serde(default = "default_key_expr")]
    pub key_expr: String,

    /// Label carrying the sensor name on every pushed series (default: "sensor").
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_key_expr() -> String {
    "tele/{sensor}/SENSOR".to_string()
}

fn default_label() -> String {
    "sensor".to_string()
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            profile: DeviceProfile::default(),
            key_expr: default_key_expr(),
            label: default_label(),
        }
    }
}

/// Characters with special meaning in Zenoh key expressions.
const KEY_EXPR_SPECIAL: &[char] = &['/', '*', '$', '?', '#'];

impl BridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(tankmon_common::load_config(path)?)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(tankmon_common::parse_config(content)?)
    }

    /// Load the file named by `args` (if any) and apply the CLI/env overrides.
    ///
    /// The result is validated.
    pub fn from_args(args: &BridgeArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI/env overrides on top of the file values.
    pub fn apply_args(&mut self, args: &BridgeArgs) {
        if let Some(sensor) = &args.sensor {
            self.sensor.name = sensor.clone();
        }
        if let Some(profile) = args.profile {
            self.sensor.profile = profile;
        }
        if let Some(broker) = &args.connect {
            self.zenoh.set_broker(broker);
        }
        if let Some(url) = &args.push_url {
            self.push.url = url.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor.name.is_empty() {
            return Err(ConfigError::Validation(
                "No sensor name provided (set SENSOR or sensor.name)".to_string(),
            ));
        }

        if self.sensor.name.contains(KEY_EXPR_SPECIAL) {
            return Err(ConfigError::Validation(format!(
                "Sensor name '{}' contains key expression characters",
                self.sensor.name
            )));
        }

        if !self.sensor.key_expr.contains("{sensor}") {
            return Err(ConfigError::Validation(
                "sensor.key_expr must contain {sensor}".to_string(),
            ));
        }

        self.zenoh.validate()?;
        self.push.validate()?;
        self.extra_labels()?;

        Ok(())
    }

    /// Key expression to subscribe to.
    pub fn key_expr(&self) -> String {
        self.sensor.key_expr.replace("{sensor}", &self.sensor.name)
    }

    /// Labels injected into every pushed series: the sensor label first,
    /// then the configured extra labels.
    pub fn extra_labels(&self) -> Result<ExtraLabels, ConfigError> {
        Ok(self
            .push
            .labels(&[(self.sensor.label.as_str(), self.sensor.name.as_str())])?)
    }
}

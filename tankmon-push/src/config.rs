//! Push configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::labels::{ExtraLabels, is_valid_identifier};
use crate::push::parse_push_url;

/// Default VictoriaMetrics single-node import endpoint.
pub const DEFAULT_PUSH_URL: &str =
    "http://victoria-metrics-victoria-metrics-single-server:8428/api/v1/import/prometheus";

/// Where and how to push gauge snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Import endpoint URL (http or https).
    #[serde(default = "default_url")]
    pub url: String,

    /// Per-request timeout in seconds (default: 20).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Labels added to every pushed series, after any device labels.
    #[serde(default)]
    pub extra_labels: BTreeMap<String, String>,

    /// Include `process_*` metrics of this process.
    #[serde(default)]
    pub include_process_metrics: bool,

    /// Push on a fixed interval as well (seconds, 0 = only on new data).
    #[serde(default)]
    pub interval_secs: u64,
}

fn default_url() -> String {
    DEFAULT_PUSH_URL.to_string()
}

fn default_timeout() -> u64 {
    20
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
            extra_labels: BTreeMap::new(),
            include_process_metrics: false,
            interval_secs: 0,
        }
    }
}

impl PushConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The periodic push interval, if enabled.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }

    /// Build the label set: `leading` pairs first, then `extra_labels`.
    pub fn labels(&self, leading: &[(&str, &str)]) -> Result<ExtraLabels, ConfigError> {
        let pairs = leading.iter().copied().chain(
            self.extra_labels
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        Ok(ExtraLabels::from_pairs(pairs)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        parse_push_url(&self.url).map_err(|e| ConfigError::Validation(e.to_string()))?;

        if let Some(key) = self.extra_labels.keys().find(|k| !is_valid_identifier(k)) {
            return Err(ConfigError::Validation(format!(
                "Invalid extra label name: {}",
                key
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabelError;

    fn parse(json: &str) -> PushConfig {
        json5::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = parse("{}");

        assert_eq!(config.url, DEFAULT_PUSH_URL);
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert!(config.extra_labels.is_empty());
        assert!(!config.include_process_metrics);
        assert_eq!(config.interval(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"{
                url: "https://vm.example.com/api/v1/import/prometheus",
                timeout_secs: 5,
                extra_labels: { site: "barn", job: "tankmon" },
                include_process_metrics: true,
                interval_secs: 60,
            }"#,
        );

        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.interval(), Some(Duration::from_secs(60)));
        assert!(config.include_process_metrics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_labels_order() {
        let config = parse(r#"{ extra_labels: { site: "barn", job: "tankmon" } }"#);
        let labels = config.labels(&[("sensor", "tank1")]).unwrap();

        assert_eq!(
            labels.as_str(),
            r#"sensor="tank1",job="tankmon",site="barn""#
        );
    }

    #[test]
    fn test_labels_conflict_with_leading_label() {
        let config = parse(r#"{ extra_labels: { sensor: "other" } }"#);
        let err = config.labels(&[("sensor", "tank1")]).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Labels(LabelError::DuplicateLabel(ref name)) if name == "sensor"
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = parse("{ timeout_secs: 0 }");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_url() {
        let config = parse(r#"{ url: "ftp://x" }"#);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_validate_bad_label_name() {
        let config = parse(r#"{ extra_labels: { "bad-name": "x" } }"#);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bad-name"));
    }
}

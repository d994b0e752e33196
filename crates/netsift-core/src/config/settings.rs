//! Detector settings and TOML configuration parsing.
//!
//! Configuration is resolved once at startup: TOML file first, then
//! environment variable overrides (`INDICATORS`, `INPUT`, `OUTPUT`,
//! `METRICS_PORT`) for container deployments that configure via env only.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level detector configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Path to the indicator definition file (JSON).
    #[serde(default = "default_indicator_file")]
    pub indicator_file: PathBuf,

    /// Input topic to subscribe to.
    #[serde(default = "default_input")]
    pub input: String,

    /// Output topics to publish enriched events to.
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,

    /// Broker frontend endpoint the publisher connects to.
    #[serde(default = "default_output_endpoint")]
    pub output_endpoint: String,

    /// Broker backend endpoint the subscriber connects to.
    #[serde(default = "default_input_endpoint")]
    pub input_endpoint: String,

    /// Seconds between indicator file freshness checks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Port for the `GET /metrics` endpoint.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_indicator_file() -> PathBuf {
    PathBuf::from("indicators.json")
}

fn default_input() -> String {
    "geo".to_string()
}

fn default_outputs() -> Vec<String> {
    vec!["output".to_string()]
}

fn default_input_endpoint() -> String {
    "tcp://127.0.0.1:5751".to_string()
}

fn default_output_endpoint() -> String {
    "tcp://127.0.0.1:5750".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_metrics_port() -> u16 {
    8088
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            indicator_file: default_indicator_file(),
            input: default_input(),
            outputs: default_outputs(),
            output_endpoint: default_output_endpoint(),
            input_endpoint: default_input_endpoint(),
            poll_interval_secs: default_poll_interval_secs(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// If the file does not exist, returns the default configuration.
    /// Environment overrides are applied on top in either case.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(file) = std::env::var("INDICATORS") {
            self.indicator_file = PathBuf::from(file);
        }
        if let Ok(input) = std::env::var("INPUT") {
            self.input = input;
        }
        if let Ok(outputs) = std::env::var("OUTPUT") {
            self.outputs = outputs
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(port) = std::env::var("METRICS_PORT") {
            match port.parse() {
                Ok(port) => self.metrics_port = port,
                Err(e) => warn!(
                    value = %port,
                    error = %e,
                    "invalid METRICS_PORT override, keeping configured port"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.indicator_file, PathBuf::from("indicators.json"));
        assert_eq!(config.input, "geo");
        assert_eq!(config.outputs, vec!["output".to_string()]);
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.metrics_port, 8088);
    }

    #[test]
    fn test_config_parses_toml() {
        let toml_str = r#"
indicator_file = "/etc/netsift/indicators.json"
input = "cyberprobe"
outputs = ["enriched", "archive"]
poll_interval_secs = 30
"#;
        let config: DetectorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.indicator_file,
            PathBuf::from("/etc/netsift/indicators.json")
        );
        assert_eq!(config.input, "cyberprobe");
        assert_eq!(config.outputs, vec!["enriched", "archive"]);
        assert_eq!(config.poll_interval_secs, 30);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.metrics_port, 8088);
    }

    #[test]
    fn test_config_parses_empty_toml_uses_defaults() {
        let config: DetectorConfig = toml::from_str("").unwrap();
        assert_eq!(config.input, "geo");
        assert_eq!(config.outputs, vec!["output".to_string()]);
    }

    // The only test in this crate touching METRICS_PORT; the other tests
    // never call apply_env, so there is no env-var cross-talk.
    #[test]
    fn test_invalid_metrics_port_override_keeps_configured_port() {
        let mut config = DetectorConfig::default();
        std::env::set_var("METRICS_PORT", "not-a-port");
        config.apply_env();
        std::env::remove_var("METRICS_PORT");
        assert_eq!(config.metrics_port, 8088);
    }
}

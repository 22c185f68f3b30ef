//! Declarative configuration for the runner and its gates.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

use crate::Result;

/// Default per-gate deadline in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default base delay between retry attempts in milliseconds.
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Complete runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Run gates concurrently instead of in registration order.
    #[serde(default)]
    pub parallel: bool,
    /// Keep running sequential gates after a failure.
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,
    /// Deadline applied to gates without their own timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Base delay for linear retry backoff, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Gates to register, in order.
    #[serde(default)]
    pub gates: Vec<GateConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            continue_on_failure: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            gates: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Declarative description of one gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Gate kind resolved by the registry (`style`, `security`, `complexity`,
    /// `test-runner`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Overrides the kind's default gate name.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the gate participates in runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-gate deadline override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Number of retries after a failed attempt.
    #[serde(default)]
    pub retry_count: u32,
    /// Issues at severity `error` or above needed to fail the gate.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,
    /// Gate-specific settings handed to the factory.
    #[serde(default)]
    pub settings: JsonMap<String, Value>,
}

impl GateConfig {
    /// Creates a config for the given kind with engine defaults.
    pub fn new<T: Into<String>>(kind: T) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            enabled: true,
            timeout_ms: None,
            retry_count: 0,
            failure_threshold: 1,
            settings: JsonMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_failure_threshold() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert!(!config.parallel);
        assert!(config.continue_on_failure);
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.gates.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let raw = r#"
            parallel = true
            continue_on_failure = false

            [[gates]]
            type = "style"
            timeout_ms = 5000

            [[gates]]
            type = "test-runner"
            enabled = false
            retry_count = 2

            [gates.settings]
            command = "cargo"
        "#;

        let config: RunnerConfig = toml::from_str(raw).unwrap_or_default();
        assert!(config.parallel);
        assert!(!config.continue_on_failure);
        assert_eq!(config.gates.len(), 2);
        assert_eq!(config.gates[0].kind, "style");
        assert_eq!(config.gates[0].timeout_ms, Some(5000));
        assert!(!config.gates[1].enabled);
        assert_eq!(config.gates[1].retry_count, 2);
        assert_eq!(
            config.gates[1].settings.get("command").and_then(Value::as_str),
            Some("cargo")
        );
    }
}

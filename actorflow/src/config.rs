//! Flow-level configuration.

use crate::errors::ActorflowError;
use crate::variables::UnsetPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How actor errors affect the enclosing flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Stop only when the failing actor has `stop_flow_on_error` set.
    #[default]
    ActorsDecideToStopOnError,
    /// Stop on any actor error.
    ActorsAlwaysStopOnError,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Configuration for running a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Error handling mode.
    #[serde(default)]
    pub error_handling: ErrorHandling,
    /// Run interactive actors without prompting.
    #[serde(default)]
    pub headless: bool,
    /// Track provenance on tokens.
    #[serde(default)]
    pub provenance_enabled: bool,
    /// Default treatment of unset variables during expansion.
    #[serde(default)]
    pub unset_variable_policy: UnsetPolicy,
    /// Expose the process environment as read-only `env.*` variables.
    #[serde(default = "default_import_environment")]
    pub import_environment: bool,
    /// Time limit for a single user interaction.
    #[serde(default)]
    pub interaction_timeout_seconds: Option<f64>,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_import_environment() -> bool {
    true
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            error_handling: ErrorHandling::default(),
            headless: false,
            provenance_enabled: false,
            unset_variable_policy: UnsetPolicy::default(),
            import_environment: default_import_environment(),
            interaction_timeout_seconds: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl FlowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ActorflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ActorflowError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Sets the error handling mode.
    #[must_use]
    pub fn with_error_handling(mut self, mode: ErrorHandling) -> Self {
        self.error_handling = mode;
        self
    }

    /// Sets headless mode.
    #[must_use]
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Enables or disables provenance tracking.
    #[must_use]
    pub fn with_provenance(mut self, enabled: bool) -> Self {
        self.provenance_enabled = enabled;
        self
    }

    /// Sets the unset variable policy.
    #[must_use]
    pub fn with_unset_variable_policy(mut self, policy: UnsetPolicy) -> Self {
        self.unset_variable_policy = policy;
        self
    }

    /// Enables or disables the `env.*` variables.
    #[must_use]
    pub fn with_import_environment(mut self, import: bool) -> Self {
        self.import_environment = import;
        self
    }

    /// Sets the interaction timeout.
    #[must_use]
    pub fn with_interaction_timeout(mut self, seconds: f64) -> Self {
        self.interaction_timeout_seconds = Some(seconds);
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Returns the interaction timeout as a duration. Non-positive values
    /// mean no timeout.
    #[must_use]
    pub fn interaction_timeout(&self) -> Option<Duration> {
        self.interaction_timeout_seconds
            .filter(|s| *s > 0.0)
            .map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FlowConfig::default();
        assert_eq!(config.error_handling, ErrorHandling::ActorsDecideToStopOnError);
        assert!(!config.headless);
        assert!(!config.provenance_enabled);
        assert_eq!(config.unset_variable_policy, UnsetPolicy::Keep);
        assert!(config.import_environment);
        assert_eq!(config.interaction_timeout(), None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_json_partial() {
        let config = FlowConfig::from_json_str(
            r#"{"error_handling": "actors_always_stop_on_error", "headless": true,
                "unset_variable_policy": "fail", "logging": {"json": true}}"#,
        )
        .unwrap();

        assert_eq!(config.error_handling, ErrorHandling::ActorsAlwaysStopOnError);
        assert!(config.headless);
        assert_eq!(config.unset_variable_policy, UnsetPolicy::Fail);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
        assert!(config.import_environment);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = FlowConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ActorflowError::Serialization(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"provenance_enabled": true, "interaction_timeout_seconds": 2.5}}"#)
            .unwrap();

        let config = FlowConfig::from_file(file.path()).unwrap();
        assert!(config.provenance_enabled);
        assert_eq!(config.interaction_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_from_missing_file() {
        let err = FlowConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ActorflowError::Io(_)));
    }

    #[test]
    fn test_builder() {
        let config = FlowConfig::new()
            .with_headless(true)
            .with_provenance(true)
            .with_error_handling(ErrorHandling::ActorsAlwaysStopOnError)
            .with_unset_variable_policy(UnsetPolicy::Empty)
            .with_import_environment(false)
            .with_interaction_timeout(0.0);

        assert!(config.headless);
        assert!(config.provenance_enabled);
        assert!(!config.import_environment);
        assert_eq!(config.interaction_timeout(), None);
    }
}

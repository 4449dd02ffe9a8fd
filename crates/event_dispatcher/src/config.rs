//! Configuration management for event dispatchers.
//!
//! Settings are plain serde structs that can be built in code or loaded from a
//! TOML file. Every field has a default, so partial files are fine.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default delay used by `defer_event_dispatch_default`
fn default_defer_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// What a call to `stop_propagation` interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStop {
    /// Skip the remaining listeners on the current dispatcher and do not bubble
    #[default]
    Immediate,
    /// Let the current dispatcher finish its listeners, only suppress bubbling
    BubblingOnly,
}

/// Order in which events queued under the same trigger are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueRelease {
    /// Oldest queued event first
    #[default]
    Fifo,
    /// Most recently queued event first
    Lifo,
}

/// Behavior switches for a single dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Delay in milliseconds applied when deferring without an explicit delay
    #[serde(default = "default_defer_delay_ms")]
    pub default_defer_delay_ms: u64,
    #[serde(default)]
    pub propagation_stop: PropagationStop,
    #[serde(default)]
    pub queue_release: QueueRelease,
}

impl DispatcherSettings {
    pub fn default_defer_delay(&self) -> Duration {
        Duration::from_millis(self.default_defer_delay_ms)
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            default_defer_delay_ms: default_defer_delay_ms(),
            propagation_stop: PropagationStop::default(),
            queue_release: QueueRelease::default(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Top level configuration file layout.
///
/// ```toml
/// [dispatcher]
/// default_defer_delay_ms = 250
/// propagation_stop = "bubbling_only"
/// queue_release = "lifo"
///
/// [logging]
/// level = "debug"
/// json_format = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl DispatchConfig {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DispatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            Self::from_toml_str(&content)
        } else {
            let default_config = DispatchConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Checks the configuration for values the dispatcher cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_config_default() {
        let config = DispatchConfig::default();

        assert_eq!(config.dispatcher.default_defer_delay_ms, 1000);
        assert_eq!(config.dispatcher.default_defer_delay(), Duration::from_secs(1));
        assert_eq!(config.dispatcher.propagation_stop, PropagationStop::Immediate);
        assert_eq!(config.dispatcher.queue_release, QueueRelease::Fifo);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = DispatchConfig::from_toml_str(
            r#"
[dispatcher]
queue_release = "lifo"
"#,
        )
        .unwrap();

        assert_eq!(config.dispatcher.queue_release, QueueRelease::Lifo);
        assert_eq!(config.dispatcher.default_defer_delay_ms, 1000);
        assert_eq!(config.dispatcher.propagation_stop, PropagationStop::Immediate);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_invalid_log_level() {
        let result = DispatchConfig::from_toml_str(
            r#"
[logging]
level = "loud"
"#,
        );

        match result {
            Err(ConfigError::Invalid(message)) => assert!(message.contains("Invalid log level")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_variant_is_parse_error() {
        let result = DispatchConfig::from_toml_str(
            r#"
[dispatcher]
propagation_stop = "sometimes"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[dispatcher]
default_defer_delay_ms = 250
propagation_stop = "bubbling_only"
queue_release = "lifo"

[logging]
level = "debug"
json_format = true
"#;

        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = DispatchConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.dispatcher.default_defer_delay(), Duration::from_millis(250));
        assert_eq!(config.dispatcher.propagation_stop, PropagationStop::BubblingOnly);
        assert_eq!(config.dispatcher.queue_release, QueueRelease::Lifo);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_writes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dispatch.toml");

        let config = DispatchConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, DispatchConfig::default());
        assert!(path.exists());

        let reloaded = DispatchConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }
}

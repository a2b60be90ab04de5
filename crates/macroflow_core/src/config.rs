//! Runtime configuration file.
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "engine": { "scale_factor": 1.5, "poll_interval_ms": 50, "sleep_slice_ms": 100 },
//!   "logging": { "level": "debug", "format": "compact", "filter": "macroflow_graph=trace" }
//! }
//! ```

use core::time::Duration;
use std::path::{Path, PathBuf};

use macroflow_graph::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::logging::{LoggingConfig, TracingFormat};

/// Errors from reading or interpreting a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The file is not valid configuration JSON.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// `logging.level` is not a tracing level.
    #[error("unknown log level '{0}'")]
    InvalidLevel(String),
    /// `engine.scale_factor` is not a positive finite number.
    #[error("scale factor must be positive, got {0}")]
    InvalidScale(f64),
}

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Logical to physical coordinate multiplier.
    pub scale_factor: f64,
    /// How often suspended runs re-check cancellation, in milliseconds.
    pub poll_interval_ms: u64,
    /// Sleep slice length in milliseconds (1 to 100).
    pub sleep_slice_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            scale_factor: engine.scale_factor,
            poll_interval_ms: duration_ms(engine.poll_interval),
            sleep_slice_ms: duration_ms(engine.sleep_slice),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Maximum level: `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// Output format.
    pub format: TracingFormat,
    /// Optional per-target filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Log span enter and exit.
    pub span_events: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: TracingFormat::default(),
            filter: None,
            span_events: false,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroflowConfig {
    /// Engine tunables.
    pub engine: EngineSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

impl MacroflowConfig {
    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Json`] if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is malformed.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the engine configuration. Timings are clamped by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidScale`] for a non-positive or
    /// non-finite scale factor.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let scale = self.engine.scale_factor;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::InvalidScale(scale));
        }
        Ok(EngineConfig {
            scale_factor: scale,
            poll_interval: Duration::from_millis(self.engine.poll_interval_ms),
            sleep_slice: Duration::from_millis(self.engine.sleep_slice_ms),
        })
    }

    /// Builds the logging configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLevel`] if `logging.level` is unknown.
    pub fn logging_config(&self) -> Result<LoggingConfig, ConfigError> {
        let section = &self.logging;
        let level: Level = section
            .level
            .parse()
            .map_err(|_| ConfigError::InvalidLevel(section.level.clone()))?;
        let mut config = LoggingConfig::new()
            .with_level(level)
            .with_format(section.format)
            .with_span_events(section.span_events);
        if let Some(filter) = &section.filter {
            config = config.with_env_filter(filter.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = MacroflowConfig::from_json("{}").unwrap();
        assert_eq!(config, MacroflowConfig::default());
        assert_eq!(config.engine_config().unwrap(), EngineConfig::default());
        assert_eq!(config.logging_config().unwrap(), LoggingConfig::default());
    }

    #[test]
    fn partial_sections_are_filled_in() {
        let config = MacroflowConfig::from_json(
            r#"{"engine": {"scale_factor": 2.0}, "logging": {"format": "json", "filter": "macroflow_graph=trace"}}"#,
        )
        .unwrap();
        assert_eq!(config.engine.poll_interval_ms, 50);
        assert_eq!(config.engine.sleep_slice_ms, 100);

        let engine = config.engine_config().unwrap();
        assert!((engine.scale_factor - 2.0).abs() < f64::EPSILON);

        let logging = config.logging_config().unwrap();
        assert_eq!(logging.level(), Level::INFO);
        assert_eq!(logging.format(), TracingFormat::Json);
        assert_eq!(logging.env_filter(), Some("macroflow_graph=trace"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = MacroflowConfig::from_json(r#"{"logging": {"level": "loud"}}"#).unwrap();
        assert!(matches!(config.logging_config(), Err(ConfigError::InvalidLevel(level)) if level == "loud"));

        let config = MacroflowConfig::from_json(r#"{"engine": {"scale_factor": 0}}"#).unwrap();
        assert!(matches!(config.engine_config(), Err(ConfigError::InvalidScale(_))));

        assert!(matches!(
            MacroflowConfig::from_json(r#"{"engine": "fast"}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MacroflowConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn file_round_trip() {
        let mut config = MacroflowConfig::default();
        config.engine.scale_factor = 1.5;
        config.logging.level = "debug".into();

        let path = std::env::temp_dir().join(format!("macroflow-config-{}.json", std::process::id()));
        std::fs::write(&path, config.to_json().unwrap()).unwrap();
        let loaded = MacroflowConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}

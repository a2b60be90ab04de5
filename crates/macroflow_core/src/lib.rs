//! Logging and configuration for Macroflow (Layer 3).
//!
//! - [`logging`] - installs the `tracing` subscriber
//! - [`config`] - the JSON configuration file feeding the engine and logging
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use macroflow_adapters::TracingActuator;
//! use macroflow_core::MacroflowConfig;
//! use macroflow_graph::Engine;
//!
//! let config = MacroflowConfig::from_json(r#"{"engine": {"scale_factor": 1.25}}"#).unwrap();
//! config.logging_config().unwrap().init();
//!
//! let engine = Engine::new(Arc::new(TracingActuator)).with_config(config.engine_config().unwrap());
//! assert_eq!(engine.config().scale_factor, 1.25);
//! ```

/// Runtime configuration file.
pub mod config;

/// Tracing subscriber setup.
pub mod logging;

pub use config::{ConfigError, EngineSection, LoggingSection, MacroflowConfig};
pub use logging::{LoggingConfig, TracingFormat};

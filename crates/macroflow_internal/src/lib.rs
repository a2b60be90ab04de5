//! # Macroflow Internal Library
//!
//! Re-exports the core Macroflow crates for convenience.

/// Layer 1: perception and actuation contracts.
pub use macroflow_adapters;

/// Layer 2: automation graphs and the execution engine.
pub use macroflow_graph;

/// Layer 3: logging and configuration.
pub use macroflow_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use macroflow_adapters::prelude::*;
    pub use macroflow_core::{LoggingConfig, MacroflowConfig, TracingFormat};
    pub use macroflow_graph::prelude::*;
}

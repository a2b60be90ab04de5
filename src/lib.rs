//! A graph execution engine for unattended, perception-driven input automation.
//!
//! Scripts are directed graphs of typed nodes (clicks, key presses, sleeps,
//! color and image checks, conditions, loops). The engine walks a graph one
//! node at a time, consulting a fresh detection snapshot before each node
//! and driving the input device through an [`Actuator`](prelude::Actuator).

pub use macroflow_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use macroflow_internal::prelude::*;
}

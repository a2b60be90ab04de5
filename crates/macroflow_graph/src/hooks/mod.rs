//! Run observation.
//!
//! The engine reports progress through an [`EventSink`] passed into each
//! run. Sinks are invoked synchronously on the run's own task, so they must
//! return quickly; a UI that needs to do real work should use a
//! [`ChannelSink`] and drain the receiver elsewhere.
//!
//! # Event order
//!
//! For every executed node the sink sees `AboutToExecute` then `Executed`,
//! and the pairs of two nodes never interleave. `Paused` and `AwaitingStep`
//! precede the pair of the node they hold back. Every run ends with exactly
//! one `Finished`.
//!
//! # Example
//!
//! ```
//! use macroflow_graph::hooks::{Observers, RunEvent};
//!
//! let observers = Observers::new();
//! observers
//!     .on_executed("status", |node_id, ok| {
//!         tracing::info!(%node_id, ok, "node finished");
//!     })
//!     .unwrap();
//! observers
//!     .register("finish", |event: &RunEvent| {
//!         if let RunEvent::Finished { termination, .. } = event {
//!             tracing::info!(%termination, "run finished");
//!         }
//!     })
//!     .unwrap();
//! ```

pub mod api;
pub mod events;

pub use api::{ChannelSink, EventSink, HookRegistrationError, NoopSink, Observers};
pub use events::{PauseReason, RunEvent, Termination};

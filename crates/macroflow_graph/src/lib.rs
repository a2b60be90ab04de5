//! Automation graphs and their execution engine for Macroflow (Layer 2).
//!
//! `macroflow_graph` defines what a script is and how it runs:
//!
//! - [`Graph`] - nodes plus default `connections`, with the persisted JSON format
//! - [`Node`] / [`NodeKind`] / [`Params`] - typed, parameterized steps
//! - [`Engine`] - the traversal engine: cycle guard, step cap, debug gates
//! - [`DebugHandle`] / [`Breakpoints`] / [`Cancellation`] - steering a run from outside
//! - [`hooks`] - observing a run through an [`EventSink`]
//! - [`ScriptLibrary`] / [`ActionSequence`] - multi-script files and legacy linear scripts
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use macroflow_adapters::{BBox, Detection, DetectionSnapshot, TracingActuator};
//! use macroflow_graph::{Engine, Graph, Node, NodeKind, RunOptions};
//!
//! let mut graph = Graph::new("s1", "accept match");
//! graph
//!     .add_node(
//!         Node::new("seen", NodeKind::Condition)
//!             .with_param("label", "MATCH_BUTTON")
//!             .with_param("next_true", "press")
//!             .with_param("next_false", "wait"),
//!     )
//!     .add_node(Node::new("press", NodeKind::Click).with_param("label", "MATCH_BUTTON"))
//!     .add_node(Node::new("wait", NodeKind::Sleep).with_param("seconds", 0.0));
//!
//! let snapshot = DetectionSnapshot::new(vec![Detection::new(
//!     "MATCH_BUTTON",
//!     BBox::new(100, 200, 140, 220),
//!     0.95,
//! )]);
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()
//!     .unwrap();
//! let mut engine = Engine::new(Arc::new(TracingActuator));
//! let report = runtime
//!     .block_on(engine.execute(&graph, snapshot, RunOptions::new()))
//!     .unwrap();
//! assert_eq!(report.visited, ["seen", "press"]);
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`macroflow_adapters`): perception and actuation contracts
//! - **Layer 2** (`macroflow_graph`): graph model and engine (this crate)
//! - **Layer 3** (`macroflow_core`): logging and configuration

/// Run-scoped execution state.
pub mod context;

/// Debug control surface and cancellation.
pub mod control;

/// Graph execution engine.
pub mod executor;

/// Graph structure, builder API and persisted format.
pub mod graph;

/// Run observation.
pub mod hooks;

/// Multi-script library documents.
pub mod library;

/// Node types for graph vertices.
pub mod node;

/// Schema-free node parameters.
pub mod params;

/// Legacy linear action sequences.
pub mod sequence;

mod handlers;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::context::ExecutionContext;
    pub use crate::control::{Breakpoints, Cancellation, DebugHandle, DebugState, RunMode};
    pub use crate::executor::{
        Engine, EngineConfig, MAX_STEPS, RunError, RunOptions, RunReport, RunStatus,
    };
    pub use crate::graph::{Graph, GraphIssue};
    pub use crate::hooks::{
        ChannelSink, EventSink, HookRegistrationError, NoopSink, Observers, PauseReason,
        RunEvent, Termination,
    };
    pub use crate::library::{DocumentError, ScriptLibrary};
    pub use crate::node::{Node, NodeId, NodeKind, Position};
    pub use crate::params::{ParamError, Params};
    pub use crate::sequence::{Action, ActionSequence};
}

// Re-export key types at crate root for convenience
pub use control::{Breakpoints, Cancellation, DebugHandle, DebugState, RunMode};
pub use executor::{Engine, EngineConfig, MAX_STEPS, RunError, RunOptions, RunReport, RunStatus};
pub use graph::{Graph, GraphIssue};
pub use hooks::{EventSink, RunEvent, Termination};
pub use library::{DocumentError, ScriptLibrary};
pub use node::{Node, NodeId, NodeKind, Position};
pub use params::{ParamError, Params};
pub use sequence::{Action, ActionSequence};

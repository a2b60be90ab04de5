//! Graph execution engine.
//!
//! The [`Engine`] walks a [`Graph`] one node at a time. At every visit it
//! applies the safety checks (step cap, cancellation, dangling references,
//! cycle guard), honours the debug gates (pause, breakpoint, step mode),
//! pulls a fresh detection snapshot and runs the node. The next node is the
//! node's explicit override if it produced one, else its default connection.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use macroflow_adapters::{DetectionSnapshot, TracingActuator};
//! use macroflow_graph::{Engine, Graph, Node, NodeKind, RunOptions, RunStatus};
//!
//! # tokio_test_block_on(async {
//! let mut graph = Graph::new("s1", "demo");
//! graph
//!     .add_node(Node::new("a", NodeKind::Key).with_param("key", "space"))
//!     .add_node(Node::new("b", NodeKind::Sleep).with_param("seconds", 0.0))
//!     .connect("a", "b");
//!
//! let mut engine = Engine::new(Arc::new(TracingActuator));
//! let report = engine
//!     .execute(&graph, DetectionSnapshot::empty(), RunOptions::new())
//!     .await
//!     .unwrap();
//! assert_eq!(report.status, RunStatus::Completed);
//! assert_eq!(report.visited, ["a", "b"]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
//! # }
//! ```

use core::fmt;
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use macroflow_adapters::{
    Actuator, BBox, ColorSearch, DetectionSnapshot, Perception, ThresholdColorSearch,
};
use tracing::Instrument;

use crate::context::ExecutionContext;
use crate::control::{Breakpoints, Cancellation, DebugHandle, RunMode};
use crate::graph::Graph;
use crate::handlers::{NodeFailure, NodeRunner, color_range};
use crate::hooks::{EventSink, NoopSink, PauseReason, RunEvent, Termination};
use crate::node::{NodeId, NodeKind};
use crate::params::Params;
use crate::sequence::{Action, ActionSequence};

/// Hard cap on nodes entered per run.
pub const MAX_STEPS: usize = 1000;

/// Default interval at which suspended runs re-check cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default (and maximum) length of one sleep slice.
pub const DEFAULT_SLEEP_SLICE: Duration = Duration::from_millis(100);

const MIN_SLICE: Duration = Duration::from_millis(1);

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    /// The walk reached a node with no successor.
    Completed,
    /// The cancellation predicate fired.
    Cancelled,
}

impl RunStatus {
    /// The matching termination reason.
    #[must_use]
    pub fn termination(&self) -> Termination {
        match self {
            RunStatus::Completed => Termination::Completed,
            RunStatus::Cancelled => Termination::Cancelled,
        }
    }
}

/// Result of a run that was not stopped by a fatal condition.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Completed or cancelled.
    pub status: RunStatus,
    /// Nodes entered.
    pub steps: usize,
    /// Nodes entered, in order.
    ///
    /// A node is entered once it passes the cycle guard, before any
    /// breakpoint or step gate. A run cancelled at such a gate lists that
    /// node last even though it never executed.
    pub visited: Vec<NodeId>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Conditions that end a run early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// The graph has no nodes.
    #[error("graph has no nodes")]
    EmptyGraph,
    /// The requested start node is not in the graph.
    #[error("start node not found: {0}")]
    StartNotFound(NodeId),
    /// A connection or branch named a node that does not exist.
    #[error("node not found: {0}")]
    DanglingNode(NodeId),
    /// A non-loop node was reached a second time.
    #[error("cycle detected at node: {0}")]
    CycleDetected(NodeId),
    /// The run entered [`MAX_STEPS`] nodes without finishing.
    #[error("step limit ({max}) exceeded before node: {node}")]
    StepLimitExceeded {
        /// The node that would have been entered next.
        node: NodeId,
        /// The cap.
        max: usize,
    },
}

impl RunError {
    /// The matching termination reason.
    #[must_use]
    pub fn termination(&self) -> Termination {
        match self {
            RunError::EmptyGraph | RunError::StartNotFound(_) => Termination::FailedStart,
            RunError::DanglingNode(_) => Termination::DanglingNode,
            RunError::CycleDetected(_) => Termination::CycleDetected,
            RunError::StepLimitExceeded { .. } => Termination::StepLimit,
        }
    }

    /// The node involved, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            RunError::EmptyGraph => None,
            RunError::StartNotFound(id)
            | RunError::DanglingNode(id)
            | RunError::CycleDetected(id)
            | RunError::StepLimitExceeded { node: id, .. } => Some(id),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Multiplier from detection (logical) to screen (physical) coordinates.
    pub scale_factor: f64,
    /// How often suspended runs re-check cancellation.
    pub poll_interval: Duration,
    /// Length of one sleep slice; cancellation is checked between slices.
    pub sleep_slice: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            sleep_slice: DEFAULT_SLEEP_SLICE,
        }
    }
}

/// Per-run options.
#[derive(Default)]
pub struct RunOptions<'a> {
    start: Option<NodeId>,
    cancel: Cancellation,
    sink: Option<&'a dyn EventSink>,
}

impl<'a> RunOptions<'a> {
    /// Starts at the first node, never cancels, reports nowhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts at `id` instead of the first node. An empty ID means "first node".
    #[must_use]
    pub fn start_at(mut self, id: impl Into<NodeId>) -> Self {
        let id = id.into();
        self.start = (!id.is_empty()).then_some(id);
        self
    }

    /// Stops the run once `cancel` fires.
    #[must_use]
    pub fn cancel_when(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reports progress to `sink`.
    #[must_use]
    pub fn observe(mut self, sink: &'a dyn EventSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl fmt::Debug for RunOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("start", &self.start)
            .field("cancel", &self.cancel)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Interpreter for automation graphs.
///
/// Runs take `&mut self`, so one engine executes at most one graph at a
/// time. Steer a run in progress through the handles returned by
/// [`debug_handle`](Self::debug_handle) and [`breakpoints`](Self::breakpoints),
/// obtained before the run starts.
pub struct Engine {
    config: EngineConfig,
    actuator: Arc<dyn Actuator>,
    colors: Arc<dyn ColorSearch>,
    debug: DebugHandle,
    breakpoints: Breakpoints,
}

impl Engine {
    /// Creates an engine with the default configuration and color search.
    #[must_use]
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self {
            config: EngineConfig::default(),
            actuator,
            colors: Arc::new(ThresholdColorSearch::new()),
            debug: DebugHandle::new(),
            breakpoints: Breakpoints::new(),
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self.with_poll_interval(config.poll_interval)
            .with_sleep_slice(config.sleep_slice)
    }

    /// Uses a different color search backend.
    #[must_use]
    pub fn with_color_search(mut self, colors: Arc<dyn ColorSearch>) -> Self {
        self.colors = colors;
        self
    }

    /// Sets the logical to physical coordinate multiplier.
    #[must_use]
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.config.scale_factor = scale_factor;
        self
    }

    /// Sets how often suspended runs re-check cancellation.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval.max(MIN_SLICE);
        self
    }

    /// Sets the sleep slice, clamped to `1ms..=100ms`.
    #[must_use]
    pub fn with_sleep_slice(mut self, slice: Duration) -> Self {
        self.config.sleep_slice = slice.clamp(MIN_SLICE, DEFAULT_SLEEP_SLICE);
        self
    }

    /// Shares an existing breakpoint set, e.g. one kept by an editor.
    #[must_use]
    pub fn with_breakpoints(mut self, breakpoints: Breakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns a handle controlling pause, resume and step mode.
    #[must_use]
    pub fn debug_handle(&self) -> DebugHandle {
        self.debug.clone()
    }

    /// Returns the shared breakpoint set.
    #[must_use]
    pub fn breakpoints(&self) -> Breakpoints {
        self.breakpoints.clone()
    }

    fn runner<'a>(&'a self, cancel: &'a Cancellation) -> NodeRunner<'a> {
        NodeRunner {
            actuator: self.actuator.as_ref(),
            colors: self.colors.as_ref(),
            scale_factor: self.config.scale_factor,
            sleep_slice: self.config.sleep_slice,
            cancel,
        }
    }

    /// Executes `graph` until it completes, is cancelled or hits a fatal condition.
    ///
    /// `perception` is either a fixed [`DetectionSnapshot`] or a
    /// [`Perception`] source; it is asked for a new snapshot before every node.
    ///
    /// The debug mode and pause flag are reset to continuous and unpaused
    /// when the run ends, however it ends.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] for an empty graph, a missing start node, a
    /// dangling node reference, a cycle or the step cap. The sink has already
    /// seen the matching `Finished` event.
    pub async fn execute(
        &mut self,
        graph: &Graph,
        perception: impl Into<Perception>,
        options: RunOptions<'_>,
    ) -> Result<RunReport, RunError> {
        let perception = perception.into();
        let span = tracing::info_span!(
            "run",
            graph = graph.display_name(),
            nodes = graph.node_count()
        );
        self.walk(graph, &perception, options).instrument(span).await
    }

    async fn walk(
        &self,
        graph: &Graph,
        perception: &Perception,
        options: RunOptions<'_>,
    ) -> Result<RunReport, RunError> {
        let started = Instant::now();
        let sink: &dyn EventSink = options.sink.unwrap_or(&NoopSink);
        let cancel = &options.cancel;
        let _reset = self.debug.reset_on_drop();
        self.debug.force_continuous();

        let start = match (options.start, graph.first_node()) {
            (_, None) => {
                sink.on_event(&RunEvent::Executed {
                    node_id: NodeId::default(),
                    success: false,
                });
                return Err(fail(sink, RunError::EmptyGraph, 0));
            }
            (Some(id), Some(_)) if graph.node(id.as_str()).is_none() => {
                sink.on_event(&RunEvent::Executed {
                    node_id: id.clone(),
                    success: false,
                });
                return Err(fail(sink, RunError::StartNotFound(id), 0));
            }
            (Some(id), Some(_)) => id,
            (None, Some(first)) => first.id.clone(),
        };

        tracing::info!(start = %start, "run started");
        let runner = self.runner(cancel);
        let mut ctx = ExecutionContext::new();
        let mut current = Some(start);
        let mut last: Option<NodeId> = None;

        let status = loop {
            let Some(id) = current.take() else {
                break RunStatus::Completed;
            };

            if ctx.step_count() >= MAX_STEPS {
                sink.on_event(&RunEvent::Executed {
                    node_id: id.clone(),
                    success: false,
                });
                let err = RunError::StepLimitExceeded {
                    node: id,
                    max: MAX_STEPS,
                };
                return Err(fail(sink, err, ctx.step_count()));
            }

            if cancel.is_cancelled() {
                break RunStatus::Cancelled;
            }

            if self.debug.is_paused() {
                sink.on_event(&RunEvent::Paused {
                    node_id: id.clone(),
                    reason: PauseReason::Requested,
                });
                if self.suspend(cancel).await {
                    break RunStatus::Cancelled;
                }
            }

            let Some(node) = graph.node(id.as_str()) else {
                sink.on_event(&RunEvent::Executed {
                    node_id: id.clone(),
                    success: false,
                });
                return Err(fail(sink, RunError::DanglingNode(id), ctx.step_count()));
            };

            let exempt = node.kind == NodeKind::Loop || ctx.loop_sanctioned();
            if !exempt && ctx.has_visited(&id) {
                sink.on_event(&RunEvent::Executed {
                    node_id: id.clone(),
                    success: false,
                });
                return Err(fail(sink, RunError::CycleDetected(id), ctx.step_count()));
            }
            ctx.record_visit(&id);

            if self.breakpoints.contains(id.as_str()) {
                self.debug.pause();
                sink.on_event(&RunEvent::Paused {
                    node_id: id.clone(),
                    reason: PauseReason::Breakpoint,
                });
                if self.suspend(cancel).await {
                    break RunStatus::Cancelled;
                }
            }

            if self.debug.mode() == RunMode::Step {
                self.debug.begin_step_wait();
                sink.on_event(&RunEvent::AwaitingStep {
                    node_id: id.clone(),
                });
                let cancelled = self.suspend(cancel).await;
                self.debug.end_step_wait();
                if cancelled {
                    break RunStatus::Cancelled;
                }
            }

            sink.on_event(&RunEvent::AboutToExecute {
                node_id: id.clone(),
            });
            let snapshot = perception.snapshot();
            let outcome = runner.run(node, &snapshot, &mut ctx).await;
            tracing::debug!(node = %id, kind = %node.kind, ok = outcome.ok, next = ?outcome.next, "node executed");
            sink.on_event(&RunEvent::Executed {
                node_id: id.clone(),
                success: outcome.ok,
            });

            // Only a loop routing to its own body may re-enter visited nodes.
            let sanctioned = node.kind == NodeKind::Loop
                && outcome.next.is_some()
                && outcome.next == node.params.node_ref("next_body");
            ctx.set_loop_sanctioned(sanctioned);

            current = outcome.next.or_else(|| graph.successor(&id).cloned());
            last = Some(id);
        };

        let steps = ctx.step_count();
        let termination = status.termination();
        tracing::info!(%termination, steps, "run finished");
        sink.on_event(&RunEvent::Finished {
            termination,
            node_id: last,
            steps,
        });
        Ok(RunReport {
            status,
            steps,
            visited: ctx.into_order(),
            duration: started.elapsed(),
        })
    }

    /// Waits out a pause. Returns `true` if the run was cancelled meanwhile.
    async fn suspend(&self, cancel: &Cancellation) -> bool {
        tracing::debug!("run suspended");
        let cancelled = self
            .debug
            .wait_while_paused(cancel, self.config.poll_interval)
            .await;
        tracing::debug!(cancelled, "run resumed");
        cancelled
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Legacy sequences
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs a legacy action sequence top to bottom against one snapshot.
    ///
    /// Actions never stop the sequence: failures are logged and the next
    /// action runs. Returns whether each action succeeded.
    ///
    /// Supported actions: `sleep`, `key` (down then up), `click` (`bbox` or
    /// `label` mode, `bbox` by default), `find_color` (clicks the first
    /// region unless `click` is false) and `verify_image_color`.
    pub async fn run_sequence(
        &mut self,
        sequence: &ActionSequence,
        snapshot: &DetectionSnapshot,
    ) -> Vec<bool> {
        let cancel = Cancellation::never();
        let runner = self.runner(&cancel);
        let span = tracing::info_span!("sequence", name = %sequence.name);

        async {
            let mut results = Vec::with_capacity(sequence.actions.len());
            for (index, action) in sequence.actions.iter().enumerate() {
                let result = run_action(&runner, action, snapshot).await;
                if let Err(err) = &result {
                    tracing::debug!(index, kind = %action.kind, error = %err, "action skipped");
                }
                results.push(result.unwrap_or(false));
            }
            results
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("debug", &self.debug)
            .field("breakpoints", &self.breakpoints)
            .finish_non_exhaustive()
    }
}

/// Reports a fatal termination and returns the error.
fn fail(sink: &dyn EventSink, err: RunError, steps: usize) -> RunError {
    let termination = err.termination();
    tracing::warn!(%termination, error = %err, steps, "run aborted");
    sink.on_event(&RunEvent::Finished {
        termination,
        node_id: err.node_id().cloned(),
        steps,
    });
    err
}

async fn run_action(
    runner: &NodeRunner<'_>,
    action: &Action,
    snapshot: &DetectionSnapshot,
) -> Result<bool, NodeFailure> {
    let params = &action.params;
    match action.kind {
        NodeKind::Sleep => {
            runner.sleep_for(params.f64_or("seconds", 0.0)?).await?;
            Ok(true)
        }
        NodeKind::Key => {
            let key = params.string_or("key", "space")?;
            runner.actuator.key_down(&key)?;
            runner.actuator.key_up(&key)?;
            Ok(true)
        }
        NodeKind::Click => legacy_click(runner, params, snapshot),
        NodeKind::FindColor => {
            let frame = snapshot.frame.as_ref().ok_or(NodeFailure::NoFrame)?;
            let range = color_range(params)?;
            let regions = runner.colors.find_color(frame, &range)?;
            let Some(first) = regions.first() else {
                return Ok(false);
            };
            if params.bool_or("click", true)? {
                runner.click_bbox(*first, params)?;
            }
            Ok(true)
        }
        NodeKind::VerifyImageColor => Ok(runner.verify_image_color(params, snapshot)?.ok),
        NodeKind::FindImage | NodeKind::Condition | NodeKind::Loop => {
            Err(NodeFailure::Unsupported {
                param: "type",
                value: action.kind.to_string(),
            })
        }
    }
}

fn legacy_click(
    runner: &NodeRunner<'_>,
    params: &Params,
    snapshot: &DetectionSnapshot,
) -> Result<bool, NodeFailure> {
    let mode = params.string_or("mode", "bbox")?;
    let bbox = match mode.as_str() {
        "bbox" => BBox::from(params.bbox_or("bbox", [0; 4])?),
        "label" => {
            let label = params.string_or("label", "")?;
            match snapshot.find_label(&label) {
                Some(detection) => detection.bbox,
                None => return Ok(false),
            }
        }
        _ => {
            return Err(NodeFailure::Unsupported {
                param: "mode",
                value: mode,
            });
        }
    };
    runner.click_bbox(bbox, params)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_errors_map_to_terminations() {
        assert_eq!(RunError::EmptyGraph.termination(), Termination::FailedStart);
        assert_eq!(
            RunError::StartNotFound("x".into()).termination(),
            Termination::FailedStart
        );
        assert_eq!(
            RunError::DanglingNode("z".into()).termination(),
            Termination::DanglingNode
        );
        assert_eq!(
            RunError::CycleDetected("a".into()).termination(),
            Termination::CycleDetected
        );
        let limit = RunError::StepLimitExceeded {
            node: "a".into(),
            max: MAX_STEPS,
        };
        assert_eq!(limit.termination(), Termination::StepLimit);
        assert_eq!(limit.node_id(), Some(&NodeId::new("a")));
        assert!(RunError::EmptyGraph.node_id().is_none());
    }

    #[test]
    fn empty_start_means_first_node() {
        let options = RunOptions::new().start_at("");
        assert!(options.start.is_none());
        let options = RunOptions::new().start_at("b");
        assert_eq!(options.start, Some(NodeId::new("b")));
    }

    #[test]
    fn builder_clamps_timings() {
        let engine = Engine::new(Arc::new(macroflow_adapters::TracingActuator))
            .with_sleep_slice(Duration::from_secs(5))
            .with_poll_interval(Duration::ZERO)
            .with_scale_factor(1.5);
        assert_eq!(engine.config().sleep_slice, DEFAULT_SLEEP_SLICE);
        assert_eq!(engine.config().poll_interval, MIN_SLICE);
        assert!((engine.config().scale_factor - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn with_config_applies_clamps() {
        let engine = Engine::new(Arc::new(macroflow_adapters::TracingActuator)).with_config(
            EngineConfig {
                scale_factor: 2.0,
                poll_interval: Duration::from_millis(20),
                sleep_slice: Duration::ZERO,
            },
        );
        assert_eq!(engine.config().sleep_slice, MIN_SLICE);
        assert_eq!(engine.config().poll_interval, Duration::from_millis(20));
        assert!((engine.config().scale_factor - 2.0).abs() < f64::EPSILON);
    }
}

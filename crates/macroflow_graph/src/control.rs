//! Debug control surface and cancellation.
//!
//! A run is steered from outside through three caller-owned handles:
//!
//! - [`DebugHandle`]: pause, resume, single-step and run mode. Cloned into
//!   the UI task; the engine observes it between nodes.
//! - [`Breakpoints`]: node IDs that force a pause before they execute.
//!   Survives across runs and is never reset by the engine.
//! - [`Cancellation`]: a predicate polled at every suspension point.
//!
//! Waiting is an async suspension on a [`Notify`] raced against a short
//! poll timer, so a resume wakes the run at once while a cancellation
//! predicate (which cannot signal) is still seen within one poll interval.

use core::fmt;
use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashSet;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::node::NodeId;

// ─────────────────────────────────────────────────────────────────────────────
// Run mode
// ─────────────────────────────────────────────────────────────────────────────

/// How the engine advances between nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Run nodes back to back.
    #[default]
    Continuous,
    /// Pause before every node until [`DebugHandle::step`] is called.
    Step,
}

impl RunMode {
    /// Returns the mode name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Continuous => "continuous",
            RunMode::Step => "step",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the debug state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugState {
    /// Current run mode.
    pub mode: RunMode,
    /// Whether the run is (or will be, at the next gate) suspended.
    pub paused: bool,
    /// Whether the run is suspended waiting for a step signal.
    pub awaiting_step: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// DebugHandle
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct DebugShared {
    state: Mutex<DebugState>,
    notify: Notify,
}

/// Shared pause/step/mode state of an engine.
///
/// Cheap to clone; every clone controls the same engine. All methods may be
/// called from any thread while a run is in progress.
#[derive(Clone, Default)]
pub struct DebugHandle(Arc<DebugShared>);

impl DebugHandle {
    /// Creates a handle in continuous, unpaused state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a pause. The run suspends at its next gate.
    pub fn pause(&self) {
        self.0.state.lock().paused = true;
    }

    /// Releases a pause, breakpoint or step wait.
    pub fn resume(&self) {
        self.0.state.lock().paused = false;
        self.0.notify.notify_waiters();
    }

    /// Executes the next node in step mode. Same as [`resume`](Self::resume).
    pub fn step(&self) {
        self.resume();
    }

    /// Switches the run mode. Takes effect before the next node.
    pub fn set_mode(&self, mode: RunMode) {
        self.0.state.lock().mode = mode;
    }

    /// Returns the current run mode.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.0.state.lock().mode
    }

    /// Returns `true` while a pause is requested or in effect.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.0.state.lock().paused
    }

    /// Returns a copy of the whole state.
    #[must_use]
    pub fn state(&self) -> DebugState {
        *self.0.state.lock()
    }

    pub(crate) fn force_continuous(&self) {
        self.0.state.lock().mode = RunMode::Continuous;
    }

    pub(crate) fn begin_step_wait(&self) {
        let mut state = self.0.state.lock();
        state.paused = true;
        state.awaiting_step = true;
    }

    pub(crate) fn end_step_wait(&self) {
        self.0.state.lock().awaiting_step = false;
    }

    /// Restores the defaults: continuous, unpaused, not awaiting a step.
    pub(crate) fn reset(&self) {
        *self.0.state.lock() = DebugState::default();
        self.0.notify.notify_waiters();
    }

    /// Suspends while paused. Returns `true` if cancellation was observed.
    pub(crate) async fn wait_while_paused(&self, cancel: &Cancellation, poll: Duration) -> bool {
        loop {
            // Register interest before checking the flag so a resume between
            // the check and the await is not lost.
            let mut notified = core::pin::pin!(self.0.notify.notified());
            notified.as_mut().enable();

            if cancel.is_cancelled() {
                return true;
            }
            if !self.is_paused() {
                return false;
            }

            tokio::select! {
                () = &mut notified => {}
                () = tokio::time::sleep(poll) => {}
            }
        }
    }

    /// Returns a guard that calls [`reset`](Self::reset) when dropped.
    pub(crate) fn reset_on_drop(&self) -> ResetOnDrop {
        ResetOnDrop(self.clone())
    }
}

impl fmt::Debug for DebugHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DebugHandle").field(&self.state()).finish()
    }
}

/// Resets the debug state however the run ends, including when the run
/// future is dropped mid-await.
pub(crate) struct ResetOnDrop(DebugHandle);

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        self.0.reset();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Breakpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Shared set of breakpoint node IDs.
#[derive(Clone, Default)]
pub struct Breakpoints(Arc<RwLock<HashSet<NodeId>>>);

impl Breakpoints {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the breakpoint if absent, removes it if present.
    /// Returns `true` if the node now has a breakpoint.
    pub fn toggle(&self, id: impl Into<NodeId>) -> bool {
        let id = id.into();
        let mut set = self.0.write();
        if set.remove(&id) {
            false
        } else {
            set.insert(id);
            true
        }
    }

    /// Sets a breakpoint. Returns `false` if it was already set.
    pub fn insert(&self, id: impl Into<NodeId>) -> bool {
        self.0.write().insert(id.into())
    }

    /// Clears a breakpoint. Returns `false` if it was not set.
    pub fn remove(&self, id: &str) -> bool {
        self.0.write().remove(id)
    }

    /// Returns `true` if `id` has a breakpoint.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.read().contains(id)
    }

    /// Clears every breakpoint.
    pub fn clear(&self) {
        self.0.write().clear();
    }

    /// Number of breakpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` if no breakpoint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns the breakpoint IDs, sorted.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.0.read().iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for Breakpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.snapshot()).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────────────────

type CancelFn = dyn Fn() -> bool + Send + Sync;

/// Optional cancellation predicate.
///
/// Cancellation is observed, never signalled as an error: once the
/// predicate returns `true` the run stops at its next check and reports
/// [`RunStatus::Cancelled`](crate::RunStatus::Cancelled).
#[derive(Clone, Default)]
pub struct Cancellation(Option<Arc<CancelFn>>);

impl Cancellation {
    /// A predicate that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self(None)
    }

    /// Wraps an arbitrary predicate.
    #[must_use]
    pub fn from_fn(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(f)))
    }

    /// Cancels once `flag` is set.
    #[must_use]
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self::from_fn(move || flag.load(Ordering::Acquire))
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().is_some_and(|f| f())
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Cancellation(predicate)"),
            None => f.write_str("Cancellation(never)"),
        }
    }
}

//! Run-scoped execution state.

use hashbrown::{HashMap, HashSet};

use crate::node::NodeId;

/// Mutable state of a single run.
///
/// Created fresh by the engine at the start of every run and dropped when the
/// run ends. Nothing here survives across runs; breakpoints and the debug
/// mode live in caller-owned handles instead.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// Per-loop-node iteration counters. Entries are created lazily and
    /// removed once the loop's budget is exhausted.
    loop_counters: HashMap<NodeId, i64>,
    /// Every node executed so far. Grows monotonically.
    visited: HashSet<NodeId>,
    /// Visit order, for the run report.
    order: Vec<NodeId>,
    /// Nodes entered so far.
    step_count: usize,
    /// Whether the next visit was routed by a loop node to its body.
    loop_sanctioned: bool,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes entered so far.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Returns `true` if `id` was already visited in this run.
    #[must_use]
    pub fn has_visited(&self, id: &NodeId) -> bool {
        self.visited.contains(id)
    }

    /// Records a visit and advances the step counter.
    pub fn record_visit(&mut self, id: &NodeId) {
        self.visited.insert(id.clone());
        self.order.push(id.clone());
        self.step_count += 1;
    }

    /// Visit order so far.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Consumes the context, returning the visit order.
    #[must_use]
    pub fn into_order(self) -> Vec<NodeId> {
        self.order
    }

    /// Returns the iteration counter of a loop node (zero when unset).
    #[must_use]
    pub fn loop_counter(&self, id: &NodeId) -> i64 {
        self.loop_counters.get(id).copied().unwrap_or(0)
    }

    /// Sets the iteration counter of a loop node.
    pub fn set_loop_counter(&mut self, id: &NodeId, value: i64) {
        self.loop_counters.insert(id.clone(), value);
    }

    /// Drops the counter of a finished loop so a later entry starts at zero.
    pub fn clear_loop_counter(&mut self, id: &NodeId) {
        self.loop_counters.remove(id);
    }

    /// Returns `true` if the current visit was routed by a loop to its body.
    #[must_use]
    pub fn loop_sanctioned(&self) -> bool {
        self.loop_sanctioned
    }

    /// Marks whether the next visit is loop-sanctioned.
    pub fn set_loop_sanctioned(&mut self, sanctioned: bool) {
        self.loop_sanctioned = sanctioned;
    }
}

//! Events emitted during a run.

use core::fmt;

use crate::node::NodeId;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// The walk reached a node with no successor.
    Completed,
    /// The cancellation predicate fired.
    Cancelled,
    /// The global step cap was reached.
    StepLimit,
    /// A non-loop node was about to be visited twice.
    CycleDetected,
    /// A connection or branch named a node that does not exist.
    DanglingNode,
    /// The graph was empty or the start node could not be resolved.
    FailedStart,
}

impl Termination {
    /// Returns the reason name, e.g. `"cycle-detected"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::Cancelled => "cancelled",
            Termination::StepLimit => "step-limit",
            Termination::CycleDetected => "cycle-detected",
            Termination::DanglingNode => "dangling-node",
            Termination::FailedStart => "failed-start",
        }
    }

    /// Returns `true` for the reasons that are not failures.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Termination::Completed | Termination::Cancelled)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What suspended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseReason {
    /// [`DebugHandle::pause`](crate::DebugHandle::pause) was called.
    Requested,
    /// The node has a breakpoint.
    Breakpoint,
}

/// Progress notification delivered to an [`EventSink`](super::EventSink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The run is suspended before `node_id`.
    Paused {
        /// The node the run is held at.
        node_id: NodeId,
        /// What caused the suspension.
        reason: PauseReason,
    },

    /// Step mode: the run waits for a step signal before `node_id`.
    AwaitingStep {
        /// The node that will execute next.
        node_id: NodeId,
    },

    /// `node_id` is about to execute.
    AboutToExecute {
        /// The node.
        node_id: NodeId,
    },

    /// A node finished, or a node-level failure ended the run.
    ///
    /// Run-level failures are reported here too, with `success: false` and
    /// the offending node ID (empty when the graph has no nodes).
    Executed {
        /// The node, or the empty ID.
        node_id: NodeId,
        /// Whether the node succeeded.
        success: bool,
    },

    /// The run is over.
    Finished {
        /// Why it stopped.
        termination: Termination,
        /// The node involved in the stop: the last executed node, or the
        /// offending node for run-level failures.
        node_id: Option<NodeId>,
        /// Nodes entered during the run.
        steps: usize,
    },
}

impl RunEvent {
    /// Returns the node the event refers to, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            RunEvent::Paused { node_id, .. }
            | RunEvent::AwaitingStep { node_id }
            | RunEvent::AboutToExecute { node_id }
            | RunEvent::Executed { node_id, .. } => Some(node_id),
            RunEvent::Finished { node_id, .. } => node_id.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_names() {
        assert_eq!(Termination::FailedStart.to_string(), "failed-start");
        assert_eq!(Termination::StepLimit.as_str(), "step-limit");
        assert!(Termination::Cancelled.is_success());
        assert!(!Termination::DanglingNode.is_success());
    }

    #[test]
    fn node_id_accessor() {
        let event = RunEvent::Executed {
            node_id: "a".into(),
            success: true,
        };
        assert_eq!(event.node_id(), Some(&NodeId::new("a")));
        let finished = RunEvent::Finished {
            termination: Termination::Completed,
            node_id: None,
            steps: 0,
        };
        assert!(finished.node_id().is_none());
    }
}

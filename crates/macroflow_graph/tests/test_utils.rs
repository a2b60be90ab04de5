//! Shared test utilities for macroflow_graph integration tests.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items are used in every test binary"
)]

use core::time::Duration;
use std::sync::Arc;

use macroflow_adapters::{ActuationError, Actuator, BBox, Detection, DetectionSnapshot, MouseButton};
use macroflow_graph::prelude::*;
use parking_lot::Mutex;
use tokio::sync::mpsc;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDING ACTUATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Actuator that records every call as a short string, e.g. `"click left"`.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    calls: Mutex<Vec<String>>,
}

impl RecordingActuator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn is_untouched(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

impl Actuator for RecordingActuator {
    fn move_to(&self, x: i32, y: i32, _duration: Duration) -> Result<(), ActuationError> {
        self.calls.lock().push(format!("move {x} {y}"));
        Ok(())
    }

    fn click(&self, button: MouseButton) -> Result<(), ActuationError> {
        self.calls.lock().push(format!("click {}", button.as_str()));
        Ok(())
    }

    fn key_down(&self, key: &str) -> Result<(), ActuationError> {
        self.calls.lock().push(format!("down {key}"));
        Ok(())
    }

    fn key_up(&self, key: &str) -> Result<(), ActuationError> {
        self.calls.lock().push(format!("up {key}"));
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT RECORDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    /// Node IDs of every `AboutToExecute` event, in order.
    pub fn about_to_execute(&self) -> Vec<String> {
        about_to_execute(&self.events())
    }

    pub fn finished(&self) -> Option<Termination> {
        finished(&self.events())
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &RunEvent) {
        self.events.lock().push(event.clone());
    }
}

pub fn about_to_execute(events: &[RunEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            RunEvent::AboutToExecute { node_id } => Some(node_id.to_string()),
            _ => None,
        })
        .collect()
}

pub fn finished(events: &[RunEvent]) -> Option<Termination> {
    events.iter().rev().find_map(|event| match event {
        RunEvent::Finished { termination, .. } => Some(*termination),
        _ => None,
    })
}

/// Receives events until one matches `pred`, failing after two seconds.
pub async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<RunEvent>,
    seen: &mut Vec<RunEvent>,
    pred: impl Fn(&RunEvent) -> bool,
) -> RunEvent {
    let deadline = Duration::from_secs(2);
    loop {
        let event = tokio::time::timeout(deadline, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        seen.push(event.clone());
        if pred(&event) {
            return event;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH BUILDER HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Sleep node that returns immediately.
pub fn noop(id: &str) -> Node {
    Node::new(id, NodeKind::Sleep).with_param("seconds", 0.0)
}

pub fn key(id: &str, key: &str) -> Node {
    Node::new(id, NodeKind::Key).with_param("key", key)
}

pub fn click_label(id: &str, label: &str) -> Node {
    Node::new(id, NodeKind::Click).with_param("label", label)
}

pub fn condition(id: &str, label: &str, next_true: &str, next_false: &str) -> Node {
    Node::new(id, NodeKind::Condition)
        .with_param("label", label)
        .with_param("next_true", next_true)
        .with_param("next_false", next_false)
}

pub fn repeat(id: &str, count: i64, body: &str, after: &str) -> Node {
    Node::new(id, NodeKind::Loop)
        .with_param("count", count)
        .with_param("next_body", body)
        .with_param("next_after", after)
}

/// Linear chain of no-op nodes `ids[0] -> ids[1] -> ...`.
pub fn chain(ids: &[&str]) -> Graph {
    let mut graph = Graph::new("chain", "chain");
    for id in ids {
        graph.add_node(noop(id));
    }
    for pair in ids.windows(2) {
        graph.connect(pair[0], pair[1]);
    }
    graph
}

/// `L` runs body `N` `count` times, then `M`.
pub fn loop_graph(count: i64) -> Graph {
    let mut graph = Graph::new("loop", "loop");
    graph
        .add_node(repeat("L", count, "N", "M"))
        .add_node(noop("N"))
        .add_node(noop("M"))
        .connect("N", "L");
    graph
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOTS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn snapshot_with(labels: &[&str]) -> DetectionSnapshot {
    DetectionSnapshot::new(
        labels
            .iter()
            .map(|label| Detection::new(*label, BBox::new(10, 20, 30, 40), 0.9))
            .collect(),
    )
}

pub fn engine(actuator: &Arc<RecordingActuator>) -> Engine {
    let actuator: Arc<dyn Actuator> = actuator.clone();
    Engine::new(actuator)
        .with_poll_interval(Duration::from_millis(5))
        .with_sleep_slice(Duration::from_millis(1))
}

pub fn ids(visited: &[NodeId]) -> Vec<&str> {
    visited.iter().map(NodeId::as_str).collect()
}

//! Event sinks and the observer registry.
//!
//! - [`EventSink`] is the interface the engine calls. It is implemented for
//!   any `Fn(&RunEvent)` closure.
//! - [`Observers`] is a named registry of callbacks, invoked in registration
//!   order. Names must be unique so observers can be removed again.
//! - [`ChannelSink`] forwards events over an unbounded tokio channel.

use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::events::RunEvent;
use crate::node::NodeId;

// ─────────────────────────────────────────────────────────────────────────────
// EventSink
// ─────────────────────────────────────────────────────────────────────────────

/// Receiver of run progress notifications.
///
/// Called synchronously on the engine's path; implementations must not block.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &RunEvent);
}

impl<F> EventSink for F
where
    F: Fn(&RunEvent) + Send + Sync,
{
    fn on_event(&self, event: &RunEvent) {
        self(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _event: &RunEvent) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// HookRegistrationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during observer registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRegistrationError {
    /// An observer with this name is already registered.
    #[error("observer '{0}' already registered")]
    DuplicateName(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Observers
// ─────────────────────────────────────────────────────────────────────────────

type ObserverFn = dyn Fn(&RunEvent) + Send + Sync;

struct ObserverEntry {
    name: String,
    hook: Arc<ObserverFn>,
}

/// Named registry of event callbacks.
///
/// Uses interior mutability so observers can be added or removed through a
/// shared reference, including while a run is using the registry as its sink.
#[derive(Default)]
pub struct Observers {
    entries: RwLock<Vec<ObserverEntry>>,
}

impl Observers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback that receives every event.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if `name` is taken.
    pub fn register<F>(&self, name: impl Into<String>, hook: F) -> Result<&Self, HookRegistrationError>
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.iter().any(|entry| entry.name == name) {
            return Err(HookRegistrationError::DuplicateName(name));
        }
        entries.push(ObserverEntry {
            name,
            hook: Arc::new(hook),
        });
        Ok(self)
    }

    /// Registers a callback fired before each node executes.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if `name` is taken.
    pub fn on_about_to_execute<F>(
        &self,
        name: impl Into<String>,
        hook: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        F: Fn(&NodeId) + Send + Sync + 'static,
    {
        self.register(name, move |event: &RunEvent| {
            if let RunEvent::AboutToExecute { node_id } = event {
                hook(node_id);
            }
        })
    }

    /// Registers a callback fired after each node executes, and for
    /// run-level failures.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if `name` is taken.
    pub fn on_executed<F>(&self, name: impl Into<String>, hook: F) -> Result<&Self, HookRegistrationError>
    where
        F: Fn(&NodeId, bool) + Send + Sync + 'static,
    {
        self.register(name, move |event: &RunEvent| {
            if let RunEvent::Executed { node_id, success } = event {
                hook(node_id, *success);
            }
        })
    }

    /// Removes an observer. Returns `false` if no observer had that name.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        entries.len() != before
    }

    /// Returns `true` if an observer with `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|entry| entry.name == name)
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl EventSink for Observers {
    fn on_event(&self, event: &RunEvent) {
        // Clone the hooks out so a callback may register or unregister
        // observers without deadlocking.
        let hooks: Vec<Arc<ObserverFn>> = self
            .entries
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.hook))
            .collect();
        for hook in hooks {
            hook(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_list()
            .entries(entries.iter().map(|entry| &entry.name))
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ChannelSink
// ─────────────────────────────────────────────────────────────────────────────

/// Forwards events to an unbounded channel.
///
/// Sending never blocks the run. Events sent after the receiver is dropped
/// are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that drains it.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Wraps an existing sender.
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: &RunEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::events::Termination;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executed(id: &str, success: bool) -> RunEvent {
        RunEvent::Executed {
            node_id: id.into(),
            success,
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let observers = Observers::new();
        observers.register("log", |_: &RunEvent| {}).unwrap();
        let err = observers.register("log", |_: &RunEvent| {}).unwrap_err();
        assert_eq!(err, HookRegistrationError::DuplicateName("log".into()));
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn typed_helpers_filter_events() {
        let observers = Observers::new();
        let about = Arc::new(AtomicUsize::new(0));
        let ok = Arc::new(AtomicUsize::new(0));
        {
            let about = about.clone();
            observers
                .on_about_to_execute("about", move |_| {
                    about.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        {
            let ok = ok.clone();
            observers
                .on_executed("ok", move |_, success| {
                    if success {
                        ok.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .unwrap();
        }

        observers.on_event(&RunEvent::AboutToExecute { node_id: "a".into() });
        observers.on_event(&executed("a", true));
        observers.on_event(&executed("b", false));
        observers.on_event(&RunEvent::Finished {
            termination: Termination::Completed,
            node_id: None,
            steps: 1,
        });

        assert_eq!(about.load(Ordering::SeqCst), 1);
        assert_eq!(ok.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_removes_observer() {
        let observers = Observers::new();
        observers.register("a", |_: &RunEvent| {}).unwrap();
        assert!(observers.unregister("a"));
        assert!(!observers.unregister("a"));
        assert!(observers.is_empty());
    }

    #[test]
    fn observers_run_in_registration_order() {
        let observers = Observers::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let log = log.clone();
            observers
                .register(name, move |_: &RunEvent| log.lock().push(name))
                .unwrap();
        }
        observers.on_event(&executed("a", true));
        assert_eq!(*log.lock(), ["first", "second"]);
    }

    #[tokio::test]
    async fn channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.on_event(&executed("a", true));
        assert_eq!(rx.recv().await, Some(executed("a", true)));

        drop(rx);
        sink.on_event(&executed("b", true));
    }
}

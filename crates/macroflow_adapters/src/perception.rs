//! Perception sources.
//!
//! The engine pulls a fresh [`DetectionSnapshot`] on every node visit so that
//! condition and loop nodes observe the screen as it is now, not as it was
//! when the run started.

use core::fmt;
use std::sync::Arc;

use crate::detection::DetectionSnapshot;

/// Type-erased snapshot producer.
pub type SnapshotFn = dyn Fn() -> DetectionSnapshot + Send + Sync;

/// A zero-argument source of detection snapshots.
///
/// Constant snapshots and live callbacks are handled uniformly: a constant is
/// simply a source that always returns the same snapshot.
#[derive(Clone)]
pub enum Perception {
    /// Always returns the same snapshot.
    Fixed(Arc<DetectionSnapshot>),
    /// Re-evaluated on every call.
    Live(Arc<SnapshotFn>),
}

impl Perception {
    /// Creates a source that always returns `snapshot`.
    #[must_use]
    pub fn fixed(snapshot: DetectionSnapshot) -> Self {
        Perception::Fixed(Arc::new(snapshot))
    }

    /// Creates a source backed by a callback.
    #[must_use]
    pub fn live<F>(producer: F) -> Self
    where
        F: Fn() -> DetectionSnapshot + Send + Sync + 'static,
    {
        Perception::Live(Arc::new(producer))
    }

    /// Returns the current snapshot.
    ///
    /// Live sources are invoked on every call; nothing is cached.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DetectionSnapshot> {
        match self {
            Perception::Fixed(snapshot) => Arc::clone(snapshot),
            Perception::Live(producer) => Arc::new(producer()),
        }
    }
}

impl From<DetectionSnapshot> for Perception {
    fn from(snapshot: DetectionSnapshot) -> Self {
        Perception::fixed(snapshot)
    }
}

impl fmt::Debug for Perception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Perception::Fixed(snapshot) => f.debug_tuple("Fixed").field(snapshot).finish(),
            Perception::Live(_) => f.write_str("Live(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BBox, Detection};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fixed_source_returns_same_snapshot() {
        let perception = Perception::from(DetectionSnapshot::new(vec![Detection::new(
            "A",
            BBox::new(0, 0, 1, 1),
            1.0,
        )]));
        let a = perception.snapshot();
        let b = perception.snapshot();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn live_source_is_called_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let perception = Perception::live(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            DetectionSnapshot::empty()
        });

        let _ = perception.snapshot();
        let _ = perception.snapshot();
        let _ = perception.clone().snapshot();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

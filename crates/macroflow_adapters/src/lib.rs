//! Boundary contracts between the Macroflow engine and the outside world (Layer 1).
//!
//! The engine never looks at the screen and never touches the input devices
//! itself. Everything it needs from either side is expressed here:
//!
//! - [`Perception`] - pull-based source of [`DetectionSnapshot`]s, asked once per node visit
//! - [`ColorSearch`] - color-range search over a [`Frame`] (with [`ThresholdColorSearch`] as the default)
//! - [`Actuator`] - pointer and keyboard injection used by leaf nodes
//! - [`scaling`] - logical to physical coordinate conversion
//!
//! # Example
//!
//! ```
//! use macroflow_adapters::{BBox, Detection, DetectionSnapshot, Perception};
//!
//! let snapshot = DetectionSnapshot::new(vec![Detection::new(
//!     "MATCH_BUTTON",
//!     BBox::new(10, 10, 30, 20),
//!     0.93,
//! )]);
//!
//! // A fixed snapshot is normalized into a source that always returns it.
//! let perception = Perception::from(snapshot);
//! assert!(perception.snapshot().find_label("MATCH_BUTTON").is_some());
//! ```

/// Pointer and keyboard actuation capability.
pub mod actuation;

/// Color ranges and color-region search.
pub mod color;

/// Detections and detection snapshots.
pub mod detection;

/// Error types for the adapter layer.
pub mod error;

/// Raw BGR frames.
pub mod frame;

/// Perception sources.
pub mod perception;

/// Logical to physical coordinate scaling.
pub mod scaling;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::actuation::{Actuator, MouseButton, TracingActuator};
    pub use crate::color::{ColorRange, ColorSearch, ThresholdColorSearch};
    pub use crate::detection::{BBox, Detection, DetectionSnapshot};
    pub use crate::error::{ActuationError, VisionError};
    pub use crate::frame::Frame;
    pub use crate::perception::Perception;
    pub use crate::scaling::{detect_scale_factor, logical_to_physical};
}

pub use actuation::{Actuator, MouseButton, TracingActuator};
pub use color::{ColorRange, ColorSearch, ThresholdColorSearch};
pub use detection::{BBox, Detection, DetectionSnapshot};
pub use error::{ActuationError, VisionError};
pub use frame::Frame;
pub use perception::Perception;

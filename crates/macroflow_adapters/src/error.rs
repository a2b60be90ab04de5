use thiserror::Error;

/// Errors raised by perception-side helpers (frames and color search).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VisionError {
    /// The pixel buffer does not match the declared frame dimensions.
    #[error("frame buffer holds {actual} bytes, expected {expected} for the declared size")]
    InvalidFrame {
        /// Bytes required by `width * height * 3`.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// A region of interest collapsed to zero pixels after clamping.
    #[error("region of interest is empty")]
    EmptyRegion,

    /// An external color search implementation failed.
    #[error("color search failed: {0}")]
    Search(String),
}

/// Errors raised by an [`Actuator`](crate::Actuator).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActuationError {
    /// The requested mouse button name is not recognized.
    #[error("unknown mouse button: {0}")]
    UnknownButton(String),

    /// The requested key could not be injected.
    #[error("key '{key}' rejected: {reason}")]
    Key {
        /// Key name as written in the script.
        key: String,
        /// Reason reported by the backend.
        reason: String,
    },

    /// The platform backend failed.
    #[error("actuation backend failed: {0}")]
    Backend(String),
}

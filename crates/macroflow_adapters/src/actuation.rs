//! Pointer and keyboard actuation.
//!
//! Only leaf nodes (`click`, `key`) and the legacy sequence runner actuate.
//! The engine never sees a failure mode beyond an [`ActuationError`].

use core::str::FromStr;
use core::time::Duration;

use crate::error::ActuationError;

/// Mouse button to press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    #[default]
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
}

impl MouseButton {
    /// Returns the lowercase name used in scripts.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

impl FromStr for MouseButton {
    type Err = ActuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "primary" => Ok(MouseButton::Left),
            "right" | "secondary" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            other => Err(ActuationError::UnknownButton(other.to_string())),
        }
    }
}

/// Input injection capability.
///
/// Coordinates passed to [`move_to`](Actuator::move_to) are already in the
/// physical screen space; scaling happens before the call.
pub trait Actuator: Send + Sync {
    /// Moves the pointer to `(x, y)` over `duration`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the motion.
    fn move_to(&self, x: i32, y: i32, duration: Duration) -> Result<(), ActuationError>;

    /// Clicks `button` at the current pointer position.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the click.
    fn click(&self, button: MouseButton) -> Result<(), ActuationError>;

    /// Holds `key` down.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown to the backend.
    fn key_down(&self, key: &str) -> Result<(), ActuationError>;

    /// Releases `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown to the backend.
    fn key_up(&self, key: &str) -> Result<(), ActuationError>;

    /// Presses and releases `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if either half of the key press fails.
    fn press_key(&self, key: &str) -> Result<(), ActuationError> {
        self.key_down(key)?;
        self.key_up(key)
    }
}

/// Actuator that only records what it would have done in the log.
///
/// Used for dry runs where no input must reach the desktop.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActuator;

impl Actuator for TracingActuator {
    fn move_to(&self, x: i32, y: i32, duration: Duration) -> Result<(), ActuationError> {
        tracing::info!(x, y, ?duration, "move pointer");
        Ok(())
    }

    fn click(&self, button: MouseButton) -> Result<(), ActuationError> {
        tracing::info!(button = button.as_str(), "click");
        Ok(())
    }

    fn key_down(&self, key: &str) -> Result<(), ActuationError> {
        tracing::info!(key, "key down");
        Ok(())
    }

    fn key_up(&self, key: &str) -> Result<(), ActuationError> {
        tracing::info!(key, "key up");
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<(), ActuationError> {
        tracing::info!(key, "press key");
        Ok(())
    }
}

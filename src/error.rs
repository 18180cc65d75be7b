//! Error types for the dimmed-LED controller.
//!
//! Each category of fault gets its own enum so callers can tell a bad
//! configuration apart from a flaky sensor or a failed PWM write.  Only
//! [`ConfigError`] and [`LifecycleError`] ever reach a caller; sensor and
//! hardware faults are absorbed by the control loop and surfaced as log
//! lines and [`LoopEvent`](crate::app::events::LoopEvent)s.

use thiserror::Error;

// ── Configuration errors ───────────────────────────────────

/// Rejected configuration.  Fatal to that configuration attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A required string attribute is absent or not a string.
    #[error("{field} is required and must be a string")]
    Missing { field: &'static str },
    /// An attribute has the wrong type.
    #[error("malformed attributes: {0}")]
    Malformed(String),
    /// An attribute is well-typed but out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A named dependency is not present in the dependency set.
    #[error("{kind} dependency '{name}' could not be resolved")]
    UnresolvedDependency { kind: &'static str, name: String },
}

// ── Sensor errors ──────────────────────────────────────────

/// Transient sensor fault.  The loop logs it and retries next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The driver failed to produce readings (I/O, timeout, bus error).
    #[error("sensor read failed: {0}")]
    ReadFailed(String),
    /// The readings map has no entry for the expected key.
    #[error("reading '{0}' missing from sensor output")]
    MissingReading(&'static str),
    /// The distance reading is NaN.
    #[error("distance reading is not a number")]
    NotANumber,
}

// ── Hardware errors ────────────────────────────────────────

/// Actuator fault.  Cached actuator state is never updated on these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    /// The board has no PWM-capable pin with that name.
    #[error("no PWM pin named '{0}'")]
    PinNotFound(String),
    /// The duty-cycle write did not complete.
    #[error("PWM write failed: {0}")]
    WriteFailed(String),
}

// ── Cancellation ───────────────────────────────────────────

/// Returned by every cancellation-guarded suspension once the token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled")]
pub struct Cancelled;

// ── Lifecycle errors ───────────────────────────────────────

/// Errors from the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `start()`/`test()` before any board, sensor and pin were wired in.
    #[error("controller has no board/sensor wiring")]
    NotConfigured,
    /// The OS refused to spawn the loop thread.
    #[error("failed to spawn control loop thread: {0}")]
    Spawn(String),
    /// The self-test could not drive the LED.
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    /// The self-test was interrupted by teardown.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl From<FlashError> for LifecycleError {
    fn from(e: FlashError) -> Self {
        match e {
            FlashError::Hardware(e) => Self::Hardware(e),
            FlashError::Cancelled(c) => Self::Cancelled(c),
        }
    }
}

// ── Flash sequence ─────────────────────────────────────────

/// Why a flash sequence ended early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlashError {
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

// ── Loop-internal funnel ───────────────────────────────────

/// Everything that can end one loop iteration early.
#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum Fault {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl From<FlashError> for Fault {
    fn from(e: FlashError) -> Self {
        match e {
            FlashError::Hardware(e) => Self::Hardware(e),
            FlashError::Cancelled(c) => Self::Cancelled(c),
        }
    }
}

/// Crate-wide `Result` alias for configuration paths.
pub type Result<T> = core::result::Result<T, ConfigError>;

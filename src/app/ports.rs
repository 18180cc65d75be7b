//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller / ControlLoop (domain)
//! ```
//!
//! Driven adapters (board, sensor, event sinks) implement these traits.
//! The controller consumes them via generics, so the domain core never
//! touches hardware directly.
//!
//! Sensor reads and actuator writes are `async`: the loop races every one
//! of them against its cancellation token, so an adapter that awaits I/O
//! can be abandoned mid-flight by `stop()`.  Adapters must not block the
//! calling thread inside `poll`.

#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use crate::error::{HardwareError, SensorError};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A PWM output.
pub trait PwmActuator {
    /// Apply `duty_cycle` (0.0–1.0) at `frequency_hz`.
    async fn set_pwm(&self, duty_cycle: f64, frequency_hz: u32) -> Result<(), HardwareError>;
}

/// A board that hands out PWM pins by name.
///
/// Shared between the command context and the loop thread, hence
/// `Send + Sync`.  Each call returns an independent pin handle.
pub trait Board: Send + Sync + 'static {
    type Pin: PwmActuator;

    /// Resolve a PWM pin by its board-specific name.
    async fn pwm_pin(&self, name: &str) -> Result<Self::Pin, HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Named readings as produced by a generic sensor.
pub type Readings = HashMap<String, f64>;

/// Key under which distance sensors report meters.
pub const DISTANCE_KEY: &str = "distance";

/// A sensor whose readings include a distance in meters.
pub trait DistanceSensor: Send + Sync + 'static {
    /// Take one set of readings.
    async fn readings(&self) -> Result<Readings, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The loop and controller emit structured
/// [`LoopEvent`](super::events::LoopEvent)s through this port.  Adapters
/// decide where they go (log, metrics, a test recorder).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::LoopEvent);
}

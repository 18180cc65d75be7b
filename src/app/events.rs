//! Outbound loop events.
//!
//! The control loop and lifecycle controller emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::error::{HardwareError, SensorError};

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// A loop run began (actuator state reset).
    Started,

    /// The LED pin was resolved on the board.
    PinAcquired { pin: String },

    /// A fading duty cycle was written to the LED.
    DutyApplied { distance: f64, duty: f64 },

    /// Distance fell below the alarm threshold; blinking begins.
    AlarmEntered { distance: f64, threshold: f64 },

    /// Distance is back at or above the threshold.
    AlarmCleared { distance: f64 },

    /// A sensor read failed; the iteration was skipped.
    SensorFault(SensorError),

    /// An actuator write or pin lookup failed.
    HardwareFault(HardwareError),

    /// The loop observed cancellation and exited.
    Stopped,
}

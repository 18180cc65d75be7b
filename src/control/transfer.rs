//! Distance → LED transfer function.
//!
//! Pure and stateless.  The distance is clamped to `[0, max_distance]`,
//! turned into a ratio, and mapped either to the blinking alarm (strictly
//! below `blinking_distance`) or to a fading duty cycle with inverse-square
//! falloff floored at [`DUTY_FLOOR`].

use crate::config::LoopConfig;
use crate::error::SensorError;

/// Lowest duty applied while fading, so the LED never goes dark in range.
pub const DUTY_FLOOR: f64 = 0.05;

/// Output mode selected for a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fading,
    Blinking,
}

/// Result of one transfer-function evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Steady brightness at `duty`.
    Fading { clamped: f64, duty: f64 },
    /// Proximity alarm; no duty is computed.
    Blinking { clamped: f64 },
}

impl Decision {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Fading { .. } => Mode::Fading,
            Self::Blinking { .. } => Mode::Blinking,
        }
    }

    pub fn duty(&self) -> Option<f64> {
        match self {
            Self::Fading { duty, .. } => Some(*duty),
            Self::Blinking { .. } => None,
        }
    }

    /// The clamped distance the decision was made on.
    pub fn clamped(&self) -> f64 {
        match self {
            Self::Fading { clamped, .. } | Self::Blinking { clamped } => *clamped,
        }
    }
}

/// Clamp a raw reading to `[0, max_distance]`.  NaN is a sensor fault.
pub fn clamp_distance(distance: f64, config: &LoopConfig) -> Result<f64, SensorError> {
    if distance.is_nan() {
        return Err(SensorError::NotANumber);
    }
    Ok(config.max_distance().min(distance.max(0.0)))
}

/// Map a raw distance reading to a mode and duty cycle.
pub fn decide(distance: f64, config: &LoopConfig) -> Result<Decision, SensorError> {
    let clamped = clamp_distance(distance, config)?;
    if clamped < config.blinking_distance() {
        return Ok(Decision::Blinking { clamped });
    }
    let linear_ratio = clamped / config.max_distance();
    let duty = DUTY_FLOOR.max((1.0 - linear_ratio).powi(2));
    Ok(Decision::Fading { clamped, duty })
}

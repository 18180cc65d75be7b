//! Module configuration parameters
//!
//! Attributes arrive as a JSON object from the host.  [`ModuleConfig`] is
//! the validated attribute set; [`LoopConfig`] is the immutable subset the
//! control loop runs with.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Fixed cadence of the control loop.
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(200);

/// Attributes that must be present as strings, in check order.
const REQUIRED_DEPENDENCIES: [&str; 2] = ["board", "sensor"];
const REQUIRED_ATTRIBUTES: [&str; 1] = ["led_pin"];

/// Validated attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Name of the board dependency that owns the LED pin.
    pub board: String,
    /// Name of the distance sensor dependency.
    pub sensor: String,
    /// Pin identifier handed to the board's pin resolver.
    pub led_pin: String,
    /// Start the loop as soon as the configuration is applied.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
    /// Upper clamp bound in meters.
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    /// Alarm threshold in meters.
    #[serde(default = "default_blinking_distance")]
    pub blinking_distance: f64,
}

fn default_auto_start() -> bool {
    true
}

fn default_max_distance() -> f64 {
    1.0
}

fn default_blinking_distance() -> f64 {
    0.15
}

impl ModuleConfig {
    /// Check required attributes and return the implicit dependency names
    /// (`[board, sensor]`).
    pub fn validate_attributes(attrs: &Map<String, Value>) -> Result<Vec<String>> {
        let mut implicit = Vec::with_capacity(REQUIRED_DEPENDENCIES.len());
        for field in REQUIRED_DEPENDENCIES {
            implicit.push(required_str(attrs, field)?.to_owned());
        }
        for field in REQUIRED_ATTRIBUTES {
            required_str(attrs, field)?;
        }
        Ok(implicit)
    }

    /// Parse and range-check a full attribute object.
    pub fn from_attributes(attrs: &Map<String, Value>) -> Result<Self> {
        Self::validate_attributes(attrs)?;
        let config: Self = serde_json::from_value(Value::Object(attrs.clone()))
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        LoopConfig::new(self.max_distance, self.blinking_distance).map(|_| ())
    }

    /// The immutable parameters the control loop runs with.
    pub fn loop_config(&self) -> Result<LoopConfig> {
        LoopConfig::new(self.max_distance, self.blinking_distance)
    }
}

fn required_str<'a>(attrs: &'a Map<String, Value>, field: &'static str) -> Result<&'a str> {
    attrs
        .get(field)
        .and_then(Value::as_str)
        .ok_or(ConfigError::Missing { field })
}

/// Loop parameters, fixed for the lifetime of one loop run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    max_distance: f64,
    blinking_distance: f64,
    sample_period: Duration,
}

impl LoopConfig {
    /// Build a loop config, rejecting `blinking_distance >= max_distance`
    /// and non-finite or negative bounds.
    pub fn new(max_distance: f64, blinking_distance: f64) -> Result<Self> {
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_distance must be a positive number, got {max_distance}"
            )));
        }
        if !blinking_distance.is_finite() || blinking_distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "blinking_distance must be non-negative, got {blinking_distance}"
            )));
        }
        if blinking_distance >= max_distance {
            return Err(ConfigError::Invalid(format!(
                "blinking_distance ({blinking_distance}) must be below max_distance ({max_distance})"
            )));
        }
        Ok(Self {
            max_distance,
            blinking_distance,
            sample_period: SAMPLE_PERIOD,
        })
    }

    /// Override the cadence.  Bench and test runs only; not an attribute.
    #[must_use]
    pub fn with_sample_period(mut self, period: Duration) -> Self {
        self.sample_period = period;
        self
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn blinking_distance(&self) -> f64 {
        self.blinking_distance
    }

    pub fn sample_period(&self) -> Duration {
        self.sample_period
    }

}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_distance: default_max_distance(),
            blinking_distance: default_blinking_distance(),
            sample_period: SAMPLE_PERIOD,
        }
    }
}

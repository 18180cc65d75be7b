//! In-memory board and sensor for bench runs on the host.
//!
//! [`SimBoard`] remembers what was last written to each pin.
//! [`SimSensor`] replays a triangular distance sweep, far → near → far,
//! optionally failing every N-th read.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};
use std::collections::HashMap;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};

use crate::app::ports::{Board, DISTANCE_KEY, DistanceSensor, PwmActuator, Readings};
use crate::error::{HardwareError, SensorError};

// ── Board ────────────────────────────────────────────────────

/// Last write seen on a simulated pin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PinRecord {
    pub duty: f64,
    pub frequency_hz: u32,
    pub writes: usize,
}

type PinTable = Arc<Mutex<CriticalSectionRawMutex, RefCell<HashMap<String, PinRecord>>>>;

/// A board exposing a fixed set of named PWM pins.
pub struct SimBoard {
    pins: PinTable,
}

impl SimBoard {
    pub fn new<I, N>(pin_names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let table: HashMap<String, PinRecord> = pin_names
            .into_iter()
            .map(|n| (n.into(), PinRecord::default()))
            .collect();
        Self {
            pins: Arc::new(Mutex::new(RefCell::new(table))),
        }
    }

    /// Last duty written to `name`, if the pin exists.
    pub fn duty(&self, name: &str) -> Option<f64> {
        self.record(name).map(|r| r.duty)
    }

    /// Number of writes `name` has received.
    pub fn writes(&self, name: &str) -> usize {
        self.record(name).map_or(0, |r| r.writes)
    }

    pub fn record(&self, name: &str) -> Option<PinRecord> {
        self.pins.lock(|p| p.borrow().get(name).copied())
    }
}

impl Board for SimBoard {
    type Pin = SimPin;

    async fn pwm_pin(&self, name: &str) -> Result<SimPin, HardwareError> {
        if self.record(name).is_none() {
            return Err(HardwareError::PinNotFound(name.to_string()));
        }
        Ok(SimPin {
            name: name.to_string(),
            pins: Arc::clone(&self.pins),
        })
    }
}

/// Handle to one [`SimBoard`] pin.
pub struct SimPin {
    name: String,
    pins: PinTable,
}

impl PwmActuator for SimPin {
    async fn set_pwm(&self, duty_cycle: f64, frequency_hz: u32) -> Result<(), HardwareError> {
        self.pins.lock(|p| {
            let mut table = p.borrow_mut();
            let rec = table
                .get_mut(&self.name)
                .ok_or_else(|| HardwareError::PinNotFound(self.name.clone()))?;
            rec.duty = duty_cycle;
            rec.frequency_hz = frequency_hz;
            rec.writes += 1;
            Ok(())
        })
    }
}

// ── Sensor ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Profile {
    Fixed(f64),
    Sweep {
        near: f64,
        far: f64,
        period: Duration,
    },
}

/// A distance sensor with a scripted profile.
pub struct SimSensor {
    profile: Profile,
    origin: Instant,
    fail_every: Option<u32>,
    reads: AtomicU32,
}

impl SimSensor {
    /// Always reports `distance`.
    pub fn fixed(distance: f64) -> Self {
        Self::with_profile(Profile::Fixed(distance))
    }

    /// Sweeps from `far` down to `near` and back once per `period`.
    pub fn sweep(near: f64, far: f64, period: Duration) -> Self {
        Self::with_profile(Profile::Sweep { near, far, period })
    }

    fn with_profile(profile: Profile) -> Self {
        Self {
            profile,
            origin: Instant::now(),
            fail_every: None,
            reads: AtomicU32::new(0),
        }
    }

    /// Fail every `n`-th read (`None` or `Some(0)` never fails).
    pub fn with_failure_every(mut self, n: Option<u32>) -> Self {
        self.fail_every = n.filter(|&n| n > 0);
        self
    }

    /// Distance the profile yields `elapsed` after creation.
    pub fn distance_at(&self, elapsed: Duration) -> f64 {
        match self.profile {
            Profile::Fixed(d) => d,
            Profile::Sweep { near, far, period } => {
                let period_ms = period.as_millis().max(1);
                let phase = (elapsed.as_millis() % period_ms) as f64 / period_ms as f64;
                let depth = if phase < 0.5 {
                    phase * 2.0
                } else {
                    2.0 - phase * 2.0
                };
                far - (far - near) * depth
            }
        }
    }
}

impl DistanceSensor for SimSensor {
    async fn readings(&self) -> Result<Readings, SensorError> {
        let n = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_every.is_some_and(|every| n % every == 0) {
            return Err(SensorError::ReadFailed(format!("simulated failure on read {n}")));
        }
        let distance = self.distance_at(self.origin.elapsed());
        Ok(Readings::from([(DISTANCE_KEY.to_string(), distance)]))
    }
}

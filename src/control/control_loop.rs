//! Sense → decide → act loop.
//!
//! ```text
//!            ┌──────────┐  d < blinking   ┌───────────┐
//!   start ──▶│  Idle    │────────────────▶│ Blinking  │◀─┐ flash, re-sample
//!            └────┬─────┘                 └─────┬─────┘──┘ while d < blinking
//!                 │ d ≥ blinking                │ d ≥ blinking
//!                 ▼                             ▼
//!            ┌──────────┐◀──────────────────────┘
//!            │  Fading  │  write only on mode change or |Δduty| > 0.01
//!            └──────────┘
//! ```
//!
//! One [`ControlLoop`] value is built per `start()` and consumed by
//! [`ControlLoop::run`].  Its [`ActuatorState`] lives on that run's stack
//! and dies with it; nothing outside the loop can observe or mutate it.
//!
//! Faults never end the loop.  A failed sensor read skips the iteration; a
//! failed write leaves the cached state untouched so the next decision
//! retries it.  Only the cancellation token ends a run, and it leaves the
//! LED at whatever duty was last applied.

use std::sync::Arc;

use embassy_time::Instant;
use futures_lite::future;
use log::{debug, info, warn};

use crate::app::events::LoopEvent;
use crate::app::ports::{Board, DISTANCE_KEY, DistanceSensor, EventSink, PwmActuator};
use crate::config::LoopConfig;
use crate::control::cancel::CancelToken;
use crate::control::flash::{PWM_FREQUENCY_HZ, flash};
use crate::control::lifecycle::Wiring;
use crate::control::transfer::{self, Decision, Mode};
use crate::error::{Cancelled, Fault, SensorError};

/// Minimum duty change that justifies a new PWM write while fading.
pub const HYSTERESIS: f64 = 0.01;

// ── Actuator state ─────────────────────────────────────────

/// What the loop last applied to the LED.  `last_mode == None` is the
/// idle state right after a (re)start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActuatorState {
    last_mode: Option<Mode>,
    last_duty: Option<f64>,
}

impl ActuatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_mode(&self) -> Option<Mode> {
        self.last_mode
    }

    pub fn last_duty(&self) -> Option<f64> {
        self.last_duty
    }

    /// Whether a fading `duty` differs enough from what is applied.
    pub fn needs_write(&self, duty: f64) -> bool {
        if self.last_mode != Some(Mode::Fading) {
            return true;
        }
        self.last_duty.is_none_or(|last| (duty - last).abs() > HYSTERESIS)
    }

    /// Record a fading write that completed.
    pub fn record_fading(&mut self, duty: f64) {
        self.last_mode = Some(Mode::Fading);
        self.last_duty = Some(duty);
    }

    /// The alarm took over the LED; its duty is no longer known.
    pub fn record_blinking(&mut self) {
        self.last_mode = Some(Mode::Blinking);
        self.last_duty = None;
    }
}

// ── Control loop ───────────────────────────────────────────

/// One loop run, bound to a wiring snapshot and a cancellation token.
pub(crate) struct ControlLoop<B, S> {
    board: Arc<B>,
    sensor: Arc<S>,
    pin_name: String,
    config: LoopConfig,
    sink: Arc<dyn EventSink>,
    token: CancelToken,
}

impl<B: Board, S: DistanceSensor> ControlLoop<B, S> {
    pub(crate) fn new(wiring: &Wiring<B, S>, sink: Arc<dyn EventSink>, token: CancelToken) -> Self {
        Self {
            board: Arc::clone(&wiring.board),
            sensor: Arc::clone(&wiring.sensor),
            pin_name: wiring.led_pin.clone(),
            config: wiring.config,
            sink,
            token,
        }
    }

    /// Run until the token is cancelled.
    pub(crate) async fn run(self) {
        info!(
            "Control loop started (max {:.2} m, alarm below {:.2} m)",
            self.config.max_distance(),
            self.config.blinking_distance()
        );
        self.sink.emit(&LoopEvent::Started);

        if let Ok(pin) = self.acquire_pin().await {
            let mut state = ActuatorState::new();
            while !self.token.is_cancelled() {
                let started = Instant::now();
                match self.iterate(&pin, &mut state).await {
                    Ok(()) => {}
                    Err(Fault::Cancelled(_)) => break,
                    Err(fault) => self.report(fault),
                }
                if self
                    .token
                    .sleep_until(started + self.config.sample_period())
                    .await
                    .is_err()
                {
                    break;
                }
                future::yield_now().await;
            }
        }

        info!("Control loop stopped");
        self.sink.emit(&LoopEvent::Stopped);
    }

    /// Resolve the LED pin, retrying every period until it exists.
    async fn acquire_pin(&self) -> Result<B::Pin, Cancelled> {
        loop {
            let started = Instant::now();
            match self.token.guard(self.board.pwm_pin(&self.pin_name)).await? {
                Ok(pin) => {
                    debug!("LED pin '{}' acquired", self.pin_name);
                    self.sink.emit(&LoopEvent::PinAcquired {
                        pin: self.pin_name.clone(),
                    });
                    return Ok(pin);
                }
                Err(e) => self.report(e.into()),
            }
            self.token
                .sleep_until(started + self.config.sample_period())
                .await?;
        }
    }

    /// One sense → decide → act pass.
    async fn iterate(&self, pin: &B::Pin, state: &mut ActuatorState) -> Result<(), Fault> {
        let distance = self.sample().await?;
        match transfer::decide(distance, &self.config)? {
            Decision::Blinking { clamped } => self.alarm(pin, state, clamped).await,
            Decision::Fading { duty, .. } => self.fade(pin, state, distance, duty).await,
        }
    }

    async fn sample(&self) -> Result<f64, Fault> {
        let readings = self.token.guard(self.sensor.readings()).await??;
        let distance = readings
            .get(DISTANCE_KEY)
            .copied()
            .ok_or(SensorError::MissingReading(DISTANCE_KEY))?;
        Ok(distance)
    }

    async fn fade(
        &self,
        pin: &B::Pin,
        state: &mut ActuatorState,
        distance: f64,
        duty: f64,
    ) -> Result<(), Fault> {
        if !state.needs_write(duty) {
            return Ok(());
        }
        self.token
            .guard(pin.set_pwm(duty, PWM_FREQUENCY_HZ))
            .await??;
        state.record_fading(duty);
        info!("Distance: {:.3} m -> PWM duty cycle: {:.2}", distance, duty);
        self.sink.emit(&LoopEvent::DutyApplied { distance, duty });
        Ok(())
    }

    /// Flash until a fresh reading is back at or above the threshold.
    /// Starves the outer cadence on purpose.
    async fn alarm(
        &self,
        pin: &B::Pin,
        state: &mut ActuatorState,
        clamped: f64,
    ) -> Result<(), Fault> {
        let threshold = self.config.blinking_distance();
        warn!(
            "Distance {:.3} m < {:.2} m, entering blinking loop",
            clamped, threshold
        );
        self.sink.emit(&LoopEvent::AlarmEntered {
            distance: clamped,
            threshold,
        });
        state.record_blinking();

        loop {
            flash(pin, &self.token).await?;
            let distance = self.sample().await?;
            if transfer::decide(distance, &self.config)?.mode() != Mode::Blinking {
                info!("Distance {:.3} m, leaving blinking loop", distance);
                self.sink.emit(&LoopEvent::AlarmCleared { distance });
                return Ok(());
            }
        }
    }

    fn report(&self, fault: Fault) {
        match fault {
            Fault::Sensor(e) => {
                warn!("Error reading distance sensor: {e}");
                self.sink.emit(&LoopEvent::SensorFault(e));
            }
            Fault::Hardware(e) => {
                warn!("Error updating LED brightness: {e}");
                self.sink.emit(&LoopEvent::HardwareFault(e));
            }
            Fault::Cancelled(_) => {}
        }
    }
}

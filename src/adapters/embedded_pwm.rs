//! `embedded-hal` PWM bridge.
//!
//! Wraps any [`SetDutyCycle`] channel as a [`PwmActuator`] so the loop can
//! drive real peripherals (LEDC, TIM, PCA9685, …) without knowing about
//! them.  The PWM frequency belongs to the peripheral's timer and is fixed
//! when the channel is built; a write asking for a different frequency is
//! applied at the configured one and logged.

use core::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::pwm::{Error as _, SetDutyCycle};
use log::debug;

use crate::app::ports::{Board, PwmActuator};
use crate::error::HardwareError;

type SharedChannel<P> = Arc<Mutex<CriticalSectionRawMutex, RefCell<P>>>;

/// A board made of named `embedded-hal` PWM channels.
pub struct HalBoard<P> {
    channels: HashMap<String, SharedChannel<P>>,
    frequency_hz: u32,
}

impl<P: SetDutyCycle + Send + 'static> HalBoard<P> {
    /// `frequency_hz` is the rate the channels' timer was configured for.
    pub fn new(frequency_hz: u32) -> Self {
        Self {
            channels: HashMap::new(),
            frequency_hz,
        }
    }

    pub fn with_channel(mut self, name: impl Into<String>, channel: P) -> Self {
        self.channels
            .insert(name.into(), Arc::new(Mutex::new(RefCell::new(channel))));
        self
    }
}

impl<P: SetDutyCycle + Send + 'static> Board for HalBoard<P> {
    type Pin = HalPwmPin<P>;

    async fn pwm_pin(&self, name: &str) -> Result<HalPwmPin<P>, HardwareError> {
        let channel = self
            .channels
            .get(name)
            .ok_or_else(|| HardwareError::PinNotFound(name.to_string()))?;
        Ok(HalPwmPin {
            name: name.to_string(),
            channel: Arc::clone(channel),
            frequency_hz: self.frequency_hz,
        })
    }
}

/// One channel of a [`HalBoard`].
pub struct HalPwmPin<P> {
    name: String,
    channel: SharedChannel<P>,
    frequency_hz: u32,
}

impl<P: SetDutyCycle> PwmActuator for HalPwmPin<P> {
    async fn set_pwm(&self, duty_cycle: f64, frequency_hz: u32) -> Result<(), HardwareError> {
        if frequency_hz != self.frequency_hz {
            debug!(
                "{}: {} Hz requested, timer fixed at {} Hz",
                self.name, frequency_hz, self.frequency_hz
            );
        }
        let duty = duty_cycle.clamp(0.0, 1.0);
        self.channel.lock(|c| {
            let mut ch = c.borrow_mut();
            let raw = (duty * f64::from(ch.max_duty_cycle())).round() as u16;
            ch.set_duty_cycle(raw)
                .map_err(|e| HardwareError::WriteFailed(format!("{}: {:?}", self.name, e.kind())))
        })
    }
}

//! Distance-dimmed LED controller.
//!
//! Reads a distance sensor every 200 ms and drives an LED's PWM duty
//! cycle as an inverse-square function of distance, switching to a
//! blinking alarm when something comes closer than a threshold.
//!
//! Hardware is reached only through the traits in [`app::ports`].  The
//! [`adapters`] module provides an `embedded-hal` bridge, a log sink and
//! in-memory simulation adapters for host runs.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;

pub use app::service::{Dependencies, DimLed};
pub use config::{LoopConfig, ModuleConfig};
pub use control::lifecycle::Controller;

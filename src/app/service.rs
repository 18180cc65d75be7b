//! Application service: the host-facing resource.
//!
//! [`DimLed`] owns the lifecycle [`Controller`] and the active
//! [`ModuleConfig`].  It validates and applies attribute sets, resolves
//! named dependencies, and exposes the command surface.  Nothing here
//! touches hardware; capabilities arrive through [`Dependencies`].
//!
//! ```text
//!  attributes ──▶ ┌──────────────┐ ──wire──▶ Controller ──▶ ControlLoop
//!  commands   ──▶ │    DimLed    │
//!  Dependencies ─▶└──────────────┘
//! ```

use core::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};
use serde_json::{Map, Value};

use crate::config::ModuleConfig;
use crate::control::lifecycle::{Controller, Wiring};
use crate::error::{ConfigError, Result};

use super::commands::Command;
use super::ports::{Board, DistanceSensor, EventSink};

// ── Dependencies ─────────────────────────────────────────────

/// Named boards and sensors a configuration may refer to.
pub struct Dependencies<B, S> {
    boards: HashMap<String, Arc<B>>,
    sensors: HashMap<String, Arc<S>>,
}

impl<B, S> Dependencies<B, S> {
    pub fn new() -> Self {
        Self {
            boards: HashMap::new(),
            sensors: HashMap::new(),
        }
    }

    pub fn with_board(mut self, name: impl Into<String>, board: Arc<B>) -> Self {
        self.boards.insert(name.into(), board);
        self
    }

    pub fn with_sensor(mut self, name: impl Into<String>, sensor: Arc<S>) -> Self {
        self.sensors.insert(name.into(), sensor);
        self
    }

    pub fn board(&self, name: &str) -> Option<Arc<B>> {
        self.boards.get(name).cloned()
    }

    pub fn sensor(&self, name: &str) -> Option<Arc<S>> {
        self.sensors.get(name).cloned()
    }
}

impl<B, S> Default for Dependencies<B, S> {
    fn default() -> Self {
        Self::new()
    }
}

// ── DimLed ───────────────────────────────────────────────────

/// Distance-dimmed LED resource.
pub struct DimLed<B, S> {
    controller: Controller<B, S>,
    config: Mutex<CriticalSectionRawMutex, RefCell<Option<ModuleConfig>>>,
}

impl<B: Board, S: DistanceSensor> DimLed<B, S> {
    /// Check an attribute set without applying it.  Returns the implicit
    /// dependency names (board, sensor).
    pub fn validate_config(attrs: &Map<String, Value>) -> Result<Vec<String>> {
        ModuleConfig::validate_attributes(attrs)
    }

    /// An unconfigured resource.  Commands other than `stop` fail until
    /// [`DimLed::reconfigure`] succeeds.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            controller: Controller::new(sink),
            config: Mutex::new(RefCell::new(None)),
        }
    }

    /// Build and apply the first configuration.
    pub async fn from_attributes(
        attrs: &Map<String, Value>,
        deps: &Dependencies<B, S>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let this = Self::new(sink);
        this.reconfigure(attrs, deps).await?;
        Ok(this)
    }

    /// Apply a new attribute set.
    ///
    /// The running loop (if any) is stopped and the controller rewired.
    /// One self-test flash runs on the new pin, then the loop restarts if
    /// `auto_start` is set.  An invalid set leaves the previous
    /// configuration running untouched.
    pub async fn reconfigure(
        &self,
        attrs: &Map<String, Value>,
        deps: &Dependencies<B, S>,
    ) -> Result<()> {
        let config = ModuleConfig::from_attributes(attrs)?;
        let loop_config = config.loop_config()?;
        let board = deps
            .board(&config.board)
            .ok_or_else(|| ConfigError::UnresolvedDependency {
                kind: "board",
                name: config.board.clone(),
            })?;
        let sensor = deps
            .sensor(&config.sensor)
            .ok_or_else(|| ConfigError::UnresolvedDependency {
                kind: "sensor",
                name: config.sensor.clone(),
            })?;

        info!(
            "Reconfiguring: board={} sensor={} led_pin={} max={:.2} m blink<{:.2} m auto_start={}",
            config.board,
            config.sensor,
            config.led_pin,
            config.max_distance,
            config.blinking_distance,
            config.auto_start
        );

        self.controller.wire(Wiring {
            board,
            sensor,
            led_pin: config.led_pin.clone(),
            config: loop_config,
        });
        let auto_start = config.auto_start;
        self.config.lock(|c| *c.borrow_mut() = Some(config));

        if let Err(e) = self.controller.test().await {
            warn!("Self-test flash failed: {e}");
        }
        if auto_start {
            if let Err(e) = self.controller.start() {
                warn!("Auto-start failed: {e}");
            }
        }
        Ok(())
    }

    /// Run every command in `commands`, in order.  The result maps each
    /// name to whether it succeeded; unknown names map to `false`.
    pub async fn do_command(&self, commands: &Map<String, Value>) -> Map<String, Value> {
        let mut results = Map::new();
        for name in commands.keys() {
            results.insert(name.clone(), Value::Bool(false));
        }
        for (name, args) in commands {
            let ok = self.handle_command(name, args).await;
            results.insert(name.clone(), Value::Bool(ok));
        }
        results
    }

    /// Dispatch one named command.  Never fails; failures are `false`.
    pub async fn handle_command(&self, name: &str, _args: &Value) -> bool {
        let command = match name.parse::<Command>() {
            Ok(c) => c,
            Err(unknown) => {
                warn!("Unknown command '{}'", unknown.0);
                return false;
            }
        };
        info!("Command '{command}'");
        match command {
            Command::Start => match self.controller.start() {
                Ok(_) => true,
                Err(e) => {
                    warn!("{command} failed: {e}");
                    false
                }
            },
            Command::Stop => {
                self.controller.stop();
                true
            }
            Command::Test => match self.controller.test().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("{command} failed: {e}");
                    false
                }
            },
        }
    }

    /// The configuration currently applied, if any.
    pub fn config(&self) -> Option<ModuleConfig> {
        self.config.lock(|c| c.borrow().clone())
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Release the loop.  Safe to call more than once.
    pub fn close(&self) {
        info!("Closing");
        self.controller.shutdown();
    }
}

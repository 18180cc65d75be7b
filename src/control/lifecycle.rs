//! Lifecycle controller: owns the single running loop.
//!
//! ```text
//!   start() ──▶ spawn "dimled-loop" thread ──▶ block_on(ControlLoop::run)
//!                     ▲                              │
//!   stop()  ── cancel token ── join ◀────────────────┘
//! ```
//!
//! At most one loop exists at a time.  The wiring and the run handle sit
//! in one critical-section mutex, so a loop is always spawned from the
//! wiring current at that instant.  `start`, `stop` and `wire` are also
//! serialised by a transition lock that is held across the thread join;
//! a new loop cannot be spawned while a cancelled one is still exiting.
//! Neither lock is held across an await, and the critical section is
//! never held across a join.

use core::cell::RefCell;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use futures_lite::future;
use log::{error, info};

use crate::app::ports::{Board, DistanceSensor, EventSink};
use crate::config::LoopConfig;
use crate::control::cancel::CancelToken;
use crate::control::control_loop::ControlLoop;
use crate::control::flash::flash;
use crate::error::LifecycleError;

/// Name of the loop thread, visible in panics and debuggers.
pub const LOOP_THREAD_NAME: &str = "dimled-loop";

const LOOP_STACK_KB: usize = 64;

// ── Wiring ───────────────────────────────────────────────────

/// Resolved capabilities plus the parameters one loop run uses.
pub struct Wiring<B, S> {
    pub board: Arc<B>,
    pub sensor: Arc<S>,
    pub led_pin: String,
    pub config: LoopConfig,
}

impl<B, S> Clone for Wiring<B, S> {
    fn clone(&self) -> Self {
        Self {
            board: Arc::clone(&self.board),
            sensor: Arc::clone(&self.sensor),
            led_pin: self.led_pin.clone(),
            config: self.config,
        }
    }
}

struct RunHandle {
    token: CancelToken,
    thread: JoinHandle<()>,
}

impl RunHandle {
    fn is_live(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Cancel and wait for the thread.  Never call inside a critical section.
    fn retire(self) {
        self.token.cancel();
        if self.thread.join().is_err() {
            error!("Control loop thread panicked");
        }
        info!("Control loop joined");
    }
}

/// Everything a command caller can observe, behind one lock.
struct Slot<B, S> {
    wiring: Option<Wiring<B, S>>,
    run: Option<RunHandle>,
}

// ── Controller ───────────────────────────────────────────────

/// Start/stop/test surface around one control loop.
pub struct Controller<B, S> {
    slot: Mutex<CriticalSectionRawMutex, RefCell<Slot<B, S>>>,
    /// Serialises start/stop/wire, including the join of a stopped loop.
    transitions: StdMutex<()>,
    sink: Arc<dyn EventSink>,
    /// Fired only by [`Controller::shutdown`]; bounds self-tests.
    teardown: CancelToken,
}

impl<B: Board, S: DistanceSensor> Controller<B, S> {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            slot: Mutex::new(RefCell::new(Slot {
                wiring: None,
                run: None,
            })),
            transitions: StdMutex::new(()),
            sink,
            teardown: CancelToken::new(),
        }
    }

    fn transition(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the wiring.  A running loop is detached in the same critical
    /// section, then cancelled and joined, so it never keeps going on stale
    /// parameters.  The caller decides whether to start again.
    pub fn wire(&self, wiring: Wiring<B, S>) {
        let _guard = self.transition();
        let previous = self.slot.lock(|s| {
            let mut slot = s.borrow_mut();
            slot.wiring = Some(wiring);
            slot.run.take()
        });
        if let Some(handle) = previous {
            handle.retire();
        }
    }

    pub fn is_configured(&self) -> bool {
        self.slot.lock(|s| s.borrow().wiring.is_some())
    }

    /// Whether a loop thread exists and has not exited.
    pub fn is_running(&self) -> bool {
        self.slot
            .lock(|s| s.borrow().run.as_ref().is_some_and(RunHandle::is_live))
    }

    /// Spawn the loop unless one is already active.
    ///
    /// Returns `Ok(true)` when a new loop was started and `Ok(false)` when
    /// one was already running.
    pub fn start(&self) -> Result<bool, LifecycleError> {
        let _guard = self.transition();
        self.slot.lock(|s| {
            let mut slot = s.borrow_mut();
            if slot.run.as_ref().is_some_and(RunHandle::is_live) {
                info!("Control loop already running");
                return Ok(false);
            }
            let wiring = slot.wiring.as_ref().ok_or(LifecycleError::NotConfigured)?;

            let token = CancelToken::new();
            let control = ControlLoop::new(wiring, Arc::clone(&self.sink), token.clone());
            let thread = std::thread::Builder::new()
                .name(LOOP_THREAD_NAME.into())
                .stack_size(LOOP_STACK_KB * 1024)
                .spawn(move || future::block_on(control.run()))
                .map_err(|e| LifecycleError::Spawn(e.to_string()))?;

            info!("Spawned '{}' for LED pin '{}'", LOOP_THREAD_NAME, wiring.led_pin);
            slot.run = Some(RunHandle { token, thread });
            Ok(true)
        })
    }

    /// Cancel the running loop and wait for its thread to exit.
    ///
    /// Returns `true` if a loop was running.  Once this returns the loop
    /// issues no further writes.  A [`Controller::test`] flash already in
    /// progress is not part of the loop and keeps writing until it ends;
    /// only [`Controller::shutdown`] interrupts it.  Safe to call at any
    /// time, from any thread.
    pub fn stop(&self) -> bool {
        let _guard = self.transition();
        let Some(handle) = self.slot.lock(|s| s.borrow_mut().run.take()) else {
            return false;
        };
        handle.retire();
        true
    }

    /// Run one flash sequence on the wired pin, concurrently with any
    /// running loop.  Only [`Controller::shutdown`] interrupts it.
    pub async fn test(&self) -> Result<(), LifecycleError> {
        let wiring = self
            .slot
            .lock(|s| s.borrow().wiring.clone())
            .ok_or(LifecycleError::NotConfigured)?;
        let pin = self
            .teardown
            .guard(wiring.board.pwm_pin(&wiring.led_pin))
            .await??;
        flash(&pin, &self.teardown).await?;
        Ok(())
    }

    /// Final teardown: interrupt self-tests and stop the loop.  Idempotent.
    pub fn shutdown(&self) {
        self.teardown.cancel();
        self.stop();
    }
}

impl<B, S> Drop for Controller<B, S> {
    fn drop(&mut self) {
        self.teardown.cancel();
        self.slot.lock(|s| {
            if let Some(h) = s.borrow().run.as_ref() {
                h.token.cancel();
            }
        });
    }
}

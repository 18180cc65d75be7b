//! Cooperative cancellation token.
//!
//! One token is created per loop run and handed to the loop at spawn
//! time.  The loop checks it at the top of every iteration and races every
//! suspension (sensor read, PWM write, cadence sleep, flash hold) against
//! it, so `stop()` takes effect at the next await point instead of after a
//! full period.
//!
//! Any number of futures may wait on the same token; wakers are kept in an
//! `embassy-sync` multi-waker registration behind a critical-section mutex.

use core::cell::RefCell;
use core::fmt;
use core::future::{Future, poll_fn};
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::Poll;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::waitqueue::MultiWakerRegistration;
use embassy_time::{Duration, Instant, Timer};
use futures_lite::future;

use crate::error::Cancelled;

/// Waker slots per token.  Overflow wakes everyone, which is harmless.
const WAITERS: usize = 8;

struct Inner {
    cancelled: AtomicBool,
    wakers: Mutex<CriticalSectionRawMutex, RefCell<MultiWakerRegistration<WAITERS>>>,
}

/// Shared, clonable cancellation signal.  Once cancelled it stays cancelled.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                wakers: Mutex::new(RefCell::new(MultiWakerRegistration::new())),
            }),
        }
    }

    /// Fire the token and wake every waiter.  Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.wakers.lock(|w| w.borrow_mut().wake());
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        poll_fn(|cx| {
            if self.is_cancelled() {
                return Poll::Ready(());
            }
            self.inner.wakers.lock(|w| w.borrow_mut().register(cx.waker()));
            // Re-check after registering so a concurrent cancel() is not lost.
            if self.is_cancelled() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await;
    }

    /// Drive `fut` to completion unless the token fires first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        future::or(async { Ok(fut.await) }, async {
            self.cancelled().await;
            Err(Cancelled)
        })
        .await
    }

    /// Interruptible sleep.
    pub async fn sleep(&self, period: Duration) -> Result<(), Cancelled> {
        self.guard(Timer::after(period)).await
    }

    /// Interruptible sleep until an absolute deadline (returns at once if
    /// the deadline has passed and the token is still live).
    pub async fn sleep_until(&self, deadline: Instant) -> Result<(), Cancelled> {
        self.guard(Timer::at(deadline)).await
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

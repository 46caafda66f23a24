//! Cooperative cancellation for blocking waits.
//!
//! Retry and poll loops sleep through [`Pause`]. The default implementation,
//! [`CancelToken`], parks on a condvar so `cancel()` from another thread wakes
//! the sleeper immediately instead of letting it wait out the interval.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Returned when a wait was interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Something a retry or poll loop can sleep on.
pub trait Pause {
    /// Sleep for `duration`, or return early with `Cancelled`.
    fn pause(&self, duration: Duration) -> Result<(), Cancelled>;
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }
}

impl Pause for CancelToken {
    fn pause(&self, duration: Duration) -> Result<(), Cancelled> {
        let (flag, cvar) = &*self.inner;
        // None: the duration does not fit an Instant, wait for cancellation only.
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled {
                return Err(Cancelled);
            }
            // Spurious wakeups loop back and re-check both the flag and the deadline.
            cancelled = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    cvar.wait_timeout(cancelled, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => cvar.wait(cancelled).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

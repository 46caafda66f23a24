//! Retry loop: run a closure until success, a non-retryable failure, or timeout.

use std::time::Instant;

use super::classify::Classify;
use super::policy::{RetryDecision, RetrySpec};
use crate::cancel::{Cancelled, Pause};

/// Runs `f` until it succeeds or `spec` says to stop, sleeping on `pause`
/// between attempts. The first attempt always runs, whatever the timeout.
/// On give-up the most recent error is returned; an interrupted sleep
/// returns `E::from(Cancelled)`.
pub fn run_with_retry<T, E, P, F>(spec: &RetrySpec, pause: &P, mut f: F) -> Result<T, E>
where
    E: Classify + From<Cancelled> + std::fmt::Display,
    P: Pause + ?Sized,
    F: FnMut() -> Result<T, E>,
{
    let start = Instant::now();
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = e.kind();
                match spec.decide(attempt, kind, start.elapsed()) {
                    RetryDecision::NoRetry => {
                        tracing::debug!(attempt, ?kind, "giving up: {}", e);
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, ?kind, delay = ?d, "retrying after error: {}", e);
                        pause.pause(d)?;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::error::Error;
    use crate::retry::ErrorKind;
    use std::cell::Cell;
    use std::time::Duration;

    fn transient() -> Error {
        Error::Transport(curl::Error::new(6))
    }

    #[test]
    fn success_short_circuits() {
        let spec = RetrySpec::new(Duration::from_secs(5), Duration::from_millis(1), 1.0);
        let calls = Cell::new(0);
        let out: Result<u32, Error> = run_with_retry(&spec, &CancelToken::new(), || {
            calls.set(calls.get() + 1);
            Ok(7)
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_until_success() {
        let spec = RetrySpec::new(Duration::from_secs(5), Duration::from_millis(1), 2.0);
        let calls = Cell::new(0);
        let out = run_with_retry(&spec, &CancelToken::new(), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(transient())
            } else {
                Ok("done")
            }
        });
        assert_eq!(out.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retryable_failure_is_retried_until_timeout() {
        let timeout = Duration::from_millis(400);
        let delay = Duration::from_millis(50);
        let spec = RetrySpec::new(timeout, delay, 1.0);
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let out: Result<(), Error> = run_with_retry(&spec, &CancelToken::new(), || {
            calls.set(calls.get() + 1);
            Err(transient())
        });
        assert!(matches!(out, Err(Error::Transport(_))));
        let floor = (timeout.as_millis() / delay.as_millis()) as u32;
        assert!(calls.get() >= floor, "only {} attempts", calls.get());
        assert!(start.elapsed() >= timeout);
    }

    #[test]
    fn non_retryable_failure_makes_one_attempt() {
        let spec = RetrySpec::new(Duration::from_secs(5), Duration::from_millis(1), 1.0);
        let calls = Cell::new(0);
        let out: Result<(), Error> = run_with_retry(&spec, &CancelToken::new(), || {
            calls.set(calls.get() + 1);
            Err(Error::response("malformed payload"))
        });
        assert!(matches!(out, Err(Error::Response(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_timeout_still_attempts_once() {
        let spec = RetrySpec::new(Duration::ZERO, Duration::from_millis(1), 1.0);
        let calls = Cell::new(0);
        let out: Result<(), Error> = run_with_retry(&spec, &CancelToken::new(), || {
            calls.set(calls.get() + 1);
            Err(transient())
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn cancelled_token_stops_retrying() {
        let spec = RetrySpec::new(Duration::from_secs(60), Duration::from_secs(30), 1.0);
        let token = CancelToken::new();
        token.cancel();
        let calls = Cell::new(0);
        let out: Result<(), Error> = run_with_retry(&spec, &token, || {
            calls.set(calls.get() + 1);
            Err(transient())
        });
        assert!(matches!(out, Err(Error::Cancelled(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retryable_set_is_honoured() {
        let spec = RetrySpec::new(Duration::from_secs(5), Duration::from_millis(1), 1.0)
            .with_retryable([ErrorKind::Timeout]);
        let calls = Cell::new(0);
        let out: Result<(), Error> = run_with_retry(&spec, &CancelToken::new(), || {
            calls.set(calls.get() + 1);
            Err(transient())
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 1);
    }
}

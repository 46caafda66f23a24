use std::collections::BTreeSet;
use std::time::Duration;

/// High-level classification of a failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (DNS, refused, reset).
    Connection,
    /// TLS handshake or certificate failure.
    Tls,
    /// Retryable HTTP status that is not throttling (5xx).
    Http5xx(u16),
    /// Anything else; not retried by default.
    Other,
}

/// Decision returned by [`RetrySpec::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Timeout, delay, backoff and the set of kinds worth retrying.
///
/// The delay before attempt `n + 1` is `retry_delay * backoff^(n - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySpec {
    timeout: Duration,
    retry_delay: Duration,
    backoff: f64,
    retryable: BTreeSet<ErrorKind>,
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(1), 1.0)
    }
}

impl RetrySpec {
    /// Build a spec retrying transient transport kinds. `backoff` below 1
    /// (or NaN) is raised to 1 so delays never shrink.
    pub fn new(timeout: Duration, retry_delay: Duration, backoff: f64) -> Self {
        Self {
            timeout,
            retry_delay,
            backoff: backoff.max(1.0),
            retryable: [
                ErrorKind::Timeout,
                ErrorKind::Connection,
                ErrorKind::Tls,
                ErrorKind::Throttled,
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Replace the set of retryable kinds.
    pub fn with_retryable<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.retryable = kinds.into_iter().collect();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn backoff(&self) -> f64 {
        self.backoff
    }

    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        match kind {
            // Any 5xx counts when the caller listed one.
            ErrorKind::Http5xx(_) => self
                .retryable
                .iter()
                .any(|k| matches!(k, ErrorKind::Http5xx(_))),
            other => self.retryable.contains(&other),
        }
    }

    /// Delay to sleep after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff.powi(exp);
        Duration::try_from_secs_f64(self.retry_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Decide what to do after attempt `attempt` failed with `kind`, given
    /// the time elapsed since the first attempt started.
    pub fn decide(&self, attempt: u32, kind: ErrorKind, elapsed: Duration) -> RetryDecision {
        if !self.is_retryable(kind) || elapsed >= self.timeout {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay_for(attempt))
    }
}

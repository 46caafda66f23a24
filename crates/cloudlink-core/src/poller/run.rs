//! Poll loop: query, sleep, repeat until settled or out of attempts/time.

use std::time::{Duration, Instant};

use super::state::{Observation, PollState};
use crate::cancel::{Cancelled, Pause};

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Polling stopped on this observation.
    Settled(Observation),
    /// The bound ran out while still waiting. The request may yet complete.
    GaveUp { attempts: u32, last: Observation },
}

impl PollOutcome {
    pub fn observation(&self) -> &Observation {
        match self {
            PollOutcome::Settled(obs) => obs,
            PollOutcome::GaveUp { last, .. } => last,
        }
    }

    pub fn state(&self) -> PollState {
        self.observation().state
    }

    pub fn gave_up(&self) -> bool {
        matches!(self, PollOutcome::GaveUp { .. })
    }
}

/// Fixed-interval poller bounded by attempts and/or wall-clock time.
/// With neither bound it polls until settled or cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct Poller {
    interval: Duration,
    max_attempts: Option<u32>,
    timeout: Option<Duration>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            timeout: None,
        }
    }

    /// At most `n` queries (at least one is always made).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n.max(1));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until a terminal state is observed.
    pub fn poll<E, P, F>(&self, pause: &P, query: F) -> Result<PollOutcome, E>
    where
        E: From<Cancelled>,
        P: Pause + ?Sized,
        F: FnMut() -> Result<Observation, E>,
    {
        self.poll_while(pause, |state| state == PollState::Pending, query)
    }

    /// Poll while `waiting(state)` holds. Query errors are returned as-is;
    /// retrying them is the transport's job.
    pub fn poll_while<E, P, W, F>(&self, pause: &P, mut waiting: W, mut query: F) -> Result<PollOutcome, E>
    where
        E: From<Cancelled>,
        P: Pause + ?Sized,
        W: FnMut(PollState) -> bool,
        F: FnMut() -> Result<Observation, E>,
    {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let obs = query()?;
            tracing::debug!(attempt = attempts, state = %obs.state, "poll");
            if !waiting(obs.state) {
                return Ok(PollOutcome::Settled(obs));
            }

            let out_of_attempts = self.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = self.timeout.is_some_and(|t| start.elapsed() >= t);
            if out_of_attempts || out_of_time {
                tracing::warn!(attempts, state = %obs.state, "gave up polling");
                return Ok(PollOutcome::GaveUp {
                    attempts,
                    last: obs,
                });
            }

            pause.pause(self.interval)?;
        }
    }
}

//! Spot-request lifecycle: wait for fulfilment, clean up, confirm cancellation.
//!
//! Cleanup order once the request is fulfilled is fixed: tag the resource,
//! cancel the now-redundant request, destroy the resource (one-shot runs),
//! re-tag it, then poll until the request reads `cancelled`. Anything else at
//! that point is reported as [`Error::Consistency`]. Each driver call is a
//! single attempt here; transient failures are retried by the connection
//! underneath.

use std::collections::BTreeMap;

use super::run::{PollOutcome, Poller};
use super::state::{Observation, PollState};
use crate::cancel::Pause;
use crate::config::CloudlinkConfig;
use crate::error::{Error, Result};

pub type Tags = BTreeMap<String, String>;

/// Provider operations the workflow needs. Implementations usually issue
/// one `Connection::request` per call.
pub trait SpotDriver {
    fn describe_request(&mut self, request_id: &str) -> Result<Observation>;
    fn tag_resource(&mut self, resource_id: &str, tags: &Tags) -> Result<()>;
    fn cancel_request(&mut self, request_id: &str) -> Result<()>;
    fn destroy_resource(&mut self, resource_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The resource came up, cleanup ran and cancellation was confirmed.
    Fulfilled { resource_id: String },
    /// The provider reported the request as failed.
    Failed { message: Option<String> },
    /// The request was cancelled before it was fulfilled.
    Cancelled,
    /// Still pending when the wait ran out; `cancelled` tells whether the
    /// request was then cancelled (and the cancellation confirmed).
    Unfulfilled { cancelled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub request_id: String,
    pub outcome: WorkflowOutcome,
}

#[derive(Debug, Clone)]
pub struct SpotWorkflow {
    wait: Poller,
    confirm: Poller,
    tags: Tags,
    retag: Tags,
    teardown: bool,
    cancel_unfulfilled: bool,
}

impl SpotWorkflow {
    /// `wait` bounds the wait for fulfilment, `confirm` the wait for the
    /// cancellation to show. Teardown and cancelling unfulfilled requests
    /// are on by default.
    pub fn new(wait: Poller, confirm: Poller) -> Self {
        Self {
            wait,
            confirm,
            tags: Tags::new(),
            retag: Tags::new(),
            teardown: true,
            cancel_unfulfilled: true,
        }
    }

    pub fn from_config(cfg: &CloudlinkConfig) -> Self {
        Self::new(cfg.poll.to_poller(), cfg.confirm.to_poller())
    }

    /// Tags applied as soon as the resource is live.
    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Tags applied after teardown.
    pub fn retag(mut self, tags: Tags) -> Self {
        self.retag = tags;
        self
    }

    /// Destroy the resource after cancelling its request.
    pub fn teardown(mut self, enabled: bool) -> Self {
        self.teardown = enabled;
        self
    }

    /// Cancel the request when it is still pending after the wait.
    pub fn cancel_unfulfilled(mut self, enabled: bool) -> Self {
        self.cancel_unfulfilled = enabled;
        self
    }

    pub fn run<D, P>(&self, driver: &mut D, pause: &P, request_id: &str) -> Result<WorkflowReport>
    where
        D: SpotDriver + ?Sized,
        P: Pause + ?Sized,
    {
        tracing::info!("waiting for spot request '{}'", request_id);
        let waited = self
            .wait
            .poll(pause, || driver.describe_request(request_id))?;

        let outcome = match waited {
            PollOutcome::GaveUp { attempts, last } => {
                tracing::info!(
                    "spot request '{}' not fulfilled after {} checks (state: {})",
                    request_id,
                    attempts,
                    last.state
                );
                if self.cancel_unfulfilled {
                    tracing::info!("cancelling request '{}'", request_id);
                    driver.cancel_request(request_id)?;
                    self.confirm_cancelled(driver, pause, request_id)?;
                }
                WorkflowOutcome::Unfulfilled {
                    cancelled: self.cancel_unfulfilled,
                }
            }
            PollOutcome::Settled(obs) => match obs.state {
                PollState::Active => {
                    let resource_id = obs.resource_id.ok_or_else(|| Error::MissingResource {
                        request_id: request_id.to_string(),
                    })?;
                    tracing::info!(
                        "spot request '{}' fulfilled by '{}'",
                        request_id,
                        resource_id
                    );
                    self.clean_up(driver, pause, request_id, &resource_id)?;
                    WorkflowOutcome::Fulfilled { resource_id }
                }
                PollState::Failed => {
                    tracing::info!(
                        "spot request '{}' failed: {}",
                        request_id,
                        obs.message.as_deref().unwrap_or("no status message")
                    );
                    WorkflowOutcome::Failed {
                        message: obs.message,
                    }
                }
                PollState::Cancelled => {
                    tracing::info!("spot request '{}' was cancelled", request_id);
                    WorkflowOutcome::Cancelled
                }
                PollState::Pending => {
                    return Err(Error::Consistency {
                        request_id: request_id.to_string(),
                        expected: PollState::Active,
                        observed: PollState::Pending,
                    })
                }
            },
        };

        tracing::info!("done with spot request '{}'", request_id);
        Ok(WorkflowReport {
            request_id: request_id.to_string(),
            outcome,
        })
    }

    fn clean_up<D, P>(&self, driver: &mut D, pause: &P, request_id: &str, resource_id: &str) -> Result<()>
    where
        D: SpotDriver + ?Sized,
        P: Pause + ?Sized,
    {
        if !self.tags.is_empty() {
            tracing::info!("tagging '{}'", resource_id);
            driver.tag_resource(resource_id, &self.tags)?;
        }
        tracing::info!("cancelling fulfilled request '{}'", request_id);
        driver.cancel_request(request_id)?;
        if self.teardown {
            tracing::info!("destroying '{}'", resource_id);
            driver.destroy_resource(resource_id)?;
        }
        if !self.retag.is_empty() {
            tracing::info!("re-tagging '{}'", resource_id);
            driver.tag_resource(resource_id, &self.retag)?;
        }
        self.confirm_cancelled(driver, pause, request_id)
    }

    /// Wait out `pending`/`active` and require `cancelled` at the end.
    fn confirm_cancelled<D, P>(&self, driver: &mut D, pause: &P, request_id: &str) -> Result<()>
    where
        D: SpotDriver + ?Sized,
        P: Pause + ?Sized,
    {
        let outcome = self.confirm.poll_while(
            pause,
            |state| matches!(state, PollState::Pending | PollState::Active),
            || driver.describe_request(request_id),
        )?;
        match outcome.state() {
            PollState::Cancelled => {
                tracing::info!("spot request '{}' cancelled", request_id);
                Ok(())
            }
            observed => Err(Error::Consistency {
                request_id: request_id.to_string(),
                expected: PollState::Cancelled,
                observed,
            }),
        }
    }
}

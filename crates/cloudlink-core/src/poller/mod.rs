//! Polling of asynchronously fulfilled provider requests.
//!
//! A provider that only *accepts* a request (a spot-priced instance, say)
//! reports progress through a status query. [`Poller`] repeats that query
//! until the state is terminal or its bound runs out; [`SpotWorkflow`] drives
//! the full request lifecycle including cleanup once the resource is live.

mod run;
mod state;
mod workflow;

pub use run::{PollOutcome, Poller};
pub use state::{Observation, PollState};
pub use workflow::{SpotDriver, SpotWorkflow, Tags, WorkflowOutcome, WorkflowReport};

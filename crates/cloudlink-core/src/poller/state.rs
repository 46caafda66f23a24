use std::fmt;

/// Externally reported state of an asynchronous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Accepted but not fulfilled yet. The only initial state.
    Pending,
    /// Fulfilled: the resource is provisioned.
    Active,
    Failed,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollState::Pending)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PollState::Pending => "pending",
            PollState::Active => "active",
            PollState::Failed => "failed",
            PollState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One answer of a status query: the state plus what the caller needs to
/// act on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub state: PollState,
    /// Identifier of the provisioned resource, once there is one.
    pub resource_id: Option<String>,
    /// Provider status message, e.g. `price-too-low`.
    pub message: Option<String>,
}

impl Observation {
    pub fn new(state: PollState) -> Self {
        Self {
            state,
            resource_id: None,
            message: None,
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<PollState> for Observation {
    fn from(state: PollState) -> Self {
        Observation::new(state)
    }
}

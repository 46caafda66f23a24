//! Crate-wide error type.
//!
//! Configuration errors (insecure endpoint, bad proxy URL) surface at
//! construction time. Transport errors are classified for retry; response
//! and workflow errors never are.

use crate::cancel::Cancelled;
use crate::poller::PollState;
use crate::proxy::ProxyError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Plaintext endpoint requested while the config forbids it.
    #[error("non-https connections are not allowed (use secure=true)")]
    InsecureNotAllowed,

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// libcurl failed before a response was received (DNS, connect, TLS, timeout).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// The server answered with a status the retry spec treats as transient
    /// (429/503, or 5xx when listed), and retries ran out.
    #[error("server answered HTTP {status}")]
    Status { status: u32, body: Vec<u8> },

    /// The response builder rejected the raw response.
    #[error("response: {0}")]
    Response(String),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// A remote resource ended up in a state the workflow did not expect.
    #[error("request {request_id}: expected state {expected}, observed {observed}")]
    Consistency {
        request_id: String,
        expected: PollState,
        observed: PollState,
    },

    #[error("request {request_id} is active but reported no resource id")]
    MissingResource { request_id: String },
}

impl Error {
    pub fn response(msg: impl Into<String>) -> Self {
        Error::Response(msg.into())
    }
}

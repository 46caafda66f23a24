//! Retry with exponential backoff.
//!
//! Errors are classified into [`ErrorKind`]s; a [`RetrySpec`] decides which
//! kinds are worth another attempt and how long to wait, bounded by a
//! wall-clock timeout measured from the first attempt. The loop itself is
//! stateless, so one spec can drive any number of concurrent calls.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status, Classify};
pub use policy::{ErrorKind, RetryDecision, RetrySpec};
pub use run::run_with_retry;

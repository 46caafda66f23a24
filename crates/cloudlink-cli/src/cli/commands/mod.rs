//! CLI command handlers, one per file.

mod config;
mod proxy;
mod request;

pub use config::run_config;
pub use proxy::run_proxy;
pub use request::{run_request, RequestArgs};

pub mod config;
pub mod logging;

pub mod cancel;
pub mod connection;
pub mod context;
pub mod error;
pub mod poller;
pub mod proxy;
pub mod retry;

pub use error::{Error, Result};

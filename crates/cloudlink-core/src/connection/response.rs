//! Turning a raw transport response into a domain [`Response`].

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::transport::RawResponse;
use super::Connection;
use crate::context::RequestContext;
use crate::error::{Error, Result};

/// Builds the caller-facing response. Runs once per request, after retries,
/// while the connection's context is still populated. An error here is
/// never retried.
pub type ResponseBuilder = Arc<dyn Fn(&Connection, RawResponse) -> Result<Response> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u32,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Snapshot of the request context the response was built under.
    pub context: RequestContext,
}

impl Response {
    /// The default builder: keeps everything and snapshots the context.
    pub fn from_raw(connection: &Connection, raw: RawResponse) -> Result<Response> {
        Ok(Response {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            context: connection.context().clone(),
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(|e| Error::response(format!("body is not UTF-8: {e}")))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::response(format!("invalid JSON body: {e}")))
    }
}

pub fn default_builder() -> ResponseBuilder {
    Arc::new(Response::from_raw)
}

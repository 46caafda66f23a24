//! The literal network exchange.
//!
//! [`CurlTransport`] drives libcurl: TLS is libcurl's, and when a proxy is
//! configured the request is tunnelled through it with HTTP CONNECT.

use std::str;
use std::time::Duration;

use url::Url;

use super::request::Headers;
use crate::error::Result;
use crate::proxy::ProxyDescriptor;

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: String,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

/// Status, headers and body as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u32,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// First header named `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Performs one attempt of a request. Retries are the caller's business.
pub trait Transport: Send {
    fn perform(&mut self, request: &PreparedRequest) -> Result<RawResponse>;
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub proxy: Option<ProxyDescriptor>,
}

/// libcurl-backed transport. Reuses one easy handle, so libcurl keeps the
/// connection alive between requests to the same endpoint.
pub struct CurlTransport {
    easy: curl::easy::Easy,
    settings: TransportSettings,
}

impl CurlTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            easy: curl::easy::Easy::new(),
            settings,
        }
    }

    fn configure(&mut self, request: &PreparedRequest) -> Result<(), curl::Error> {
        let easy = &mut self.easy;
        easy.reset();
        easy.url(request.url.as_str())?;
        easy.connect_timeout(self.settings.connect_timeout)?;
        easy.timeout(self.settings.request_timeout)?;

        match (request.method.as_str(), &request.body) {
            ("HEAD", _) => easy.nobody(true)?,
            ("GET", None) => easy.get(true)?,
            ("POST", body) => easy.post_fields_copy(body.as_deref().unwrap_or_default())?,
            (method, body) => {
                if let Some(body) = body {
                    easy.post_fields_copy(body)?;
                }
                easy.custom_request(method)?;
            }
        }

        let mut list = curl::easy::List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !request.headers.is_empty() {
            easy.http_headers(list)?;
        }

        match &self.settings.proxy {
            Some(proxy) => {
                easy.proxy(&proxy.endpoint())?;
                if let (Some(user), Some(pass)) = (&proxy.username, &proxy.password) {
                    easy.proxy_username(user)?;
                    easy.proxy_password(pass)?;
                }
                easy.http_proxy_tunnel(true)?;
            }
            // Empty string stops libcurl from reading proxy variables on its own;
            // the environment is only consulted when the connection is built.
            None => easy.proxy("")?,
        }
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn perform(&mut self, request: &PreparedRequest) -> Result<RawResponse> {
        self.configure(request)?;

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = self.easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = self.easy.response_code()?;
        Ok(RawResponse {
            status,
            headers: parse_header_lines(&header_lines),
            body,
        })
    }
}

/// Header lines of the final response only. Every status line starts a new
/// block, which drops the proxy's CONNECT reply and any redirect hops.
pub(crate) fn parse_header_lines(lines: &[String]) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

//! One logical API endpoint.
//!
//! A [`Connection`] enforces the secure-transport policy, resolves an optional
//! proxy, prepares requests (default headers, cache busting, pre-connect
//! hook), retries transient transport failures and builds the response.
//! Its [`RequestContext`] lives for exactly one `request` call.

mod request;
mod response;
mod transport;


pub use request::{cache_busting_token, Headers, Params, Request, CACHE_BUSTING_PARAM};
pub use response::{default_builder, Response, ResponseBuilder};
pub use transport::{CurlTransport, PreparedRequest, RawResponse, Transport, TransportSettings};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::cancel::CancelToken;
use crate::config::ConnectionConfig;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::proxy::{self, ProxyDescriptor};
use crate::retry::{classify_http_status, run_with_retry, ErrorKind, RetrySpec};

/// Transforms params and headers right before sending (e.g. request signing).
pub type PreConnectHook = Arc<dyn Fn(Params, Headers) -> (Params, Headers) + Send + Sync>;

pub struct Connection {
    host: String,
    port: u16,
    secure: bool,
    config: ConnectionConfig,
    retry: RetrySpec,
    proxy: Option<ProxyDescriptor>,
    transport: Box<dyn Transport>,
    response_builder: ResponseBuilder,
    pre_connect_hook: Option<PreConnectHook>,
    context: RequestContext,
    cancel: CancelToken,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("proxy", &self.proxy)
            .field("cache_busting", &self.config.cache_busting)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Clears the connection's context when dropped, so every exit path of
/// `request` (including a panicking builder) leaves it empty.
struct ContextReset<'a>(&'a mut Connection);

impl Drop for ContextReset<'_> {
    fn drop(&mut self) {
        self.0.context.clear();
    }
}

impl Connection {
    /// Build a connection to `host:port`.
    ///
    /// Fails with [`Error::InsecureNotAllowed`] for `secure == false` unless
    /// `config.allow_insecure` is set, and with [`Error::Proxy`] when the
    /// resolved proxy URL is invalid. The proxy URL comes from
    /// `config.proxy_url`, else (with `trust_env`) from the environment,
    /// read once here.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        secure: bool,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        if !secure && !config.allow_insecure {
            return Err(Error::InsecureNotAllowed);
        }

        let proxy_url = if config.trust_env {
            proxy::resolve_from_env(config.proxy_url.as_deref())
        } else {
            config.proxy_url.clone()
        };
        let proxy = proxy_url
            .map(|url| ProxyDescriptor::parse(&url))
            .transpose()?;

        let host = host.into();
        tracing::debug!(
            %host,
            port,
            secure,
            proxy = ?proxy.as_ref().map(ProxyDescriptor::endpoint),
            "connection configured"
        );

        let transport = CurlTransport::new(transport_settings(config, proxy.clone()));
        Ok(Self {
            host,
            port,
            secure,
            retry: config.retry.to_spec(),
            config: config.clone(),
            proxy,
            transport: Box::new(transport),
            response_builder: default_builder(),
            pre_connect_hook: None,
            context: RequestContext::default(),
            cancel: CancelToken::new(),
        })
    }

    /// Replace the transport (e.g. with a test double).
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    pub fn with_response_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&Connection, RawResponse) -> Result<Response> + Send + Sync + 'static,
    {
        self.response_builder = Arc::new(builder);
        self
    }

    pub fn with_pre_connect_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Params, Headers) -> (Params, Headers) + Send + Sync + 'static,
    {
        self.pre_connect_hook = Some(Arc::new(hook));
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Externally visible origin. The port is spelled out only when it is
    /// not the scheme's default.
    pub fn host_url(&self) -> String {
        let (scheme, default_port) = if self.secure {
            ("https", 443)
        } else {
            ("http", 80)
        };
        if self.port == default_port {
            format!("{}://{}", scheme, self.host)
        } else {
            format!("{}://{}:{}", scheme, self.host, self.port)
        }
    }

    pub fn proxy(&self) -> Option<&ProxyDescriptor> {
        self.proxy.as_ref()
    }

    /// Route subsequent requests through `proxy_url`. Rebuilds the curl
    /// transport, replacing any custom transport.
    pub fn set_http_proxy(&mut self, proxy_url: &str) -> Result<()> {
        let proxy = ProxyDescriptor::parse(proxy_url)?;
        tracing::debug!(proxy = %proxy.endpoint(), "proxy reconfigured");
        self.transport = Box::new(CurlTransport::new(transport_settings(
            &self.config,
            Some(proxy.clone()),
        )));
        self.proxy = Some(proxy);
        Ok(())
    }

    pub fn cache_busting(&self) -> bool {
        self.config.cache_busting
    }

    pub fn set_cache_busting(&mut self, enabled: bool) {
        self.config.cache_busting = enabled;
    }

    pub fn retry_spec(&self) -> &RetrySpec {
        &self.retry
    }

    pub fn set_retry_spec(&mut self, spec: RetrySpec) {
        self.retry = spec;
    }

    /// Token that interrupts retry sleeps of this connection when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Store `context` for the next request only.
    pub fn set_context(&mut self, context: RequestContext) {
        self.context = context;
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Perform `request`, retrying transient transport failures and
    /// throttling/5xx statuses the retry spec lists, and build
    /// the response. The context is cleared once, after everything,
    /// whether this returns `Ok` or `Err`.
    pub fn request(&mut self, request: Request) -> Result<Response> {
        let guard = ContextReset(self);
        guard.0.execute(request)
    }

    fn execute(&mut self, request: Request) -> Result<Response> {
        let prepared = self.prepare(request)?;
        tracing::debug!(method = %prepared.method, url = %prepared.url, "sending request");

        let transport = &mut self.transport;
        let retry = &self.retry;
        let raw = run_with_retry(retry, &self.cancel, || {
            let raw = transport.perform(&prepared)?;
            let kind = classify_http_status(raw.status);
            if kind != ErrorKind::Other && retry.is_retryable(kind) {
                return Err(Error::Status {
                    status: raw.status,
                    body: raw.body,
                });
            }
            Ok(raw)
        })?;
        tracing::debug!(status = raw.status, bytes = raw.body.len(), "response received");

        let build = Arc::clone(&self.response_builder);
        build(self, raw)
    }

    /// Default headers, the pre-connect hook, then cache busting (GET only).
    /// The busting token is added after the hook and never passes through it.
    fn prepare(&self, request: Request) -> Result<PreparedRequest> {
        let Request {
            action,
            method,
            mut params,
            mut headers,
            data,
        } = request;

        if !headers.keys().any(|k| k.eq_ignore_ascii_case("User-Agent")) {
            headers.insert("User-Agent".to_string(), self.config.user_agent.clone());
        }

        if let Some(hook) = &self.pre_connect_hook {
            (params, headers) = hook(params, headers);
        }

        if self.config.cache_busting && method == "GET" {
            params = params.with_cache_buster(&cache_busting_token());
        }

        // The action only ever sets path and query; scheme, host and port
        // always come from this connection.
        let mut url = Url::parse(&self.host_url())?;
        let (path, query) = match action.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (action.as_str(), None),
        };
        url.set_path(path);
        url.set_query(query.filter(|q| !q.is_empty()));
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (k, v) in params.iter() {
                query.append_pair(k, v);
            }
        }

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body: data,
        })
    }
}

fn transport_settings(config: &ConnectionConfig, proxy: Option<ProxyDescriptor>) -> TransportSettings {
    TransportSettings {
        connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
        proxy,
    }
}

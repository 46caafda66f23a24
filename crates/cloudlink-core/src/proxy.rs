//! HTTP proxy URL parsing.
//!
//! Accepts `http://[user:pass@]host:port` only. The credential group is
//! atomic: a username without a password (or the reverse) is rejected, as is
//! a URL without an explicit port.

use std::fmt;

/// Environment variables consulted, in order, when no proxy URL is given.
pub const PROXY_ENV_VARS: [&str; 2] = ["http_proxy", "HTTP_PROXY"];

const FORMAT_HINT: &str =
    "proxy_url must be in the following format: http://<proxy host>:<proxy port>";
const INVALID_FORMAT: &str = "URL is in an invalid format";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    #[error("only http proxies are supported (got {scheme:?})")]
    UnsupportedScheme { scheme: String },
    #[error("{0}")]
    Malformed(&'static str),
}

/// Parsed proxy endpoint. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyDescriptor {
    /// Parse `proxy_url` into its components.
    pub fn parse(proxy_url: &str) -> Result<Self, ProxyError> {
        let (scheme, rest) = proxy_url
            .trim()
            .split_once("://")
            .ok_or(ProxyError::Malformed(FORMAT_HINT))?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" {
            return Err(ProxyError::UnsupportedScheme { scheme });
        }

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let (credentials, host_port) = match authority.rsplit_once('@') {
            Some((creds, host_port)) => (Some(creds), host_port),
            None => (None, authority),
        };

        let (host, port) = split_host_port(host_port).ok_or(ProxyError::Malformed(FORMAT_HINT))?;

        let (username, password) = match credentials {
            None => (None, None),
            Some(creds) => match creds.split_once(':') {
                Some((user, pass)) if !user.is_empty() && !pass.is_empty() => {
                    (Some(user.to_string()), Some(pass.to_string()))
                }
                _ => return Err(ProxyError::Malformed(INVALID_FORMAT)),
            },
        };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            username,
            password,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// `scheme://host:port` without credentials, as handed to the transport.
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Serializes back to `http://[user:pass@]host:port`.
impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            write!(f, "{}:{}@", user, pass)?;
        }
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Split `host:port` (or `[v6]:port`). Both parts are required.
fn split_host_port(s: &str) -> Option<(&str, u16)> {
    let (host, port) = if let Some(stripped) = s.strip_prefix('[') {
        let end = stripped.find(']')?;
        let port = stripped[end + 1..].strip_prefix(':')?;
        (&s[..end + 2], port)
    } else {
        let (host, port) = s.rsplit_once(':')?;
        if host.contains(':') {
            return None;
        }
        (host, port)
    };
    if host.is_empty() || host == "[]" {
        return None;
    }
    let port: u16 = port.parse().ok().filter(|p| *p != 0)?;
    Some((host, port))
}

/// Pick the proxy URL for a new connection: an explicit URL always wins,
/// otherwise the first non-empty variable of [`PROXY_ENV_VARS`].
pub fn resolve_proxy_url<F>(explicit: Option<&str>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = explicit.filter(|u| !u.trim().is_empty()) {
        return Some(url.to_string());
    }
    PROXY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|v| !v.trim().is_empty())
}

/// [`resolve_proxy_url`] against the process environment.
pub fn resolve_from_env(explicit: Option<&str>) -> Option<String> {
    resolve_proxy_url(explicit, |name| std::env::var(name).ok())
}

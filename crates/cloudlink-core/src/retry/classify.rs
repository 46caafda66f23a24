//! Map concrete errors onto [`ErrorKind`].

use super::policy::ErrorKind;
use crate::cancel::Cancelled;
use crate::error::Error;

/// Errors that can be classified for retry decisions.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a libcurl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cacert()
    {
        return ErrorKind::Tls;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

impl Classify for curl::Error {
    fn kind(&self) -> ErrorKind {
        classify_curl_error(self)
    }
}

impl Classify for Cancelled {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(e) => classify_curl_error(e),
            Error::Status { status, .. } => classify_http_status(*status),
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(500), ErrorKind::Http5xx(500)));
        assert!(matches!(classify_http_status(502), ErrorKind::Http5xx(502)));
    }

    #[test]
    fn http_4xx_other() {
        assert_eq!(classify_http_status(404), ErrorKind::Other);
    }

    #[test]
    fn curl_codes() {
        // CURLE_COULDNT_RESOLVE_HOST, CURLE_COULDNT_CONNECT, CURLE_OPERATION_TIMEDOUT,
        // CURLE_SSL_CONNECT_ERROR, CURLE_URL_MALFORMAT
        assert_eq!(classify_curl_error(&curl::Error::new(6)), ErrorKind::Connection);
        assert_eq!(classify_curl_error(&curl::Error::new(7)), ErrorKind::Connection);
        assert_eq!(classify_curl_error(&curl::Error::new(28)), ErrorKind::Timeout);
        assert_eq!(classify_curl_error(&curl::Error::new(35)), ErrorKind::Tls);
        assert_eq!(classify_curl_error(&curl::Error::new(3)), ErrorKind::Other);
    }

    #[test]
    fn only_transport_errors_are_transient() {
        assert_eq!(Error::Transport(curl::Error::new(6)).kind(), ErrorKind::Connection);
        assert_eq!(Error::response("bad xml").kind(), ErrorKind::Other);
        assert_eq!(Error::InsecureNotAllowed.kind(), ErrorKind::Other);
        assert_eq!(Error::Cancelled(Cancelled).kind(), ErrorKind::Other);
    }

    #[test]
    fn status_errors_use_the_http_classifier() {
        let throttled = Error::Status {
            status: 429,
            body: Vec::new(),
        };
        assert_eq!(throttled.kind(), ErrorKind::Throttled);
        let bad_gateway = Error::Status {
            status: 502,
            body: Vec::new(),
        };
        assert_eq!(bad_gateway.kind(), ErrorKind::Http5xx(502));
    }
}

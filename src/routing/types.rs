//! Request/response values and error definitions for routing.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use thiserror::Error;

/// What the router sends to a backend.
#[derive(Debug, Clone, Default)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path and query appended to the backend address. Empty means the
    /// backend address itself.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardRequest {
    /// A bodiless GET, mostly for tests and probes.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// What a backend sent back.
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 5xx responses count as backend failures.
    pub fn is_backend_failure(&self) -> bool {
        self.status.as_u16() >= 500
    }
}

/// Transport-level failure reported by a forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("invalid backend uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl ForwardError {
    /// The request itself could not be built; the backend was never involved.
    pub fn is_request_fault(&self) -> bool {
        matches!(self, ForwardError::InvalidUri { .. })
    }
}

/// Why a single attempt against a backend failed.
///
/// Attempt failures are absorbed by the router: they feed the breaker and the
/// metrics registry and are only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error("backend unreachable: {0}")]
    BackendUnreachable(#[source] ForwardError),

    #[error("backend returned {0}")]
    BackendServerError(StatusCode),

    /// Not a backend failure: nothing is recorded for it.
    #[error("request cannot be forwarded: {0}")]
    InvalidRequest(#[source] ForwardError),
}

/// Errors surfaced to the router's caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The service has no configured backends.
    #[error("service '{0}' not found")]
    ServiceNotFound(String),

    /// The request cannot be sent to any backend as given.
    #[error("invalid request for service '{service}': {reason}")]
    InvalidRequest { service: String, reason: String },

    /// Every rotation slot was skipped (open circuit) or failed.
    #[error("all backends unavailable for service '{service}' ({attempted} of {slots} attempted)")]
    AllBackendsUnavailable {
        service: String,
        slots: usize,
        attempted: usize,
    },
}

/// Result type for routing.
pub type RouteResult<T> = Result<T, RouteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_failures() {
        assert!(ForwardResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "").is_backend_failure());
        assert!(ForwardResponse::new(StatusCode::SERVICE_UNAVAILABLE, "").is_backend_failure());
        assert!(!ForwardResponse::new(StatusCode::NOT_FOUND, "").is_backend_failure());
        assert!(!ForwardResponse::new(StatusCode::OK, "").is_backend_failure());
    }

    #[test]
    fn only_uri_errors_are_request_faults() {
        let bad_uri = ForwardError::InvalidUri {
            uri: "http://a:1/hello world".into(),
            reason: "invalid uri character".into(),
        };
        assert!(bad_uri.is_request_fault());
        assert!(!ForwardError::Request("connection refused".into()).is_request_fault());
        assert!(!ForwardError::Timeout(Duration::from_secs(5)).is_request_fault());
    }

    #[test]
    fn error_messages() {
        let err = RouteError::AllBackendsUnavailable {
            service: "users".into(),
            slots: 3,
            attempted: 1,
        };
        assert_eq!(
            err.to_string(),
            "all backends unavailable for service 'users' (1 of 3 attempted)"
        );
        assert_eq!(
            RouteError::ServiceNotFound("billing".into()).to_string(),
            "service 'billing' not found"
        );
    }
}

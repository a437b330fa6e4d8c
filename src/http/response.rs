//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay a backend response to the client (status, end-to-end headers, body)
//! - Map routing errors to HTTP status codes
//!
//! # Design Decisions
//! - Unknown service is 404, unforwardable request is 400, exhausted rotation
//!   is 503
//! - Error bodies are short plain text

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::client::copy_end_to_end;
use crate::routing::{ForwardResponse, RouteError};

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = match &self {
            RouteError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            RouteError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            RouteError::AllBackendsUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.to_string()).into_response()
    }
}

/// Turn a buffered backend response into the client response.
pub fn relay(backend: ForwardResponse) -> Response {
    let mut response = Response::new(Body::from(backend.body));
    *response.status_mut() = backend.status;
    copy_end_to_end(&backend.headers, response.headers_mut());
    response
}

//! The "send this request to this backend" capability.

use std::future::Future;
use std::sync::Arc;

use crate::routing::types::{ForwardError, ForwardRequest, ForwardResponse};

/// Sends a request to one backend and returns its response.
///
/// Implementations report transport problems as [`ForwardError`] and hand
/// back every HTTP response as-is; classification of 5xx and the per-call
/// deadline belong to the router.
pub trait Forwarder: Send + Sync + 'static {
    fn forward(
        &self,
        backend: &str,
        request: &ForwardRequest,
    ) -> impl Future<Output = Result<ForwardResponse, ForwardError>> + Send;
}

impl<F: Forwarder> Forwarder for Arc<F> {
    fn forward(
        &self,
        backend: &str,
        request: &ForwardRequest,
    ) -> impl Future<Output = Result<ForwardResponse, ForwardError>> + Send {
        (**self).forward(backend, request)
    }
}

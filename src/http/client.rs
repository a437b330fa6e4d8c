//! Outbound HTTP client used to reach backends.
//!
//! # Responsibilities
//! - Build the backend URI from its base address and the proxied path
//! - Copy end-to-end headers, drop hop-by-hop ones
//! - Buffer the backend response so the router can classify it
//!
//! # Design Decisions
//! - Pooled hyper-util legacy client, one per process
//! - No deadline here: the router wraps every call in its own timeout

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::GatewayConfig;
use crate::routing::{ForwardError, ForwardRequest, ForwardResponse, Forwarder};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwarder backed by a pooled hyper client.
#[derive(Clone, Debug)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HttpForwarder {
    pub fn new(config: &GatewayConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            max_body_bytes: config.listener.max_body_bytes,
        }
    }
}

impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        backend: &str,
        request: &ForwardRequest,
    ) -> Result<ForwardResponse, ForwardError> {
        let uri = target_uri(backend, &request.path)?;

        let mut builder = Request::builder().method(request.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            copy_end_to_end(&request.headers, headers);
        }
        let outbound = builder
            .body(Body::from(request.body.clone()))
            .map_err(|e| ForwardError::Request(e.to_string()))?;

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| ForwardError::Request(e.to_string()))?;

        let (parts, body): (_, hyper::body::Incoming) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| ForwardError::Body(e.to_string()))?;

        let mut headers = HeaderMap::with_capacity(parts.headers.len());
        copy_end_to_end(&parts.headers, &mut headers);

        Ok(ForwardResponse {
            status: parts.status,
            headers,
            body,
        })
    }
}

/// Join the backend base address and the proxied path.
///
/// An empty path targets the backend address itself.
pub fn target_uri(backend: &str, path: &str) -> Result<Uri, ForwardError> {
    let target = if path.is_empty() {
        backend.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", backend.trim_end_matches('/'), path)
    } else {
        format!("{}/{}", backend.trim_end_matches('/'), path)
    };

    target.parse::<Uri>().map_err(|e| ForwardError::InvalidUri {
        uri: target.clone(),
        reason: e.to_string(),
    })
}

/// Copy every header except hop-by-hop ones.
pub fn copy_end_to_end(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        if !HOP_BY_HOP.contains(name) && name.as_str() != "keep-alive" {
            to.append(name.clone(), value.clone());
        }
    }
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with proxy, metrics and admin handlers
//! - Wire up middleware (tracing, request timeout, request ID)
//! - Hand proxied requests to the routing engine
//! - Serve until the shutdown signal fires

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::http::client::HttpForwarder;
use crate::http::response::relay;
use crate::observability::spawn_event_logger;
use crate::routing::{ForwardRequest, Router as GatewayRouter};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<GatewayRouter<HttpForwarder>>,
    pub max_body_bytes: usize,
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    app: Router,
    router: Arc<GatewayRouter<HttpForwarder>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig) -> Self {
        let router = Arc::new(GatewayRouter::from_config(config, HttpForwarder::new(config)));
        let state = AppState {
            router: router.clone(),
            max_body_bytes: config.listener.max_body_bytes,
        };

        let app = Self::build_router(config, state);
        Self { app, router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/v1/proxy/{service}", any(proxy_handler))
            .route("/v1/proxy/{service}/{*rest}", any(proxy_handler))
            .merge(setup_admin_router())
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The routing engine behind this server.
    pub fn router(&self) -> &Arc<GatewayRouter<HttpForwarder>> {
        &self.router
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_event_logger(self.router.events().subscribe());

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

const PROXY_PREFIX: &str = "/v1/proxy/";

#[derive(Debug, Deserialize)]
struct ProxyPath {
    service: String,
}

/// Path and query to send to the backend, taken from the raw request URI.
///
/// The `/v1/proxy/{service}` prefix is dropped and the remainder is kept
/// exactly as the client encoded it.
fn forward_path(raw_path: &str, query: Option<&str>) -> String {
    let after_prefix = raw_path.strip_prefix(PROXY_PREFIX).unwrap_or_default();
    let mut path = match after_prefix.find('/') {
        Some(at) => after_prefix[at..].to_string(),
        None => String::new(),
    };
    if let Some(query) = query {
        if path.is_empty() {
            path.push('/');
        }
        path.push('?');
        path.push_str(query);
    }
    path
}

/// Main proxy handler.
/// Buffers the request, routes it to a healthy backend and relays the answer.
async fn proxy_handler(
    State(state): State<AppState>,
    Path(target): Path<ProxyPath>,
    request: Request<Body>,
) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let span = tracing::info_span!("proxy", request_id = %request_id, service = %target.service);

    async move {
        let (parts, body) = request.into_parts();
        let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting request body");
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        };

        let path = forward_path(parts.uri.path(), parts.uri.query());

        tracing::debug!(method = %parts.method, path = %path, "Proxying request");

        let forward = ForwardRequest {
            method: parts.method,
            path,
            headers: parts.headers,
            body,
        };

        match state.router.route(&target.service, &forward).await {
            Ok(response) => relay(response),
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}

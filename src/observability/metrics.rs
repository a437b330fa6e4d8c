//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_backend_requests_total` (counter): attempts by backend, outcome
//! - `gateway_route_requests_total` (counter): routed requests by service, result
//! - `gateway_route_duration_seconds` (histogram): time spent in the router
//! - `gateway_skipped_attempts_total` (counter): rotation slots skipped by open breakers
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half_open, 2=open
//!
//! Without an installed recorder every call here is a no-op, which is how the
//! unit tests run.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_backend_request(backend: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "gateway_backend_requests_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_route(service: &str, result: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_route_requests_total",
        "service" => service.to_string(),
        "result" => result
    )
    .increment(1);
    metrics::histogram!(
        "gateway_route_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_skipped_attempt(backend: &str) {
    metrics::counter!(
        "gateway_skipped_attempts_total",
        "backend" => backend.to_string()
    )
    .increment(1);
}

pub fn record_breaker_state(backend: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("gateway_breaker_state", "backend" => backend.to_string()).set(value);
}

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::observability::BackendMetrics;
use crate::resilience::CircuitState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BackendReport {
    pub backend: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
}

/// One line per backend, sorted by address.
pub fn render_metrics(snapshot: &BTreeMap<String, BackendMetrics>) -> String {
    let mut out = String::new();
    for (backend, m) in snapshot {
        out.push_str(&format!(
            "{} -> total={}, success={}, failure={}\n",
            backend, m.total, m.successes, m.failures
        ));
    }
    out
}

pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let report = render_metrics(&state.router.registry().snapshot());
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], report)
}

pub async fn get_backends(State(state): State<AppState>) -> Json<Vec<BackendReport>> {
    let registry = state.router.registry();
    let reports = state
        .router
        .pool()
        .all_backends()
        .into_iter()
        .map(|backend| {
            let health = backend.health();
            let counts = registry.get(backend.address()).unwrap_or_default();
            BackendReport {
                backend: backend.address().to_string(),
                state: health.state,
                consecutive_failures: health.consecutive_failures,
                total: counts.total,
                successes: counts.successes,
                failures: counts.failures,
            }
        })
        .collect();

    Json(reports)
}

pub async fn get_health() -> Json<SystemStatus> {
    Json(SystemStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

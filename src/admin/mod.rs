//! Operator-facing endpoints: plain-text metrics report, backend health and
//! liveness.

pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/admin/backends", get(get_backends))
        .route("/health", get(get_health))
}

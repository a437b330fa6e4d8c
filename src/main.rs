//! Service gateway (v1)
//!
//! Routes `/v1/proxy/{service}/...` to the backends configured for that
//! service, round-robin, skipping backends whose circuit breaker is open and
//! failing over within a single pass over the pool.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ routing::router ──▶ load_balancer (cursor + breakers)
//!                                       │
//!                                       ▼
//!                              http::client ──▶ Backend
//!
//!     Cross-cutting: config, observability (registry, events, metrics),
//!                    resilience (breaker, deadline), lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;

use service_gateway::config::load_config;
use service_gateway::lifecycle::{self, spawn_signal_handler, Shutdown};
use service_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "service-gateway", version)]
#[command(about = "Round-robin HTTP gateway with per-backend circuit breakers", long_about = None)]
struct Cli {
    /// Path to the configuration file (.toml, .yaml or .yml)
    #[arg(short, long, default_value = "gateway.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        backend_timeout_ms = config.timeouts.backend_ms,
        "service-gateway starting"
    );
    for (service, backends) in &config.services {
        tracing::info!(service = %service, backends = ?backends, "Service registered");
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    lifecycle::run(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

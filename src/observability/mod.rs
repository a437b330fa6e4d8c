//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router attempt outcome
//!     → registry.rs (per-backend total/success/failure, snapshot for reports)
//!     → metrics.rs (Prometheus counters/gauges/histograms)
//!
//! Breaker transition
//!     → events.rs (broadcast) → logger task (logging + state gauge)
//! ```
//!
//! # Design Decisions
//! - Structured logging through `tracing`
//! - Request ID flows from the HTTP layer into router spans
//! - Metrics are cheap (sharded map, atomic increments)
//! - State machines publish events instead of logging themselves

pub mod events;
pub mod logging;
pub mod metrics;
pub mod registry;

pub use events::{spawn_event_logger, BreakerEvent, EventBus};
pub use registry::{BackendMetrics, MetricsRegistry};

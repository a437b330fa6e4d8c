//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a backend:
//!     → circuit_breaker.rs (admission check; open circuits are skipped)
//!     → timeouts.rs (enforce the per-backend deadline)
//!     → circuit_breaker.rs (record success/failure, maybe change state)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - Circuit breaker prevents hammering a failing backend
//! - No retries beyond the router's single pass over the pool

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{Admission, BreakerSnapshot, CircuitBreaker, CircuitState, Transition};
pub use timeouts::{with_deadline, DeadlineExceeded};

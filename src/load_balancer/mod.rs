//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Service name resolved
//!     → pool.rs (service group: ordered backends + cursor)
//!     → round_robin.rs (advance cursor; one pass visits each backend once)
//!     → backend.rs (breaker admission, outcome reporting)
//! ```
//!
//! # Design Decisions
//! - Round-robin is the only strategy
//! - One cursor per service, one breaker per distinct backend address
//! - Open breakers are skipped by the router, not filtered here

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::{BackendPool, Rotation, ServiceGroup};
pub use round_robin::RoundRobin;

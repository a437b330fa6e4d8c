//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! (service name, request)
//!     → router.rs (service lookup, rotation, admission, failover)
//!     → forwarder.rs (call one backend)
//!     → Return: first successful response, ServiceNotFound or
//!       AllBackendsUnavailable
//! ```
//!
//! # Design Decisions
//! - Routing table compiled at startup, immutable at runtime
//! - Per-attempt failures never escape the router
//! - The transport is a trait so the router is testable without sockets

pub mod forwarder;
pub mod router;
pub mod types;

pub use forwarder::Forwarder;
pub use router::Router;
pub use types::{
    AttemptFailure, ForwardError, ForwardRequest, ForwardResponse, RouteError, RouteResult,
};

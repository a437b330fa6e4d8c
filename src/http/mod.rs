//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body buffering)
//!     → [routing layer picks a healthy backend]
//!     → client.rs (pooled hyper client, hop-by-hop headers stripped)
//!     → response.rs (relay backend answer or map routing error)
//!     → Send to client
//! ```

pub mod client;
pub mod response;
pub mod server;

pub use client::HttpForwarder;
pub use server::{AppState, HttpServer};

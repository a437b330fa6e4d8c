//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its address
//! - Own the backend's circuit breaker
//!
//! A backend listed under several services is one `Backend`, shared through
//! `Arc`, so its breaker sees the traffic of every service.

use crate::config::BreakerConfig;
use crate::resilience::{Admission, BreakerSnapshot, CircuitBreaker, Transition};

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Backend identity, exactly as configured (e.g. "http://10.0.0.5:9001").
    address: String,
    breaker: CircuitBreaker,
}

impl Backend {
    /// Create a backend with a closed breaker.
    pub fn new(address: impl Into<String>, breaker: &BreakerConfig) -> Self {
        Self {
            address: address.into(),
            breaker: CircuitBreaker::new(breaker),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Admission check through the breaker.
    pub fn try_admit(&self) -> Admission {
        self.breaker.admit(std::time::Instant::now())
    }

    /// Report a successful request.
    pub fn mark_success(&self) -> Option<Transition> {
        self.breaker.record_result(true)
    }

    /// Report a failed request.
    pub fn mark_failure(&self) -> Option<Transition> {
        self.breaker.record_result(false)
    }

    /// Give back an admission that never turned into a request.
    pub fn release(&self) {
        self.breaker.release();
    }

    pub fn health(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }
}

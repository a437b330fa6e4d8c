//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every service has at least one backend, and each backend is an http URL
//! - Validate value ranges (thresholds and timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no services configured")]
    NoServices,

    #[error("service '{0}' has no backends")]
    EmptyService(String),

    #[error("service '{service}' lists backend '{backend}' more than once")]
    DuplicateBackend { service: String, backend: String },

    #[error("service '{service}' has invalid backend '{backend}': {reason}")]
    InvalidBackend {
        service: String,
        backend: String,
        reason: String,
    },

    #[error("invalid {field}: '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    for (service, backends) in &config.services {
        if backends.is_empty() {
            errors.push(ValidationError::EmptyService(service.clone()));
            continue;
        }

        let mut seen = HashSet::new();
        for backend in backends {
            if !seen.insert(backend.as_str()) {
                errors.push(ValidationError::DuplicateBackend {
                    service: service.clone(),
                    backend: backend.clone(),
                });
            }
            if let Err(reason) = check_backend_url(backend) {
                errors.push(ValidationError::InvalidBackend {
                    service: service.clone(),
                    backend: backend.clone(),
                    reason,
                });
            }
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::Zero("breaker.failure_threshold"));
    }
    if config.timeouts.backend_ms == 0 {
        errors.push(ValidationError::Zero("timeouts.backend_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }
    if config.observability.event_buffer == 0 {
        errors.push(ValidationError::Zero("observability.event_buffer"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_backend_url(backend: &str) -> Result<(), String> {
    let url = Url::parse(backend).map_err(|e| e.to_string())?;
    // TLS to backends is not supported.
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

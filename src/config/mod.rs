//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/YAML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → service map handed to the router at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the routing table is never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, ConfigFormat};
pub use schema::{
    BreakerConfig, GatewayConfig, HalfOpenPolicy, ListenerConfig, ObservabilityConfig,
    ServiceMap, TimeoutConfig,
};
pub use validation::ValidationError;

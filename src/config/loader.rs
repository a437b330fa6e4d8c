//! Configuration loading from disk.
//!
//! Two formats are accepted:
//! - TOML, the full [`GatewayConfig`] with a `[services]` table.
//! - YAML, either the full config or a flat `service: [backend, ...]` map.
//!   The flat form only carries the routing table; everything else defaults.

use std::fs;
use std::path::Path;

use crate::config::schema::{GatewayConfig, ServiceMap};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Yaml(serde_yaml::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Toml(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// On-disk format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from the file extension; anything unknown is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Load and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<GatewayConfig, ConfigError> {
    let config = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(ConfigError::Toml)?,
        ConfigFormat::Yaml => parse_yaml(content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_yaml(content: &str) -> Result<GatewayConfig, ConfigError> {
    // Every section of the full config is a mapping, so a document that
    // deserializes as service -> list can only be the flat form.
    if let Ok(services) = serde_yaml::from_str::<ServiceMap>(content) {
        return Ok(GatewayConfig {
            services,
            ..GatewayConfig::default()
        });
    }
    serde_yaml::from_str(content).map_err(ConfigError::Yaml)
}

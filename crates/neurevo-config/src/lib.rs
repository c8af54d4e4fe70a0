// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurevo Configuration System
//!
//! Type-safe configuration for training runs with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//! - Collect-all validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use neurevo_config::{load_config, TrainingConfig};
//!
//! // Load configuration with automatic file discovery and overrides
//! let config: TrainingConfig = load_config(None, None).expect("Failed to load config");
//!
//! println!("Learning rate: {}", config.propagation.learning_rate);
//! println!("Batch size: {}", config.propagation.batch_size);
//! ```
//!
//! `BackPropagationConfig` is constructed once per training call and treated
//! as read-only by the engine afterwards.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    CONFIG_FILE_NAME, CONFIG_PATH_ENV,
};
pub use types::*;
pub use validation::{validate_config, validate_propagation, ConfigValidationError};

/// Re-export for convenience
pub use serde;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_types_compile() {
        let config = TrainingConfig::default();
        assert!(config.propagation.exclude_squash.is_empty());
    }

    #[test]
    fn test_toml_parse_error_maps_to_parse_error() {
        let err: ConfigError = toml::from_str::<TrainingConfig>("[propagation\nlearning_rate = ")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges. All violations are collected and
//! reported together.

use crate::{BackPropagationConfig, ConfigError, ConfigResult, TrainingConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

fn invalid(errors: &mut Vec<ConfigValidationError>, field: &str, reason: &str) {
    errors.push(ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    });
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &TrainingConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    collect_propagation_errors(&config.propagation, &mut errors);
    validate_logging(config, &mut errors);

    report(errors)
}

/// Validate only the credit-assignment section
pub fn validate_propagation(config: &BackPropagationConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();
    collect_propagation_errors(config, &mut errors);
    report(errors)
}

fn report(errors: Vec<ConfigValidationError>) -> ConfigResult<()> {
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

fn collect_propagation_errors(config: &BackPropagationConfig, errors: &mut Vec<ConfigValidationError>) {
    if !(config.learning_rate > 0.0 && config.learning_rate <= 1.0) {
        invalid(errors, "propagation.learning_rate", "must be in (0.0, 1.0]");
    }

    if !config.generations.is_finite() || config.generations < 0.0 {
        invalid(errors, "propagation.generations", "must be a finite value >= 0");
    }

    if !config.plank_constant.is_finite() || config.plank_constant <= 0.0 {
        invalid(errors, "propagation.plank_constant", "must be positive");
    }

    let scales = [
        ("propagation.maximum_bias_adjustment_scale", config.maximum_bias_adjustment_scale),
        ("propagation.maximum_weight_adjustment_scale", config.maximum_weight_adjustment_scale),
        ("propagation.limit_bias_scale", config.limit_bias_scale),
        ("propagation.limit_weight_scale", config.limit_weight_scale),
    ];
    for (field, value) in scales {
        if !value.is_finite() || value <= 0.0 {
            invalid(errors, field, "must be positive");
        } else if value <= config.plank_constant {
            invalid(errors, field, "must be larger than the plank constant");
        }
    }

    if config.batch_size == 0 {
        invalid(errors, "propagation.batch_size", "must be at least 1");
    }

    if config.exclude_squash.iter().any(|name| name.trim().is_empty()) {
        invalid(errors, "propagation.exclude_squash", "names must not be empty");
    }
}

fn validate_logging(config: &TrainingConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.logging.level.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "logging.level".to_string(),
        });
    } else if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        invalid(
            errors,
            "logging.level",
            "must be one of trace, debug, info, warn, error",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrainingConfig::default();
        let result = validate_config(&config);
        if let Err(e) = &result {
            eprintln!("Validation error: {}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_learning_rate() {
        let mut config = TrainingConfig::default();
        config.propagation.learning_rate = 1.5;

        let result = validate_config(&config);
        match result {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("learning_rate"));
                assert!(msg.contains("(0.0, 1.0]"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_all_violations_reported_together() {
        let mut config = TrainingConfig::default();
        config.propagation.batch_size = 0;
        config.propagation.generations = -1.0;
        config.propagation.limit_weight_scale = f64::NAN;

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("batch_size"));
                assert!(msg.contains("generations"));
                assert!(msg.contains("limit_weight_scale"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_scale_must_exceed_plank_constant() {
        let mut config = BackPropagationConfig::default();
        config.plank_constant = 0.5;
        config.maximum_bias_adjustment_scale = 0.25;

        let result = validate_propagation(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = TrainingConfig::default();
        config.logging.level = "WARNING".to_string();

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("logging.level")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}

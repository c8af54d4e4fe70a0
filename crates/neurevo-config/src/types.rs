// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `neurevo.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Smallest magnitude treated as numerically significant.
pub const DEFAULT_PLANK_CONSTANT: f64 = 0.000_000_1;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub propagation: BackPropagationConfig,
    pub training: TrainingLoopConfig,
    pub logging: LoggingConfig,
}

/// Credit-assignment ("propagate") configuration
///
/// Constructed once per training call and read-only thereafter. A higher
/// `generations` value gives more weight to the historical weight/bias than
/// to freshly accumulated evidence, which lowers the effective learning rate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackPropagationConfig {
    /// Fraction of the gap between current and target moved per adjustment
    pub learning_rate: f64,
    /// Inertia toward the stored weight/bias, expressed as phantom samples
    pub generations: f64,
    /// Largest bias step a single adjustment may take
    pub maximum_bias_adjustment_scale: f64,
    /// Largest weight step a single adjustment may take
    pub maximum_weight_adjustment_scale: f64,
    /// Absolute bias magnitude limit
    pub limit_bias_scale: f64,
    /// Absolute weight magnitude limit
    pub limit_weight_scale: f64,
    /// Smallest magnitude treated as non-zero
    pub plank_constant: f64,
    /// Activation names whose neurons are never adjusted
    pub exclude_squash: BTreeSet<String>,
    /// Samples per batch before the batch average weight is recomputed
    pub batch_size: u64,
    /// Visit inward connections in index order instead of a shuffled order
    pub disable_random_samples: bool,
    /// Hard-clamp adjustment steps instead of saturating them exponentially
    pub disable_exponential_clamp: bool,
}

impl Default for BackPropagationConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            generations: 10.0,
            maximum_bias_adjustment_scale: 10.0,
            maximum_weight_adjustment_scale: 10.0,
            limit_bias_scale: 10_000.0,
            limit_weight_scale: 100_000.0,
            plank_constant: DEFAULT_PLANK_CONSTANT,
            exclude_squash: BTreeSet::new(),
            batch_size: 1,
            disable_random_samples: false,
            disable_exponential_clamp: false,
        }
    }
}

impl BackPropagationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_generations(mut self, generations: f64) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_plank_constant(mut self, plank_constant: f64) -> Self {
        self.plank_constant = plank_constant;
        self
    }

    /// Set both per-step adjustment limits
    pub fn with_maximum_adjustment_scale(mut self, bias: f64, weight: f64) -> Self {
        self.maximum_bias_adjustment_scale = bias;
        self.maximum_weight_adjustment_scale = weight;
        self
    }

    /// Set both absolute magnitude limits
    pub fn with_limit_scale(mut self, bias: f64, weight: f64) -> Self {
        self.limit_bias_scale = bias;
        self.limit_weight_scale = weight;
        self
    }

    pub fn with_excluded_squash(mut self, name: impl Into<String>) -> Self {
        self.exclude_squash.insert(name.into());
        self
    }

    pub fn with_random_samples(mut self, enabled: bool) -> Self {
        self.disable_random_samples = !enabled;
        self
    }

    pub fn with_exponential_clamp(mut self, enabled: bool) -> Self {
        self.disable_exponential_clamp = !enabled;
        self
    }

    /// Whether neurons using `squash` must be left untouched
    pub fn is_excluded(&self, squash: &str) -> bool {
        self.exclude_squash.contains(squash)
    }
}

/// Outer training loop settings used by the trainer tool
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingLoopConfig {
    pub epochs: usize,
    /// Fixed RNG seed for reproducible sample shuffling (`None` = entropy)
    pub seed: Option<u64>,
}

impl Default for TrainingLoopConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            seed: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TrainingConfig = toml::from_str(
            r#"
            [propagation]
            learning_rate = 0.5
            exclude_squash = ["IF", "MAXIMUM"]
            "#,
        )
        .unwrap();

        assert_eq!(config.propagation.learning_rate, 0.5);
        assert_eq!(config.propagation.batch_size, 1);
        assert_eq!(config.propagation.plank_constant, DEFAULT_PLANK_CONSTANT);
        assert!(config.propagation.is_excluded("IF"));
        assert!(!config.propagation.is_excluded("TANH"));
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_builder_setters() {
        let config = BackPropagationConfig::new()
            .with_learning_rate(1.0)
            .with_generations(0.0)
            .with_random_samples(false)
            .with_exponential_clamp(false)
            .with_excluded_squash("LOGISTIC");

        assert_eq!(config.learning_rate, 1.0);
        assert_eq!(config.generations, 0.0);
        assert!(config.disable_random_samples);
        assert!(config.disable_exponential_clamp);
        assert!(config.is_excluded("LOGISTIC"));
    }

    #[test]
    fn test_json_roundtrip_of_section() {
        let config = BackPropagationConfig::default().with_batch_size(8);
        let json = serde_json::to_string(&config).unwrap();
        let back: BackPropagationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

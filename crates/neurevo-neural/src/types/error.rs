// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the activation and credit-assignment engine
//!
//! Three categories:
//! - [`StructuralError`]: the graph (or a request against it) is malformed.
//!   Surfaced to the mutation layer; only repaired through `fix()`.
//! - [`NumericError`]: a non-finite value reached a boundary where finiteness
//!   is required. Aborts the current pass.
//! - [`RangeViolation`]: a squash produced a value outside its declared range.

use super::neuron::NeuronKind;

/// Malformed topology or a request that does not fit the topology
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuralError {
    #[error("Duplicate edge: synapse {from} -> {to} already exists")]
    DuplicateEdge { from: usize, to: usize },

    #[error("No synapse {from} -> {to}")]
    MissingEdge { from: usize, to: usize },

    #[error("Invalid neuron index {index} (network has {count} neurons)")]
    InvalidIndex { index: usize, count: usize },

    #[error("Neuron {index} ({squash}) requires {requirement}")]
    MissingRequiredEdge {
        index: usize,
        squash: String,
        requirement: String,
    },

    #[error("Unknown squash: {0}")]
    UnknownSquash(String),

    #[error("Invalid input for neuron {index}: {value}")]
    InvalidInput { index: usize, value: f64 },

    #[error("Input size mismatch: expected at most {expected}, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("Target size mismatch: expected {expected}, got {actual}")]
    TargetSizeMismatch { expected: usize, actual: usize },

    #[error("Neuron {index} read before it was activated in the current pass")]
    NotActivated { index: usize },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Neuron {index} is {kind} and cannot be modified this way")]
    ImmutableNeuron { index: usize, kind: NeuronKind },
}

/// A non-finite value where a finite one is required
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumericError {
    #[error("Non-finite {what}: {value}")]
    NonFinite { what: String, value: f64 },
}

impl NumericError {
    pub fn non_finite(what: impl Into<String>, value: f64) -> Self {
        Self::NonFinite {
            what: what.into(),
            value,
        }
    }
}

/// Squash output outside its declared `[low, high]` interval
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{squash} produced {value} outside [{low}, {high}]{}", context_suffix(.context))]
pub struct RangeViolation {
    pub squash: String,
    pub value: f64,
    pub low: f64,
    pub high: f64,
    pub context: Option<String>,
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" ({})", context),
        None => String::new(),
    }
}

/// Top-level error for neural operations
#[derive(Debug, thiserror::Error)]
pub enum NeuralError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error(transparent)]
    Range(#[from] RangeViolation),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type NeuralResult<T> = Result<T, NeuralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_is_transparent() {
        let err: NeuralError = StructuralError::DuplicateEdge { from: 1, to: 4 }.into();
        assert_eq!(
            err.to_string(),
            "Duplicate edge: synapse 1 -> 4 already exists"
        );
    }

    #[test]
    fn test_range_violation_message() {
        let violation = RangeViolation {
            squash: "LOGISTIC".to_string(),
            value: 1.5,
            low: 0.0,
            high: 1.0,
            context: Some("neuron 7".to_string()),
        };
        assert_eq!(
            violation.to_string(),
            "LOGISTIC produced 1.5 outside [0, 1] (neuron 7)"
        );
    }
}

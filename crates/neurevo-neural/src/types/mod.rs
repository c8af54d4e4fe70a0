// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neural Types Module
//!
//! Neuron and synapse records plus the error taxonomy.

pub mod error;
pub mod neuron;
pub mod synapse;

pub use error::{NeuralError, NeuralResult, NumericError, RangeViolation, StructuralError};
pub use neuron::{Neuron, NeuronKind};
pub use synapse::{Synapse, SynapseTag};

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurevo Neural Engine
//!
//! Activation and credit assignment for evolved network topologies:
//! - **Topology**: ordered neurons and the weighted, tagged, gated synapses
//!   between them
//! - **Squash**: the closed catalog of activation strategies (elementary
//!   functions and aggregates)
//! - **Forward**: one tick of activation, optionally recording learning
//!   traces
//! - **Propagate**: target propagation from the outputs back through the
//!   graph, recording weight and bias evidence
//! - **Accumulator**: turning evidence into adjusted weights and biases
//! - **Network**: the owner of a graph and its state, and the mutation
//!   boundary the evolutionary loop talks to
//!
//! One network is evaluated by one thread at a time; parallel evaluation
//! clones the whole network.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod accumulator;
mod forward;
pub mod network;
pub mod numeric;
pub mod propagate;
pub mod records;
pub mod squash;
pub mod state;
pub mod topology;
pub mod types;

pub use network::Network;
pub use propagate::Propagator;
pub use records::{NetworkRecord, NeuronRecord, SynapseRecord};
pub use squash::{
    unknown_exclusions, ActivationRange, ActivationStrategy, AggregateSquash, ElementarySquash,
    Squash,
};
pub use state::{ConnectionAccumulator, ConnectionTrace, NetworkState, NeuronAccumulator, NeuronState};
pub use topology::{IndexShift, TopologyGraph};
pub use types::{
    NeuralError, NeuralResult, Neuron, NeuronKind, NumericError, RangeViolation, StructuralError,
    Synapse, SynapseTag,
};

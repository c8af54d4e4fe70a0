// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron record owned by the topology graph

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::squash::Squash;

/// Role of a neuron, which also fixes its slot in the index order
///
/// Inputs occupy `[0, input_count)`, outputs the last `output_count` slots,
/// hidden and constant neurons the range in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeuronKind {
    Input,
    Hidden,
    Constant,
    Output,
}

impl NeuronKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeuronKind::Input => "input",
            NeuronKind::Hidden => "hidden",
            NeuronKind::Constant => "constant",
            NeuronKind::Output => "output",
        }
    }

    /// Inputs and constants never receive synapses and are never adjusted
    /// through propagation.
    pub fn is_fixed(&self) -> bool {
        matches!(self, NeuronKind::Input | NeuronKind::Constant)
    }

    /// Hidden and constant neurons live between inputs and outputs
    pub fn is_middle(&self) -> bool {
        matches!(self, NeuronKind::Hidden | NeuronKind::Constant)
    }
}

impl fmt::Display for NeuronKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A neuron in the topology graph
///
/// The neuron's index is its position in [`crate::TopologyGraph::neurons`];
/// the UUID stays stable across renumbering. A `constant` neuron's
/// activation is its bias.
#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    pub uuid: Uuid,
    pub kind: NeuronKind,
    pub bias: f64,
    pub squash: Squash,
    pub tags: Vec<String>,
}

impl Neuron {
    pub fn new(kind: NeuronKind, squash: Squash, bias: f64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            bias,
            squash,
            tags: Vec::new(),
        }
    }

    pub fn input() -> Self {
        Self::new(NeuronKind::Input, Squash::default(), 0.0)
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

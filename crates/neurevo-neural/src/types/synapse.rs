// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synapse record owned by the topology graph

use core::fmt;

use serde::{Deserialize, Serialize};

/// Semantic role of an inward synapse, read only by the IF aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynapseTag {
    Positive,
    Negative,
    Condition,
}

impl SynapseTag {
    pub const ALL: [SynapseTag; 3] = [
        SynapseTag::Condition,
        SynapseTag::Positive,
        SynapseTag::Negative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SynapseTag::Positive => "positive",
            SynapseTag::Negative => "negative",
            SynapseTag::Condition => "condition",
        }
    }
}

impl fmt::Display for SynapseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted directed edge `from -> to`
///
/// At most one synapse exists per ordered pair. `from == to` is a self-loop
/// (recurrent feedback). When `gater` is set, the synapse's gain is the
/// gater neuron's activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Synapse {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
    pub tag: Option<SynapseTag>,
    pub gater: Option<usize>,
}

impl Synapse {
    pub fn new(from: usize, to: usize, weight: f64) -> Self {
        Self {
            from,
            to,
            weight,
            tag: None,
            gater: None,
        }
    }

    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// Forward edges read the source's activation from the current tick;
    /// back edges and self-loops read the previous tick.
    #[inline]
    pub fn is_forward(&self) -> bool {
        self.from < self.to
    }

    #[inline]
    pub fn key(&self) -> (usize, usize) {
        (self.from, self.to)
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Activation Strategies
//!
//! Every neuron computes its activation through one [`ActivationStrategy`]:
//! either an elementary function applied to the weighted sum of its inputs,
//! or an aggregate (SUM, MEAN, MAXIMUM, MINIMUM, HYPOT, HYPOTv2, IF) that
//! combines the individual weighted inputs.
//!
//! The set of strategies is closed: [`Squash`] names one of them and hands
//! out the strategy through [`Squash::strategy`]. Each strategy implements
//! the whole contract, so the forward and propagate passes never need to
//! special-case a kind.

pub mod aggregate;
pub mod elementary;
pub mod range;

use core::fmt;
use core::str::FromStr;

use neurevo_config::BackPropagationConfig;
use rand::RngCore;

use crate::numeric::stabilize;
use crate::propagate::Propagator;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NumericError, StructuralError, SynapseTag};

pub use aggregate::AggregateSquash;
pub use elementary::ElementarySquash;
pub use range::ActivationRange;

/// One weighted input as seen by a strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inflow {
    pub from: usize,
    pub weight: f64,
    pub activation: f64,
    /// 1 unless gated, else the gater's activation
    pub gain: f64,
    pub tag: Option<SynapseTag>,
}

impl Inflow {
    /// `weight · activation · gain`
    #[inline]
    pub fn value(&self) -> f64 {
        stabilize(self.weight * self.activation * self.gain)
    }
}

/// Everything a strategy may read to compute one neuron's activation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stimulus {
    pub index: usize,
    pub bias: f64,
    pub inflows: Vec<Inflow>,
}

impl Stimulus {
    /// Σ `weight · activation · gain` over all inflows (bias excluded)
    pub fn weighted_sum(&self) -> f64 {
        stabilize(self.inflows.iter().map(Inflow::value).sum())
    }
}

/// Result of a traced activation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Activation {
    pub value: f64,
    /// Pre-squash value (elementary) or raw aggregate before bias
    pub state: f64,
    /// `d value / d state` for elementary strategies, 1 for aggregates
    pub derivative: f64,
    /// Source index of the extremal inflow (MAXIMUM / MINIMUM)
    pub selected: Option<usize>,
    /// Branch taken by IF
    pub branch: Option<SynapseTag>,
}

impl Activation {
    pub fn plain(value: f64, state: f64) -> Self {
        Self {
            value,
            state,
            derivative: 1.0,
            selected: None,
            branch: None,
        }
    }
}

/// Capability contract of an activation kind
pub trait ActivationStrategy: Send + Sync {
    /// Unique catalog name
    fn name(&self) -> &'static str;

    /// Legal output interval
    fn range(&self) -> ActivationRange;

    /// Whether the neuron's bias takes part in the activation
    fn uses_bias(&self) -> bool;

    /// Pure activation from the current stimulus
    fn activate(&self, stimulus: &Stimulus) -> f64;

    /// Same value as [`ActivationStrategy::activate`] plus the trace fields
    /// propagation reads later
    fn activate_and_trace(&self, stimulus: &Stimulus) -> Activation;

    /// Best-effort inverse from activation to pre-activation value.
    ///
    /// `hint` picks the branch (by sign) when the function is not injective.
    fn inverse(&self, activation: f64, hint: Option<f64>) -> Result<f64, NumericError>;

    /// Credit assignment for one neuron toward `target`; returns the
    /// activation actually achievable with the adjusted weights and bias.
    fn propagate(&self, pass: &mut Propagator<'_>, index: usize, target: f64)
        -> NeuralResult<f64>;

    /// Check the inward edges this strategy needs
    fn validate(&self, graph: &TopologyGraph, index: usize) -> Result<(), StructuralError>;

    /// Repair missing inward edges by requesting random connections.
    /// Returns whether the graph changed.
    fn fix(&self, graph: &mut TopologyGraph, index: usize, rng: &mut dyn RngCore)
        -> NeuralResult<bool>;
}

/// Name of one catalog strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Squash {
    Elementary(ElementarySquash),
    Aggregate(AggregateSquash),
}

impl Default for Squash {
    fn default() -> Self {
        Squash::Elementary(ElementarySquash::Identity)
    }
}

impl Squash {
    /// Every built-in strategy
    pub fn all() -> impl Iterator<Item = Squash> {
        ElementarySquash::ALL
            .iter()
            .copied()
            .map(Squash::Elementary)
            .chain(AggregateSquash::ALL.iter().copied().map(Squash::Aggregate))
    }

    pub fn from_name(name: &str) -> Result<Self, StructuralError> {
        if let Some(squash) = ElementarySquash::from_name(name) {
            return Ok(Squash::Elementary(squash));
        }
        if let Some(squash) = AggregateSquash::from_name(name) {
            return Ok(Squash::Aggregate(squash));
        }
        Err(StructuralError::UnknownSquash(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.strategy().name()
    }

    pub fn strategy(&self) -> &dyn ActivationStrategy {
        match self {
            Squash::Elementary(squash) => squash,
            Squash::Aggregate(squash) => squash.strategy(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Squash::Aggregate(_))
    }
}

impl FromStr for Squash {
    type Err = StructuralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Squash::from_name(s)
    }
}

impl fmt::Display for Squash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Excluded squash names that match no catalog strategy
pub fn unknown_exclusions(config: &BackPropagationConfig) -> Vec<&str> {
    config
        .exclude_squash
        .iter()
        .map(String::as_str)
        .filter(|name| Squash::from_name(name).is_err())
        .collect()
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! MAXIMUM and MINIMUM
//!
//! The activation is the extremal weighted input plus bias. Credit goes
//! entirely through the extremal synapse (picked again from the adjusted
//! values, first one on ties); the other synapses only refresh their
//! evidence.

use rand::RngCore;

use crate::numeric::stabilize;
use crate::propagate::Propagator;
use crate::squash::{Activation, Inflow};
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NumericError, StructuralError};

use super::{
    ensure_inward, identity_inverse, require_inward, ActivationRange, ActivationStrategy, Stimulus,
};

pub(super) struct Extremum {
    maximum: bool,
}

pub(super) static MAXIMUM: Extremum = Extremum { maximum: true };
pub(super) static MINIMUM: Extremum = Extremum { maximum: false };

impl Extremum {
    /// Whether `candidate` strictly beats `best`
    fn beats(&self, candidate: f64, best: f64) -> bool {
        if self.maximum {
            candidate > best
        } else {
            candidate < best
        }
    }

    /// Position and value of the extremal entry, first one on ties
    fn select(&self, values: impl IntoIterator<Item = f64>) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (position, value) in values.into_iter().enumerate() {
            match best {
                Some((_, current)) if !self.beats(value, current) => {}
                _ => best = Some((position, value)),
            }
        }
        best
    }
}

impl ActivationStrategy for Extremum {
    fn name(&self) -> &'static str {
        if self.maximum {
            "MAXIMUM"
        } else {
            "MINIMUM"
        }
    }

    fn range(&self) -> ActivationRange {
        ActivationRange::unbounded(self.name())
    }

    fn uses_bias(&self) -> bool {
        true
    }

    fn activate(&self, stimulus: &Stimulus) -> f64 {
        self.activate_and_trace(stimulus).value
    }

    fn activate_and_trace(&self, stimulus: &Stimulus) -> Activation {
        let selected = self.select(stimulus.inflows.iter().map(Inflow::value));
        let state = selected.map_or(0.0, |(_, value)| value);
        Activation {
            value: stabilize(state + stimulus.bias),
            state,
            derivative: 1.0,
            selected: selected.map(|(position, _)| stimulus.inflows[position].from),
            branch: None,
        }
    }

    fn inverse(&self, activation: f64, _hint: Option<f64>) -> Result<f64, NumericError> {
        identity_inverse(self.name(), activation)
    }

    fn propagate(
        &self,
        pass: &mut Propagator<'_>,
        index: usize,
        target: f64,
    ) -> NeuralResult<f64> {
        let activation = pass.adjusted_activation(index)?;
        let bias = pass.adjusted_bias(index)?;
        pass.state_mut().neuron_mut(index).error_responsibility = stabilize(target - activation);

        let graph = pass.graph();
        let inward: Vec<_> = graph.inward(index).collect();
        let mut current = Vec::with_capacity(inward.len());
        for synapse in &inward {
            current.push(pass.link_value(synapse)?);
        }
        let Some((selected, _)) = self.select(current.iter().copied()) else {
            return Ok(activation);
        };
        let selected_from = inward[selected].from;
        let link_target = stabilize(target - bias);

        let mut achieved = Vec::with_capacity(inward.len());
        for synapse in pass.visiting_order(index) {
            let value = if synapse.from == selected_from {
                pass.propagate_link(synapse, link_target)?
            } else {
                pass.refresh_link(synapse)?
            };
            achieved.push(value);
        }
        let extremum = self
            .select(achieved)
            .map_or(0.0, |(_, value)| value);

        pass.accumulate_bias(index, stabilize(target - extremum))?;
        let bias = pass.adjusted_bias(index)?;
        Ok(stabilize(extremum + bias))
    }

    fn validate(&self, graph: &TopologyGraph, index: usize) -> Result<(), StructuralError> {
        require_inward(graph, index, self.name())
    }

    fn fix(
        &self,
        graph: &mut TopologyGraph,
        index: usize,
        rng: &mut dyn RngCore,
    ) -> NeuralResult<bool> {
        ensure_inward(graph, index, self.name(), rng)
    }
}

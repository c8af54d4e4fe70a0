// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Credit Assignment ("propagate")
//!
//! Given a target activation for a neuron, [`Propagator::propagate`] works
//! out target activations for its predecessors, recurses into them, records
//! weight and bias evidence on the way and returns the activation actually
//! achievable with the adjusted weights and bias.
//!
//! 1. The neuron's *adjusted* activation (computed from adjusted upstream
//!    weights, biases and activations; cached until invalidated) is the
//!    starting point.
//! 2. Excluded squashes and negligible errors take the no-change path:
//!    predecessors are refreshed with their own activation as target, the
//!    bias gets zero-delta evidence, the target is returned as is.
//! 3. Otherwise the neuron's strategy assigns the credit (the generic
//!    weighted-sum rule for elementary squashes, bespoke rules for
//!    aggregates).
//! 4. A result that moved by more than the plank constant is recorded in
//!    the neuron's activation bounds and drops its cached adjusted
//!    activation; anything smaller returns the original activation.
//!
//! Each neuron is propagated into at most once per pass. The first visit
//! settles its activation; later callers reuse the settled value without
//! recursing again, so every connection records at most one weight sample
//! per pass however many paths lead through it.
//!
//! Recursion only follows forward synapses, so it terminates on cyclic
//! graphs. Back synapses and self-loops contribute their previous-tick value.

pub mod weighted_sum;

use neurevo_config::BackPropagationConfig;
use rand::seq::SliceRandom;
use rand::RngCore;
use tracing::trace;

use crate::accumulator;
use crate::numeric::stabilize;
use crate::squash::{Inflow, Stimulus};
use crate::state::NetworkState;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, RangeViolation, Synapse};

/// One credit-assignment pass over a graph and its state
pub struct Propagator<'a> {
    graph: &'a TopologyGraph,
    state: &'a mut NetworkState,
    config: &'a BackPropagationConfig,
    rng: &'a mut dyn RngCore,
}

impl<'a> Propagator<'a> {
    pub fn new(
        graph: &'a TopologyGraph,
        state: &'a mut NetworkState,
        config: &'a BackPropagationConfig,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            graph,
            state,
            config,
            rng,
        }
    }

    pub fn graph(&self) -> &'a TopologyGraph {
        self.graph
    }

    pub fn config(&self) -> &'a BackPropagationConfig {
        self.config
    }

    pub fn state(&self) -> &NetworkState {
        &*self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut NetworkState {
        &mut *self.state
    }

    pub fn plank(&self) -> f64 {
        self.config.plank_constant
    }

    /// Propagate `target` into neuron `index`; returns the achieved activation
    ///
    /// A neuron already settled in this pass returns its settled activation
    /// and ignores `target`.
    pub fn propagate(&mut self, index: usize, target: f64) -> NeuralResult<f64> {
        let graph = self.graph;
        let neuron = graph.neuron(index)?;
        if neuron.kind.is_fixed() {
            return self.adjusted_activation(index);
        }
        if let Some(settled) = self.state.neuron(index).and_then(|n| n.settled) {
            return Ok(settled);
        }
        let achieved = self.settle(index, target)?;
        self.state.neuron_mut(index).settled = Some(achieved);
        Ok(achieved)
    }

    fn settle(&mut self, index: usize, target: f64) -> NeuralResult<f64> {
        let graph = self.graph;
        let neuron = graph.neuron(index)?;

        let strategy = neuron.squash.strategy();
        let target = strategy.range().limit(target);
        let activation = self.adjusted_activation(index)?;

        if self.config.is_excluded(strategy.name()) || (target - activation).abs() < self.plank() {
            self.propagate_unchanged(index)?;
            return Ok(target);
        }

        {
            let neuron_state = self.state.neuron_mut(index);
            neuron_state.no_change = false;
            neuron_state.error_projected = target - activation;
        }

        let achieved = strategy.propagate(self, index, target)?;
        let achieved = strategy
            .range()
            .validate(achieved, None)
            .map_err(|violation| RangeViolation {
                context: Some(format!("propagating into neuron {}", index)),
                ..violation
            })?;

        if (achieved - activation).abs() > self.plank() {
            trace!(index, target, activation, achieved, "propagated");
            self.state.neuron_mut(index).record_bounds(achieved);
            self.state.invalidate_adjusted(index);
            Ok(achieved)
        } else {
            Ok(activation)
        }
    }

    /// Refresh predecessors and bias evidence without perturbing anything
    fn propagate_unchanged(&mut self, index: usize) -> NeuralResult<()> {
        self.state.neuron_mut(index).no_change = true;

        let graph = self.graph;
        for synapse in graph.inward(index) {
            if !synapse.is_forward() || graph.neuron(synapse.from)?.kind.is_fixed() {
                continue;
            }
            let activation = self.adjusted_activation(synapse.from)?;
            self.propagate(synapse.from, activation)?;
        }

        let neuron = graph.neuron(index)?;
        if neuron.squash.strategy().uses_bias() {
            self.accumulate_bias(index, neuron.bias)?;
        }
        Ok(())
    }

    /// Inward synapses of `index`, shuffled unless random samples are disabled
    ///
    /// The permutation is drawn over positions, so every synapse keeps its
    /// own endpoints.
    pub fn visiting_order(&mut self, index: usize) -> Vec<&'a Synapse> {
        let graph = self.graph;
        let inward: Vec<&'a Synapse> = graph.inward(index).collect();
        if self.config.disable_random_samples {
            return inward;
        }
        let mut order: Vec<usize> = (0..inward.len()).collect();
        order.shuffle(&mut *self.rng);
        order.into_iter().map(|position| inward[position]).collect()
    }

    /// Gain of `synapse` as it was during the last forward pass
    pub fn gain(&self, synapse: &Synapse) -> f64 {
        match synapse.gater {
            None => 1.0,
            Some(gater) if gater < synapse.to => self.state.activation(gater),
            Some(gater) => self.state.previous_activation(gater),
        }
    }

    /// Activation `synapse` carries from its source: adjusted for forward
    /// synapses, previous tick for back synapses and self-loops
    pub fn source_activation(&mut self, synapse: &Synapse) -> NeuralResult<f64> {
        if synapse.is_forward() {
            self.adjusted_activation(synapse.from)
        } else {
            Ok(self.state.previous_activation(synapse.from))
        }
    }

    /// Current weighted contribution `adjusted weight · source · gain`
    pub fn link_value(&mut self, synapse: &Synapse) -> NeuralResult<f64> {
        let weight = self.adjusted_weight(synapse)?;
        let activation = self.source_activation(synapse)?;
        Ok(stabilize(weight * activation * self.gain(synapse)))
    }

    /// Ask `synapse` to carry `link_target` and return what it achieves
    ///
    /// The source is asked for `link_target / (weight · gain)` (recursing
    /// only through forward synapses from adjustable neurons). Weight
    /// evidence is recorded, and the contribution counted, only when both
    /// the achieved source signal and the weight exceed the plank constant;
    /// otherwise the link contributes nothing. Self-loops are not
    /// adjustable and return their current contribution.
    pub fn propagate_link(&mut self, synapse: &Synapse, link_target: f64) -> NeuralResult<f64> {
        if synapse.is_self_loop() {
            return self.link_value(synapse);
        }

        let plank = self.plank();
        let weight = self.adjusted_weight(synapse)?;
        let gain = self.gain(synapse);
        let from_activation = self.source_activation(synapse)?;

        let effective = weight * gain;
        let wanted = if effective.abs() > plank {
            stabilize(link_target / effective)
        } else {
            from_activation
        };
        let improved = if synapse.is_forward() {
            self.propagate(synapse.from, wanted)?
        } else {
            from_activation
        };

        let carried = stabilize(improved * gain);
        if carried.abs() <= plank || weight.abs() <= plank {
            return Ok(0.0);
        }

        self.accumulate_weight(synapse, link_target, carried)?;
        let weight = self.adjusted_weight(synapse)?;
        trace!(
            from = synapse.from,
            to = synapse.to,
            link_target,
            weight,
            "link evidence"
        );
        Ok(stabilize(weight * carried))
    }

    /// Split `error` evenly over the inward synapses of `index` and return
    /// the sum of what they achieve
    ///
    /// The divisor is the raw inward count; self-loops take no share and
    /// keep their current contribution.
    pub fn distribute(&mut self, index: usize, error: f64) -> NeuralResult<f64> {
        let links = self.visiting_order(index);
        if links.is_empty() {
            return Ok(0.0);
        }
        let share = error / links.len() as f64;

        let mut achieved = 0.0;
        for synapse in links {
            if synapse.is_self_loop() {
                achieved += self.link_value(synapse)?;
                continue;
            }
            if self.gain(synapse) != 1.0 {
                self.state.neuron_mut(index).error_gated += share;
            }
            let link_target = stabilize(self.link_value(synapse)? + share);
            achieved += self.propagate_link(synapse, link_target)?;
        }
        Ok(stabilize(achieved))
    }

    /// Re-assert the current contribution of `synapse`
    pub fn refresh_link(&mut self, synapse: &Synapse) -> NeuralResult<f64> {
        let current = self.link_value(synapse)?;
        self.propagate_link(synapse, current)
    }

    /// Activation of `index` recomputed from adjusted weights, biases and
    /// upstream activations; cached until invalidated
    pub fn adjusted_activation(&mut self, index: usize) -> NeuralResult<f64> {
        if let Some(value) = self.state.adjusted(index) {
            return Ok(value);
        }

        let graph = self.graph;
        let neuron = graph.neuron(index)?;
        let value = if neuron.kind.is_fixed() {
            self.state.current_activation(index)?
        } else {
            let strategy = neuron.squash.strategy();
            let bias = if strategy.uses_bias() {
                self.adjusted_bias(index)?
            } else {
                neuron.bias
            };

            let mut inflows = Vec::new();
            for synapse in graph.inward(index) {
                inflows.push(Inflow {
                    from: synapse.from,
                    weight: self.adjusted_weight(synapse)?,
                    activation: self.source_activation(synapse)?,
                    gain: self.gain(synapse),
                    tag: synapse.tag,
                });
            }
            let stimulus = Stimulus {
                index,
                bias,
                inflows,
            };
            let value = strategy.activate(&stimulus);
            strategy
                .range()
                .validate(value, None)
                .map_err(|violation| RangeViolation {
                    context: Some(format!("adjusted activation of neuron {}", index)),
                    ..violation
                })?
        };

        self.state.set_adjusted(index, value);
        Ok(value)
    }

    pub fn adjusted_weight(&mut self, synapse: &Synapse) -> NeuralResult<f64> {
        match self
            .state
            .existing_connection_accumulator_mut(synapse.from, synapse.to)
        {
            Some(acc) => Ok(accumulator::adjusted_weight(synapse.weight, acc, self.config)?),
            None => Ok(crate::numeric::require_finite("weight", synapse.weight)?),
        }
    }

    pub fn adjusted_bias(&mut self, index: usize) -> NeuralResult<f64> {
        let bias = self.graph.neuron(index)?.bias;
        Ok(accumulator::adjusted_bias(
            bias,
            self.state.neuron_accumulator(index),
            self.config,
        )?)
    }

    pub fn accumulate_weight(
        &mut self,
        synapse: &Synapse,
        target_value: f64,
        activation: f64,
    ) -> NeuralResult<()> {
        let acc = self
            .state
            .connection_accumulator_mut(synapse.from, synapse.to);
        accumulator::accumulate_weight(synapse.weight, acc, target_value, activation, self.config)?;
        Ok(())
    }

    pub fn accumulate_bias(&mut self, index: usize, target_bias: f64) -> NeuralResult<()> {
        let acc = self.state.neuron_accumulator_mut(index);
        accumulator::accumulate_bias(acc, target_bias, self.config)?;
        Ok(())
    }
}

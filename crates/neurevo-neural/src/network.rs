// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Network
//!
//! Owner of one [`TopologyGraph`] and its [`NetworkState`], and the boundary
//! the evolutionary loop talks to:
//!
//! - forward passes (`activate`, `activate_and_trace`)
//! - credit assignment (`propagate`, one call per output neuron)
//! - the apply step that commits adjusted weights and biases
//! - topology mutations, which keep the state in step with the graph
//!
//! Every mutation goes through here so index renumbering is always reported
//! to the state before it next syncs against the graph version.

use neurevo_config::BackPropagationConfig;
use rand::RngCore;
use tracing::debug;

use crate::accumulator;
use crate::forward;
use crate::numeric::require_finite;
use crate::propagate::Propagator;
use crate::squash::{ElementarySquash, Squash};
use crate::state::NetworkState;
use crate::topology::{IndexShift, TopologyGraph};
use crate::types::{NeuralResult, Neuron, NeuronKind, StructuralError, Synapse, SynapseTag};

#[derive(Debug, Clone)]
pub struct Network {
    graph: TopologyGraph,
    state: NetworkState,
}

impl Network {
    /// Fully disconnected network with IDENTITY outputs
    pub fn new(input_count: usize, output_count: usize) -> Self {
        Self::from_graph(TopologyGraph::new(
            input_count,
            output_count,
            Squash::Elementary(ElementarySquash::Identity),
        ))
    }

    pub fn from_graph(graph: TopologyGraph) -> Self {
        let mut state = NetworkState::new();
        state.sync(&graph);
        Self { graph, state }
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    pub fn input_count(&self) -> usize {
        self.graph.input_count()
    }

    pub fn output_count(&self) -> usize {
        self.graph.output_count()
    }

    // ---------------------------------------------------------------------
    // Passes
    // ---------------------------------------------------------------------

    /// One forward tick; returns the output activations
    pub fn activate(&mut self, inputs: &[f64]) -> NeuralResult<Vec<f64>> {
        forward::activate(&self.graph, &mut self.state, inputs, false)
    }

    /// One forward tick that also records the traces propagation reads
    pub fn activate_and_trace(&mut self, inputs: &[f64]) -> NeuralResult<Vec<f64>> {
        forward::activate(&self.graph, &mut self.state, inputs, true)
    }

    /// Propagate one target per output neuron, in output order
    ///
    /// Returns the activation each output can achieve with the adjusted
    /// weights and biases. Nothing is written to the graph until
    /// [`Network::apply`].
    ///
    /// # Errors
    /// - `TargetSizeMismatch` unless there is exactly one target per output
    /// - `NonFinite` for a non-finite target
    /// - `NotActivated` if no forward pass ran since the last reset
    pub fn propagate(
        &mut self,
        targets: &[f64],
        config: &BackPropagationConfig,
        rng: &mut dyn RngCore,
    ) -> NeuralResult<Vec<f64>> {
        if targets.len() != self.graph.output_count() {
            return Err(StructuralError::TargetSizeMismatch {
                expected: self.graph.output_count(),
                actual: targets.len(),
            }
            .into());
        }
        for (offset, &target) in targets.iter().enumerate() {
            require_finite(&format!("target for output {}", offset), target)?;
        }
        let outputs = self.graph.output_range();
        if self.state.tick() == 0 {
            return Err(StructuralError::NotActivated {
                index: outputs.start,
            }
            .into());
        }

        self.state.sync(&self.graph);
        self.state.begin_propagation();
        let mut pass = Propagator::new(&self.graph, &mut self.state, config, rng);
        let mut achieved = Vec::with_capacity(targets.len());
        for (index, &target) in outputs.zip(targets) {
            achieved.push(pass.propagate(index, target)?);
        }
        Ok(achieved)
    }

    /// Write every adjusted weight and bias back into the graph and start a
    /// new batch
    ///
    /// Returns how many weights and biases changed.
    pub fn apply(&mut self, config: &BackPropagationConfig) -> NeuralResult<usize> {
        self.state.sync(&self.graph);

        let mut weights = Vec::new();
        for synapse in self.graph.synapses() {
            let Some(acc) = self
                .state
                .existing_connection_accumulator_mut(synapse.from, synapse.to)
            else {
                continue;
            };
            let weight = accumulator::adjusted_weight(synapse.weight, acc, config)?;
            if weight != synapse.weight {
                weights.push((synapse.from, synapse.to, weight));
            }
        }

        let mut biases = Vec::new();
        for (index, neuron) in self.graph.neurons().iter().enumerate() {
            if neuron.kind.is_fixed() || !neuron.squash.strategy().uses_bias() {
                continue;
            }
            let bias = accumulator::adjusted_bias(
                neuron.bias,
                self.state.neuron_accumulator(index),
                config,
            )?;
            if bias != neuron.bias {
                biases.push((index, bias));
            }
        }

        for &(from, to, weight) in &weights {
            self.graph.set_weight(from, to, weight)?;
        }
        for &(index, bias) in &biases {
            self.graph.set_bias(index, bias)?;
        }
        self.state.rotate_batch();
        self.state.sync(&self.graph);

        debug!(
            weights = weights.len(),
            biases = biases.len(),
            "applied adjusted weights and biases"
        );
        Ok(weights.len() + biases.len())
    }

    // ---------------------------------------------------------------------
    // Mutation boundary
    // ---------------------------------------------------------------------

    pub fn connect(
        &mut self,
        from: usize,
        to: usize,
        weight: f64,
        tag: Option<SynapseTag>,
    ) -> NeuralResult<()> {
        self.graph.connect(from, to, weight, tag)?;
        self.state.sync(&self.graph);
        Ok(())
    }

    /// Remove `from -> to` with its state; absent edges are a no-op
    pub fn disconnect(&mut self, from: usize, to: usize) -> Option<Synapse> {
        let removed = self.graph.disconnect(from, to);
        self.state.sync(&self.graph);
        removed
    }

    pub fn set_weight(&mut self, from: usize, to: usize, weight: f64) -> NeuralResult<()> {
        self.graph.set_weight(from, to, weight)?;
        self.state.sync(&self.graph);
        Ok(())
    }

    pub fn set_bias(&mut self, index: usize, bias: f64) -> NeuralResult<()> {
        self.graph.set_bias(index, bias)?;
        self.state.sync(&self.graph);
        Ok(())
    }

    pub fn set_squash(&mut self, index: usize, squash: Squash) -> NeuralResult<()> {
        self.graph.set_squash(index, squash)?;
        self.state.sync(&self.graph);
        Ok(())
    }

    pub fn set_gater(&mut self, from: usize, to: usize, gater: Option<usize>) -> NeuralResult<()> {
        self.graph.set_gater(from, to, gater)?;
        self.state.sync(&self.graph);
        Ok(())
    }

    pub fn set_tag(&mut self, from: usize, to: usize, tag: Option<SynapseTag>) -> NeuralResult<()> {
        self.graph.set_tag(from, to, tag)?;
        self.state.sync(&self.graph);
        Ok(())
    }

    /// Insert an unconnected hidden neuron before the outputs; returns its index
    pub fn insert_hidden(&mut self, squash: Squash, bias: f64) -> NeuralResult<usize> {
        self.insert_neuron(Neuron::new(NeuronKind::Hidden, squash, bias))
    }

    /// Insert a hidden or constant neuron before the outputs; returns its index
    pub fn insert_neuron(&mut self, neuron: Neuron) -> NeuralResult<usize> {
        let shift = self.graph.insert_neuron(neuron)?;
        self.renumbered(shift);
        match shift {
            IndexShift::Inserted(index) | IndexShift::Removed(index) => Ok(index),
        }
    }

    /// Remove a hidden or constant neuron and every synapse touching it
    pub fn remove_hidden(&mut self, index: usize) -> NeuralResult<()> {
        let shift = self.graph.remove_neuron(index)?;
        self.renumbered(shift);
        Ok(())
    }

    fn renumbered(&mut self, shift: IndexShift) {
        debug!(?shift, "renumbering network state");
        self.state.renumber(shift);
        self.state.sync(&self.graph);
    }

    // ---------------------------------------------------------------------
    // Maintenance
    // ---------------------------------------------------------------------

    /// Reset activations and traces for a new, independent evaluation
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// Bump the graph version and drop every cache derived from it
    pub fn invalidate(&mut self) {
        self.graph.invalidate();
        self.state.sync(&self.graph);
    }

    /// Run every strategy's repair hook; returns how many neurons changed
    pub fn fix(&mut self, rng: &mut dyn RngCore) -> NeuralResult<usize> {
        let mut repaired = 0;
        for index in 0..self.graph.len() {
            let neuron = self.graph.neuron(index)?;
            if neuron.kind.is_fixed() {
                continue;
            }
            let squash = neuron.squash;
            if squash.strategy().fix(&mut self.graph, index, rng)? {
                repaired += 1;
            }
        }
        if repaired > 0 {
            debug!(repaired, "repaired neurons");
            self.state.sync(&self.graph);
        }
        Ok(repaired)
    }

    /// Structural invariants plus every strategy's required inward synapses
    pub fn validate(&self) -> NeuralResult<()> {
        self.graph.validate()?;
        for (index, neuron) in self.graph.neurons().iter().enumerate() {
            if !neuron.kind.is_fixed() {
                neuron.squash.strategy().validate(&self.graph, index)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squash::AggregateSquash;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_propagate_checks_targets() {
        let mut network = Network::new(2, 2);
        let config = BackPropagationConfig::default();
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            network.propagate(&[1.0], &config, &mut rng),
            Err(crate::NeuralError::Structural(
                StructuralError::TargetSizeMismatch { expected: 2, actual: 1 }
            ))
        ));
        assert!(matches!(
            network.propagate(&[1.0, 2.0], &config, &mut rng),
            Err(crate::NeuralError::Structural(StructuralError::NotActivated { index: 2 }))
        ));

        network.activate(&[0.0, 0.0]).unwrap();
        assert!(matches!(
            network.propagate(&[f64::NAN, 2.0], &config, &mut rng),
            Err(crate::NeuralError::Numeric(_))
        ));
    }

    #[test]
    fn test_insert_and_remove_keep_accumulators_aligned() {
        let mut network = Network::new(1, 1);
        network.connect(0, 1, 0.5, None).unwrap();
        network.activate_and_trace(&[1.0]).unwrap();
        let config = BackPropagationConfig::default().with_random_samples(false);
        let mut rng = StdRng::seed_from_u64(2);
        network.propagate(&[2.0], &config, &mut rng).unwrap();
        assert_eq!(network.state().accumulation_count(0, 1), 1);

        let hidden = network
            .insert_hidden(Squash::Elementary(ElementarySquash::Tanh), 0.0)
            .unwrap();
        assert_eq!(hidden, 1);
        assert_eq!(network.state().accumulation_count(0, 2), 1);
        assert_eq!(network.state().accumulation_count(0, 1), 0);

        network.remove_hidden(hidden).unwrap();
        assert_eq!(network.state().accumulation_count(0, 1), 1);
        assert!(network.remove_hidden(1).is_err());
    }

    #[test]
    fn test_fix_then_validate() {
        let mut network = Network::new(3, 1);
        let max = network
            .insert_hidden(Squash::Aggregate(AggregateSquash::Maximum), 0.0)
            .unwrap();
        network
            .set_squash(4, Squash::Aggregate(AggregateSquash::If))
            .unwrap();
        assert!(network.validate().is_err());

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(network.fix(&mut rng).unwrap(), 2);
        network.validate().unwrap();
        assert!(network.graph().inward_count(max) >= 1);
        assert_eq!(network.fix(&mut rng).unwrap(), 0);
    }

    #[test]
    fn test_apply_commits_and_rotates() {
        let mut network = Network::new(1, 1);
        network.connect(0, 1, 1.0, None).unwrap();
        let config = BackPropagationConfig::default()
            .with_learning_rate(1.0)
            .with_generations(0.0)
            .with_exponential_clamp(false);
        let mut rng = StdRng::seed_from_u64(4);

        network.activate_and_trace(&[2.0]).unwrap();
        network.propagate(&[3.0], &config, &mut rng).unwrap();
        assert_eq!(network.apply(&config).unwrap(), 1);
        assert!((network.graph().synapse(0, 1).unwrap().weight - 1.5).abs() < 1e-12);
        assert_eq!(network.state().accumulation_count(0, 1), 0);
        assert_eq!(network.state().bias_accumulation_count(1), 0);

        let outputs = network.activate(&[2.0]).unwrap();
        assert!((outputs[0] - 3.0).abs() < 1e-12);
    }
}

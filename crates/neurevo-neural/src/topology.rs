// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Topology Graph
//!
//! Ordered neurons (stable integer indices) and the synapses between them.
//!
//! Synapses are stored keyed by `(to, from)` so inward queries are a range
//! scan and come back sorted by source index. Every mutation bumps
//! [`TopologyGraph::version`], which [`crate::NetworkState`] checks to detect
//! stale caches. Mutations that shift indices return an [`IndexShift`]
//! describing the renumbering.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::debug;

use crate::numeric::require_finite;
use crate::squash::Squash;
use crate::types::{
    Neuron, NeuronKind, NeuralResult, StructuralError, Synapse, SynapseTag,
};

/// Index renumbering caused by inserting or removing a neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexShift {
    /// A neuron was inserted at this index; indices `>=` it moved up by one
    Inserted(usize),
    /// The neuron at this index was removed; indices `>` it moved down by one
    Removed(usize),
}

impl IndexShift {
    /// New index of a neuron that had `index` before the shift.
    /// `None` for the removed neuron itself.
    pub fn remap(&self, index: usize) -> Option<usize> {
        match *self {
            IndexShift::Inserted(at) if index >= at => Some(index + 1),
            IndexShift::Inserted(_) => Some(index),
            IndexShift::Removed(at) if index == at => None,
            IndexShift::Removed(at) if index > at => Some(index - 1),
            IndexShift::Removed(_) => Some(index),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopologyGraph {
    neurons: Vec<Neuron>,
    synapses: BTreeMap<(usize, usize), Synapse>,
    input_count: usize,
    output_count: usize,
    version: u64,
}

impl TopologyGraph {
    /// Graph with `input_count` inputs and `output_count` outputs and no synapses
    pub fn new(input_count: usize, output_count: usize, output_squash: Squash) -> Self {
        let mut neurons = Vec::with_capacity(input_count + output_count);
        neurons.extend((0..input_count).map(|_| Neuron::input()));
        neurons.extend(
            (0..output_count).map(|_| Neuron::new(NeuronKind::Output, output_squash, 0.0)),
        );
        Self {
            neurons,
            synapses: BTreeMap::new(),
            input_count,
            output_count,
            version: 0,
        }
    }

    /// Graph from pre-ordered neurons; fails if the ordering invariant is broken
    pub fn from_neurons(neurons: Vec<Neuron>) -> NeuralResult<Self> {
        let input_count = neurons
            .iter()
            .filter(|n| n.kind == NeuronKind::Input)
            .count();
        let output_count = neurons
            .iter()
            .filter(|n| n.kind == NeuronKind::Output)
            .count();
        let graph = Self {
            neurons,
            synapses: BTreeMap::new(),
            input_count,
            output_count,
            version: 0,
        };
        graph.validate_ordering()?;
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Index range occupied by output neurons
    pub fn output_range(&self) -> std::ops::Range<usize> {
        self.neurons.len() - self.output_count..self.neurons.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, index: usize) -> Result<&Neuron, StructuralError> {
        self.neurons.get(index).ok_or(StructuralError::InvalidIndex {
            index,
            count: self.neurons.len(),
        })
    }

    pub fn synapse_count(&self) -> usize {
        self.synapses.len()
    }

    /// All synapses ordered by `(to, from)`
    pub fn synapses(&self) -> impl Iterator<Item = &Synapse> + '_ {
        self.synapses.values()
    }

    pub fn synapse(&self, from: usize, to: usize) -> Option<&Synapse> {
        self.synapses.get(&(to, from))
    }

    /// Synapses ending at `index`, sorted by source index
    pub fn inward(&self, index: usize) -> impl Iterator<Item = &Synapse> + '_ {
        self.synapses.range((index, 0)..=(index, usize::MAX)).map(|(_, s)| s)
    }

    pub fn inward_count(&self, index: usize) -> usize {
        self.inward(index).count()
    }

    /// Synapses starting at `index`
    pub fn outward(&self, index: usize) -> impl Iterator<Item = &Synapse> + '_ {
        self.synapses.values().filter(move |s| s.from == index)
    }

    /// The self-loop `index -> index`, if any
    pub fn self_connection(&self, index: usize) -> Option<&Synapse> {
        self.synapse(index, index)
    }

    /// Synapses whose gain is controlled by `index`
    pub fn gated_by(&self, index: usize) -> impl Iterator<Item = &Synapse> + '_ {
        self.synapses
            .values()
            .filter(move |s| s.gater == Some(index))
    }

    fn check_index(&self, index: usize) -> Result<(), StructuralError> {
        self.neuron(index).map(|_| ())
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    /// Mark every cache derived from this graph as stale
    pub fn invalidate(&mut self) {
        self.touch();
    }

    /// Add a synapse
    ///
    /// # Errors
    /// - `InvalidIndex` if either endpoint is out of range
    /// - `ImmutableNeuron` if the target is an input or constant
    /// - `DuplicateEdge` if `from -> to` already exists
    /// - `NonFinite` if `weight` is not finite
    pub fn connect(
        &mut self,
        from: usize,
        to: usize,
        weight: f64,
        tag: Option<SynapseTag>,
    ) -> NeuralResult<()> {
        self.check_index(from)?;
        let target_kind = self.neuron(to)?.kind;
        if target_kind.is_fixed() {
            return Err(StructuralError::ImmutableNeuron {
                index: to,
                kind: target_kind,
            }
            .into());
        }
        if self.synapses.contains_key(&(to, from)) {
            return Err(StructuralError::DuplicateEdge { from, to }.into());
        }
        require_finite("weight", weight)?;

        let mut synapse = Synapse::new(from, to, weight);
        synapse.tag = tag;
        self.synapses.insert((to, from), synapse);
        self.touch();
        debug!(from, to, weight, "connected");
        Ok(())
    }

    /// Remove `from -> to`; absent edges are a no-op returning `None`
    pub fn disconnect(&mut self, from: usize, to: usize) -> Option<Synapse> {
        let removed = self.synapses.remove(&(to, from));
        if removed.is_some() {
            self.touch();
            debug!(from, to, "disconnected");
        }
        removed
    }

    fn synapse_mut(&mut self, from: usize, to: usize) -> Result<&mut Synapse, StructuralError> {
        self.synapses
            .get_mut(&(to, from))
            .ok_or(StructuralError::MissingEdge { from, to })
    }

    pub fn set_weight(&mut self, from: usize, to: usize, weight: f64) -> NeuralResult<()> {
        require_finite("weight", weight)?;
        self.synapse_mut(from, to)?.weight = weight;
        self.touch();
        Ok(())
    }

    pub fn set_tag(&mut self, from: usize, to: usize, tag: Option<SynapseTag>) -> NeuralResult<()> {
        self.synapse_mut(from, to)?.tag = tag;
        self.touch();
        Ok(())
    }

    pub fn set_gater(&mut self, from: usize, to: usize, gater: Option<usize>) -> NeuralResult<()> {
        if let Some(gater) = gater {
            self.check_index(gater)?;
        }
        self.synapse_mut(from, to)?.gater = gater;
        self.touch();
        Ok(())
    }

    pub fn set_bias(&mut self, index: usize, bias: f64) -> NeuralResult<()> {
        require_finite("bias", bias)?;
        let count = self.neurons.len();
        let neuron = self
            .neurons
            .get_mut(index)
            .ok_or(StructuralError::InvalidIndex { index, count })?;
        if neuron.kind == NeuronKind::Input {
            return Err(StructuralError::ImmutableNeuron {
                index,
                kind: neuron.kind,
            }
            .into());
        }
        neuron.bias = bias;
        self.touch();
        Ok(())
    }

    pub fn set_squash(&mut self, index: usize, squash: Squash) -> NeuralResult<()> {
        let count = self.neurons.len();
        let neuron = self
            .neurons
            .get_mut(index)
            .ok_or(StructuralError::InvalidIndex { index, count })?;
        if neuron.kind.is_fixed() {
            return Err(StructuralError::ImmutableNeuron {
                index,
                kind: neuron.kind,
            }
            .into());
        }
        neuron.squash = squash;
        self.touch();
        Ok(())
    }

    fn renumber(&mut self, shift: IndexShift) {
        let synapses = std::mem::take(&mut self.synapses);
        for (_, mut synapse) in synapses {
            let (Some(from), Some(to)) = (shift.remap(synapse.from), shift.remap(synapse.to))
            else {
                continue;
            };
            synapse.from = from;
            synapse.to = to;
            synapse.gater = synapse.gater.and_then(|g| shift.remap(g));
            self.synapses.insert((to, from), synapse);
        }
    }

    /// Insert a hidden or constant neuron just before the outputs
    ///
    /// Outputs move up by one index; the returned shift says so.
    pub fn insert_neuron(&mut self, neuron: Neuron) -> NeuralResult<IndexShift> {
        if !neuron.kind.is_middle() {
            return Err(StructuralError::InvalidTopology(format!(
                "only hidden or constant neurons can be inserted, got {}",
                neuron.kind
            ))
            .into());
        }
        require_finite("bias", neuron.bias)?;

        let at = self.neurons.len() - self.output_count;
        let shift = IndexShift::Inserted(at);
        self.renumber(shift);
        self.neurons.insert(at, neuron);
        self.touch();
        debug!(index = at, "inserted neuron");
        Ok(shift)
    }

    /// Remove a hidden or constant neuron with all synapses touching it
    ///
    /// Synapses it gated become ungated. Later neurons move down by one.
    pub fn remove_neuron(&mut self, index: usize) -> NeuralResult<IndexShift> {
        let kind = self.neuron(index)?.kind;
        if !kind.is_middle() {
            return Err(StructuralError::ImmutableNeuron { index, kind }.into());
        }

        let shift = IndexShift::Removed(index);
        self.renumber(shift);
        self.neurons.remove(index);
        self.touch();
        debug!(index, "removed neuron");
        Ok(shift)
    }

    /// Connect a randomly chosen, not yet connected source into `to`
    ///
    /// Earlier neurons are preferred so the new edge is feed-forward; later
    /// ones are used only when no earlier candidate is left. Returns the
    /// chosen source.
    pub fn connect_random_source(
        &mut self,
        to: usize,
        tag: Option<SynapseTag>,
        rng: &mut dyn RngCore,
    ) -> NeuralResult<Option<usize>> {
        self.check_index(to)?;
        let unconnected = |from: &usize| *from != to && !self.synapses.contains_key(&(to, *from));

        let mut candidates: Vec<usize> = (0..to).filter(unconnected).collect();
        if candidates.is_empty() {
            candidates = (to + 1..self.neurons.len()).filter(unconnected).collect();
        }
        let Some(&from) = candidates.choose(&mut *rng) else {
            return Ok(None);
        };

        let weight = rng.gen_range(-1.0..1.0);
        self.connect(from, to, weight, tag)?;
        Ok(Some(from))
    }

    fn validate_ordering(&self) -> Result<(), StructuralError> {
        let outputs_start = self.neurons.len() - self.output_count;
        for (index, neuron) in self.neurons.iter().enumerate() {
            let ok = if index < self.input_count {
                neuron.kind == NeuronKind::Input
            } else if index >= outputs_start {
                neuron.kind == NeuronKind::Output
            } else {
                neuron.kind.is_middle()
            };
            if !ok {
                return Err(StructuralError::InvalidTopology(format!(
                    "neuron {} is {} but sits outside its kind's index range",
                    index, neuron.kind
                )));
            }
        }
        Ok(())
    }

    /// Check every structural invariant
    ///
    /// Index ordering by kind, finite biases and weights, endpoints and
    /// gaters in range, and no synapse into an input or constant.
    pub fn validate(&self) -> NeuralResult<()> {
        self.validate_ordering()?;

        for neuron in &self.neurons {
            require_finite("bias", neuron.bias)?;
        }

        for synapse in self.synapses.values() {
            self.check_index(synapse.from)?;
            let kind = self.neuron(synapse.to)?.kind;
            if kind.is_fixed() {
                return Err(StructuralError::ImmutableNeuron {
                    index: synapse.to,
                    kind,
                }
                .into());
            }
            if let Some(gater) = synapse.gater {
                self.check_index(gater)?;
            }
            require_finite("weight", synapse.weight)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squash::{ElementarySquash, Squash};
    use crate::types::NeuralError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn graph() -> TopologyGraph {
        TopologyGraph::new(2, 1, Squash::Elementary(ElementarySquash::Identity))
    }

    fn hidden() -> Neuron {
        Neuron::new(
            NeuronKind::Hidden,
            Squash::Elementary(ElementarySquash::Logistic),
            0.0,
        )
    }

    #[test]
    fn test_new_layout() {
        let g = graph();
        assert_eq!(g.len(), 3);
        assert_eq!(g.output_range(), 2..3);
        assert_eq!(g.neuron(2).unwrap().kind, NeuronKind::Output);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_connect_rejects_duplicate() {
        let mut g = graph();
        g.connect(0, 2, 0.5, None).unwrap();
        let err = g.connect(0, 2, 1.0, None).unwrap_err();
        assert!(matches!(
            err,
            NeuralError::Structural(StructuralError::DuplicateEdge { from: 0, to: 2 })
        ));
    }

    #[test]
    fn test_connect_rejects_input_target() {
        let mut g = graph();
        let err = g.connect(2, 0, 1.0, None).unwrap_err();
        assert!(matches!(
            err,
            NeuralError::Structural(StructuralError::ImmutableNeuron { index: 0, .. })
        ));
    }

    #[test]
    fn test_disconnect_absent_is_noop() {
        let mut g = graph();
        let version = g.version();
        assert!(g.disconnect(1, 2).is_none());
        assert_eq!(g.version(), version);
    }

    #[test]
    fn test_mutations_bump_version() {
        let mut g = graph();
        let v0 = g.version();
        g.connect(0, 2, 0.5, None).unwrap();
        g.set_weight(0, 2, 0.7).unwrap();
        g.set_bias(2, 1.0).unwrap();
        assert_eq!(g.version(), v0 + 3);
    }

    #[test]
    fn test_queries() {
        let mut g = graph();
        g.connect(1, 2, 1.0, None).unwrap();
        g.connect(0, 2, 1.0, None).unwrap();
        g.connect(2, 2, 0.5, None).unwrap();
        g.set_gater(0, 2, Some(1)).unwrap();

        let inward: Vec<usize> = g.inward(2).map(|s| s.from).collect();
        assert_eq!(inward, vec![0, 1, 2]);
        assert_eq!(g.outward(0).count(), 1);
        assert_eq!(g.self_connection(2).map(|s| s.weight), Some(0.5));
        assert_eq!(g.gated_by(1).count(), 1);
    }

    #[test]
    fn test_insert_renumbers_outputs() {
        let mut g = graph();
        g.connect(0, 2, 1.0, None).unwrap();
        g.connect(2, 2, 0.5, None).unwrap();
        g.set_gater(0, 2, Some(2)).unwrap();

        let shift = g.insert_neuron(hidden()).unwrap();
        assert_eq!(shift, IndexShift::Inserted(2));
        assert_eq!(g.neuron(2).unwrap().kind, NeuronKind::Hidden);
        let moved = g.synapse(0, 3).unwrap();
        assert_eq!(moved.gater, Some(3));
        assert!(g.self_connection(3).is_some());
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_remove_drops_synapses_and_gating() {
        let mut g = graph();
        g.insert_neuron(hidden()).unwrap();
        g.connect(0, 2, 1.0, None).unwrap();
        g.connect(2, 3, 1.0, None).unwrap();
        g.connect(1, 3, 1.0, None).unwrap();
        g.set_gater(1, 3, Some(2)).unwrap();

        let shift = g.remove_neuron(2).unwrap();
        assert_eq!(shift, IndexShift::Removed(2));
        assert_eq!(g.len(), 3);
        assert_eq!(g.synapse_count(), 1);
        let survivor = g.synapse(1, 2).unwrap();
        assert_eq!(survivor.gater, None);
    }

    #[test]
    fn test_remove_output_is_rejected() {
        let mut g = graph();
        assert!(g.remove_neuron(2).is_err());
    }

    #[test]
    fn test_from_neurons_checks_ordering() {
        let neurons = vec![
            Neuron::input(),
            Neuron::new(NeuronKind::Output, Squash::default(), 0.0),
            hidden(),
        ];
        assert!(TopologyGraph::from_neurons(neurons).is_err());
    }

    #[test]
    fn test_connect_random_source_prefers_earlier() {
        let mut g = graph();
        g.insert_neuron(hidden()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let from = g
            .connect_random_source(2, Some(SynapseTag::Condition), &mut rng)
            .unwrap()
            .unwrap();
        assert!(from < 2);
        assert_eq!(g.synapse(from, 2).unwrap().tag, Some(SynapseTag::Condition));
    }

    #[test]
    fn test_index_shift_remap() {
        assert_eq!(IndexShift::Inserted(3).remap(2), Some(2));
        assert_eq!(IndexShift::Inserted(3).remap(3), Some(4));
        assert_eq!(IndexShift::Removed(3).remap(3), None);
        assert_eq!(IndexShift::Removed(3).remap(5), Some(4));
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Network State
//!
//! Values that back one graph's forward and propagate passes, in two scopes:
//!
//! - **Ephemeral**: per-neuron activations and error scalars, per-connection
//!   eligibility and extended traces, the adjusted-activation cache. Cleared
//!   by [`NetworkState::clear`] and whenever indices are renumbered.
//! - **Persistent**: per-neuron bias evidence and per-connection weight
//!   evidence accumulated across the samples of one batch. Only
//!   [`NetworkState::rotate_batch`] resets it; renumbering remaps it and drops
//!   the removed neuron's entries.
//!
//! Neuron entries live in dense vectors indexed by neuron index and are
//! created on first access; connection entries live in hash maps keyed by
//! `(from, to)`.

use ahash::AHashMap;

use crate::topology::{IndexShift, TopologyGraph};
use crate::types::{StructuralError, SynapseTag};

/// Ephemeral per-neuron values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeuronState {
    pub activation: f64,
    /// Activation of the previous tick
    pub old: f64,
    /// Pre-squash value
    pub state: f64,
    pub derivative: f64,
    /// Pre-activation error assigned during propagation
    pub error_responsibility: f64,
    /// Activation error assigned during propagation
    pub error_projected: f64,
    /// Share of the error routed through gated inward connections
    pub error_gated: f64,
    /// Propagation found this neuron's error negligible in the current pass
    pub no_change: bool,
    /// Activation the current propagate pass settled on for this neuron
    pub settled: Option<f64>,
    pub selected: Option<usize>,
    pub branch: Option<SynapseTag>,
    pub minimum_activation: Option<f64>,
    pub maximum_activation: Option<f64>,
    /// Tick of the last activation; 0 means never activated
    pub tick: u64,
}

impl NeuronState {
    /// Widen the recorded activation bounds to include `value`
    pub fn record_bounds(&mut self, value: f64) {
        self.minimum_activation = Some(self.minimum_activation.map_or(value, |m| m.min(value)));
        self.maximum_activation = Some(self.maximum_activation.map_or(value, |m| m.max(value)));
    }
}

/// Ephemeral per-connection learning traces
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionTrace {
    pub eligibility: f64,
    pub gain: f64,
    /// Influence toward each neuron whose inputs the target neuron gates
    pub extended: AHashMap<usize, f64>,
}

impl Default for ConnectionTrace {
    fn default() -> Self {
        Self {
            eligibility: 0.0,
            gain: 1.0,
            extended: AHashMap::new(),
        }
    }
}

/// Persistent bias evidence of one neuron
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeuronAccumulator {
    pub total_bias: f64,
    pub count: u64,
}

/// Cached batch-average weight and the sample count it was computed at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchAverage {
    pub weight: f64,
    pub count: u64,
}

/// Persistent weight evidence of one connection, bucketed by activation sign
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConnectionAccumulator {
    pub positive_value: f64,
    pub positive_activation: f64,
    pub positive_count: u64,
    pub negative_value: f64,
    pub negative_activation: f64,
    pub negative_count: u64,
    pub batch: Option<BatchAverage>,
}

impl ConnectionAccumulator {
    pub fn count(&self) -> u64 {
        self.positive_count + self.negative_count
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkState {
    version: Option<u64>,
    tick: u64,
    neurons: Vec<Option<NeuronState>>,
    traces: AHashMap<(usize, usize), ConnectionTrace>,
    adjusted: Vec<Option<f64>>,
    neuron_accumulators: Vec<Option<NeuronAccumulator>>,
    connection_accumulators: AHashMap<(usize, usize), ConnectionAccumulator>,
}

fn slot<T>(entries: &mut Vec<Option<T>>, index: usize) -> &mut Option<T> {
    if entries.len() <= index {
        entries.resize_with(index + 1, || None);
    }
    &mut entries[index]
}

fn remap_dense<T>(entries: Vec<Option<T>>, shift: IndexShift) -> Vec<Option<T>> {
    let mut remapped = Vec::with_capacity(entries.len() + 1);
    for (index, entry) in entries.into_iter().enumerate() {
        if let Some(new_index) = shift.remap(index) {
            *slot(&mut remapped, new_index) = entry;
        }
    }
    remapped
}

impl NetworkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything that went stale since the graph version last seen
    ///
    /// Caches are cleared and entries of connections that no longer exist
    /// are dropped. Index renumbering must be reported through
    /// [`NetworkState::renumber`] before syncing.
    pub fn sync(&mut self, graph: &TopologyGraph) {
        if self.version == Some(graph.version()) {
            return;
        }
        let count = graph.len();
        self.neurons.truncate(count);
        self.neuron_accumulators.truncate(count);
        self.adjusted.clear();
        self.traces
            .retain(|&(from, to), _| graph.synapse(from, to).is_some());
        self.connection_accumulators
            .retain(|&(from, to), _| graph.synapse(from, to).is_some());
        self.version = Some(graph.version());
    }

    /// Follow an index shift: ephemeral state is cleared, persistent
    /// accumulators move with their neurons and the removed neuron's go away
    pub fn renumber(&mut self, shift: IndexShift) {
        self.clear();

        let accumulators = std::mem::take(&mut self.neuron_accumulators);
        self.neuron_accumulators = remap_dense(accumulators, shift);

        let connections = std::mem::take(&mut self.connection_accumulators);
        self.connection_accumulators = connections
            .into_iter()
            .filter_map(|((from, to), acc)| Some(((shift.remap(from)?, shift.remap(to)?), acc)))
            .collect();
        self.version = None;
    }

    /// Reset all ephemeral values (a new, independent evaluation)
    pub fn clear(&mut self) {
        self.tick = 0;
        self.neurons.clear();
        self.traces.clear();
        self.adjusted.clear();
    }

    /// Reset the persistent accumulators (next batch)
    pub fn rotate_batch(&mut self) {
        self.neuron_accumulators.clear();
        self.connection_accumulators.clear();
        self.adjusted.clear();
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Start a new forward pass
    pub(crate) fn begin_tick(&mut self) -> u64 {
        self.tick += 1;
        self.adjusted.clear();
        self.tick
    }

    /// Start a new propagate call; per-pass memo flags are reset
    pub(crate) fn begin_propagation(&mut self) {
        for neuron in self.neurons.iter_mut().flatten() {
            neuron.no_change = false;
            neuron.settled = None;
            neuron.error_responsibility = 0.0;
            neuron.error_projected = 0.0;
            neuron.error_gated = 0.0;
        }
    }

    pub fn neuron(&self, index: usize) -> Option<&NeuronState> {
        self.neurons.get(index).and_then(Option::as_ref)
    }

    /// Get-or-create the ephemeral state of `index`
    pub fn neuron_mut(&mut self, index: usize) -> &mut NeuronState {
        slot(&mut self.neurons, index).get_or_insert_with(NeuronState::default)
    }

    /// Current activation, 0 if never activated
    pub fn activation(&self, index: usize) -> f64 {
        self.neuron(index).map_or(0.0, |n| n.activation)
    }

    /// Activation of the tick before the current one
    pub fn previous_activation(&self, index: usize) -> f64 {
        self.neuron(index).map_or(0.0, |n| n.old)
    }

    pub fn is_activated(&self, index: usize) -> bool {
        self.tick > 0 && self.neuron(index).is_some_and(|n| n.tick == self.tick)
    }

    /// Activation of `index` in the current tick, failing if it was not
    /// activated yet
    pub fn current_activation(&self, index: usize) -> Result<f64, StructuralError> {
        if self.is_activated(index) {
            Ok(self.activation(index))
        } else {
            Err(StructuralError::NotActivated { index })
        }
    }

    pub fn trace(&self, from: usize, to: usize) -> Option<&ConnectionTrace> {
        self.traces.get(&(from, to))
    }

    pub(crate) fn trace_mut(&mut self, from: usize, to: usize) -> &mut ConnectionTrace {
        self.traces.entry((from, to)).or_default()
    }

    pub(crate) fn adjusted(&self, index: usize) -> Option<f64> {
        self.adjusted.get(index).copied().flatten()
    }

    pub(crate) fn set_adjusted(&mut self, index: usize, value: f64) {
        *slot(&mut self.adjusted, index) = Some(value);
    }

    pub(crate) fn invalidate_adjusted(&mut self, index: usize) {
        if let Some(entry) = self.adjusted.get_mut(index) {
            *entry = None;
        }
    }

    /// Drop the whole adjusted-activation cache
    pub fn invalidate(&mut self) {
        self.adjusted.clear();
    }

    pub fn neuron_accumulator(&self, index: usize) -> Option<&NeuronAccumulator> {
        self.neuron_accumulators.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn neuron_accumulator_mut(&mut self, index: usize) -> &mut NeuronAccumulator {
        slot(&mut self.neuron_accumulators, index).get_or_insert_with(NeuronAccumulator::default)
    }

    pub fn connection_accumulator(&self, from: usize, to: usize) -> Option<&ConnectionAccumulator> {
        self.connection_accumulators.get(&(from, to))
    }

    pub(crate) fn existing_connection_accumulator_mut(
        &mut self,
        from: usize,
        to: usize,
    ) -> Option<&mut ConnectionAccumulator> {
        self.connection_accumulators.get_mut(&(from, to))
    }

    pub(crate) fn connection_accumulator_mut(
        &mut self,
        from: usize,
        to: usize,
    ) -> &mut ConnectionAccumulator {
        self.connection_accumulators.entry((from, to)).or_default()
    }

    /// Samples of weight evidence recorded for `from -> to` in this batch
    pub fn accumulation_count(&self, from: usize, to: usize) -> u64 {
        self.connection_accumulator(from, to)
            .map_or(0, ConnectionAccumulator::count)
    }

    /// Samples of bias evidence recorded for `index` in this batch
    pub fn bias_accumulation_count(&self, index: usize) -> u64 {
        self.neuron_accumulator(index).map_or(0, |acc| acc.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squash::Squash;

    #[test]
    fn test_lazy_creation() {
        let mut state = NetworkState::new();
        assert!(state.neuron(5).is_none());
        assert_eq!(state.activation(5), 0.0);
        state.neuron_mut(5).activation = 2.0;
        assert_eq!(state.activation(5), 2.0);
        assert!(state.neuron(4).is_none());
    }

    #[test]
    fn test_not_activated_in_current_tick() {
        let mut state = NetworkState::new();
        let tick = state.begin_tick();
        state.neuron_mut(0).tick = tick;
        assert!(state.current_activation(0).is_ok());
        state.begin_tick();
        assert_eq!(
            state.current_activation(0),
            Err(StructuralError::NotActivated { index: 0 })
        );
    }

    #[test]
    fn test_renumber_moves_accumulators() {
        let mut state = NetworkState::new();
        state.neuron_accumulator_mut(2).count = 3;
        state.neuron_accumulator_mut(4).count = 5;
        state.connection_accumulator_mut(2, 4).positive_count = 1;
        state.connection_accumulator_mut(0, 4).positive_count = 2;
        state.neuron_mut(1).activation = 1.0;

        state.renumber(IndexShift::Removed(2));

        assert!(state.neuron(1).is_none());
        assert_eq!(state.bias_accumulation_count(3), 5);
        assert_eq!(state.bias_accumulation_count(2), 0);
        assert_eq!(state.accumulation_count(0, 3), 2);
        assert_eq!(state.connection_accumulator(2, 3), None);
    }

    #[test]
    fn test_renumber_insert() {
        let mut state = NetworkState::new();
        state.neuron_accumulator_mut(2).count = 1;
        state.connection_accumulator_mut(0, 2).negative_count = 4;

        state.renumber(IndexShift::Inserted(2));

        assert_eq!(state.bias_accumulation_count(3), 1);
        assert_eq!(state.accumulation_count(0, 3), 4);
    }

    #[test]
    fn test_sync_drops_removed_connections() {
        let mut graph = TopologyGraph::new(1, 1, Squash::default());
        graph.connect(0, 1, 1.0, None).unwrap();

        let mut state = NetworkState::new();
        state.sync(&graph);
        state.connection_accumulator_mut(0, 1).positive_count = 1;
        state.trace_mut(0, 1).eligibility = 1.0;

        graph.disconnect(0, 1);
        state.sync(&graph);

        assert_eq!(state.accumulation_count(0, 1), 0);
        assert!(state.trace(0, 1).is_none());
    }

    #[test]
    fn test_rotate_batch_keeps_ephemeral() {
        let mut state = NetworkState::new();
        state.neuron_mut(0).activation = 0.5;
        state.neuron_accumulator_mut(0).count = 1;
        state.rotate_batch();
        assert_eq!(state.activation(0), 0.5);
        assert_eq!(state.bias_accumulation_count(0), 0);
    }

    #[test]
    fn test_record_bounds() {
        let mut neuron = NeuronState::default();
        neuron.record_bounds(0.3);
        neuron.record_bounds(-0.2);
        neuron.record_bounds(0.1);
        assert_eq!(neuron.minimum_activation, Some(-0.2));
        assert_eq!(neuron.maximum_activation, Some(0.3));
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Forward Pass
//!
//! Neurons are evaluated in index order. Forward synapses (`from < to`)
//! read the source's activation from the current tick; back synapses and
//! self-loops read the value of the previous tick, which is what the source
//! still holds when the target is evaluated.
//!
//! The traced variant also keeps, per inward connection:
//!
//! ```text
//! eligibility  e  = selfGain · selfWeight · e_prev + a_from · gain
//! extended     x_k = selfGain_k · selfWeight_k · x_k_prev + derivative · e · influence_k
//! ```
//!
//! where `k` ranges over the neurons whose inputs this neuron gates.

use tracing::trace;

use crate::numeric::stabilize;
use crate::squash::{Activation, Inflow, Stimulus};
use crate::state::NetworkState;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NeuronKind, RangeViolation, StructuralError, Synapse};

/// Gain of `synapse` as seen while its target is being evaluated
fn forward_gain(state: &NetworkState, synapse: &Synapse) -> f64 {
    synapse.gater.map_or(1.0, |gater| state.activation(gater))
}

/// Inputs of `index` as seen while it is being evaluated
pub(crate) fn stimulus(
    graph: &TopologyGraph,
    state: &NetworkState,
    index: usize,
    bias: f64,
) -> NeuralResult<Stimulus> {
    let mut inflows = Vec::new();
    for synapse in graph.inward(index) {
        let activation = if synapse.is_forward() {
            state.current_activation(synapse.from)?
        } else {
            state.activation(synapse.from)
        };
        inflows.push(Inflow {
            from: synapse.from,
            weight: synapse.weight,
            activation,
            gain: forward_gain(state, synapse),
            tag: synapse.tag,
        });
    }
    Ok(Stimulus {
        index,
        bias,
        inflows,
    })
}

/// `gain · weight` of the self-loop of `index`, 0 without one
fn self_factor(graph: &TopologyGraph, state: &NetworkState, index: usize) -> f64 {
    graph
        .self_connection(index)
        .map_or(0.0, |s| forward_gain(state, s) * s.weight)
}

fn update_traces(
    graph: &TopologyGraph,
    state: &mut NetworkState,
    stimulus: &Stimulus,
    derivative: f64,
) {
    let index = stimulus.index;
    let own_factor = self_factor(graph, state, index);

    // Influence of this neuron on each neuron whose inputs it gates
    let mut influences: Vec<(usize, f64, f64)> = Vec::new();
    for gated in graph.gated_by(index) {
        let contribution = if gated.is_self_loop() {
            state.previous_activation(gated.to)
        } else {
            gated.weight * state.activation(gated.from)
        };
        match influences.iter_mut().find(|(k, _, _)| *k == gated.to) {
            Some((_, influence, _)) => *influence += contribution,
            None => influences.push((
                gated.to,
                contribution,
                self_factor(graph, state, gated.to),
            )),
        }
    }

    for inflow in &stimulus.inflows {
        let trace = state.trace_mut(inflow.from, index);
        trace.gain = inflow.gain;
        if inflow.from == index {
            continue;
        }
        trace.eligibility =
            stabilize(own_factor * trace.eligibility + inflow.activation * inflow.gain);
        let eligibility = trace.eligibility;
        for &(gated, influence, gated_factor) in &influences {
            let previous = trace.extended.get(&gated).copied().unwrap_or(0.0);
            trace.extended.insert(
                gated,
                stabilize(gated_factor * previous + derivative * eligibility * influence),
            );
        }
    }
}

/// Evaluate every neuron for one tick and return the output activations
///
/// Missing trailing inputs are 0. Non-finite inputs fail with `InvalidInput`
/// before any state changes.
pub(crate) fn activate(
    graph: &TopologyGraph,
    state: &mut NetworkState,
    inputs: &[f64],
    record_traces: bool,
) -> NeuralResult<Vec<f64>> {
    state.sync(graph);
    if inputs.len() > graph.input_count() {
        return Err(StructuralError::InputSizeMismatch {
            expected: graph.input_count(),
            actual: inputs.len(),
        }
        .into());
    }
    if let Some((index, &value)) = inputs.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(StructuralError::InvalidInput { index, value }.into());
    }

    let tick = state.begin_tick();
    for (index, neuron) in graph.neurons().iter().enumerate() {
        let activation = match neuron.kind {
            NeuronKind::Input => {
                let value = inputs.get(index).copied().unwrap_or(0.0);
                Activation::plain(value, value)
            }
            NeuronKind::Constant => Activation::plain(neuron.bias, neuron.bias),
            NeuronKind::Hidden | NeuronKind::Output => {
                let stimulus = stimulus(graph, state, index, neuron.bias)?;
                let strategy = neuron.squash.strategy();
                let activation = if record_traces {
                    strategy.activate_and_trace(&stimulus)
                } else {
                    let value = strategy.activate(&stimulus);
                    Activation::plain(value, value)
                };
                strategy
                    .range()
                    .validate(activation.value, None)
                    .map_err(|violation| RangeViolation {
                        context: Some(format!("neuron {}", index)),
                        ..violation
                    })?;
                if record_traces {
                    update_traces(graph, state, &stimulus, activation.derivative);
                }
                activation
            }
        };

        let neuron_state = state.neuron_mut(index);
        neuron_state.old = neuron_state.activation;
        neuron_state.activation = activation.value;
        neuron_state.state = activation.state;
        neuron_state.derivative = activation.derivative;
        neuron_state.selected = activation.selected;
        neuron_state.branch = activation.branch;
        neuron_state.tick = tick;
    }

    trace!(tick, traced = record_traces, "forward pass complete");
    Ok(graph
        .output_range()
        .map(|index| state.activation(index))
        .collect())
}

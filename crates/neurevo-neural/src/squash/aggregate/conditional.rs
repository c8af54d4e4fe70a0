// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! IF
//!
//! Routes the sum of the `positive`-tagged inputs when the sum of the
//! `condition`-tagged inputs is above zero, the sum of the `negative`-tagged
//! inputs otherwise. Untagged inputs are ignored.
//!
//! Credit goes only to the branch that was taken; the condition and the
//! other branch just refresh their evidence, so the decision itself is
//! never pushed.

use rand::RngCore;
use tracing::debug;

use crate::numeric::stabilize;
use crate::propagate::Propagator;
use crate::squash::Activation;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NumericError, StructuralError, SynapseTag};

use super::{identity_inverse, ActivationRange, ActivationStrategy, Stimulus};

pub(super) struct Conditional;

pub(super) static IF: Conditional = Conditional;

const NAME: &str = "IF";

/// Branch selected by the condition sum
fn branch(condition: f64) -> SynapseTag {
    if condition > 0.0 {
        SynapseTag::Positive
    } else {
        SynapseTag::Negative
    }
}

fn tagged_sum(stimulus: &Stimulus, tag: SynapseTag) -> f64 {
    stabilize(
        stimulus
            .inflows
            .iter()
            .filter(|inflow| inflow.tag == Some(tag))
            .map(|inflow| inflow.value())
            .sum(),
    )
}

impl ActivationStrategy for Conditional {
    fn name(&self) -> &'static str {
        NAME
    }

    fn range(&self) -> ActivationRange {
        ActivationRange::unbounded(NAME)
    }

    fn uses_bias(&self) -> bool {
        false
    }

    fn activate(&self, stimulus: &Stimulus) -> f64 {
        self.activate_and_trace(stimulus).value
    }

    fn activate_and_trace(&self, stimulus: &Stimulus) -> Activation {
        let condition = tagged_sum(stimulus, SynapseTag::Condition);
        let taken = branch(condition);
        let value = tagged_sum(stimulus, taken);
        Activation {
            value,
            state: condition,
            derivative: 1.0,
            selected: None,
            branch: Some(taken),
        }
    }

    fn inverse(&self, activation: f64, _hint: Option<f64>) -> Result<f64, NumericError> {
        identity_inverse(NAME, activation)
    }

    fn propagate(
        &self,
        pass: &mut Propagator<'_>,
        index: usize,
        target: f64,
    ) -> NeuralResult<f64> {
        let activation = pass.adjusted_activation(index)?;
        let error = stabilize(target - activation);
        pass.state_mut().neuron_mut(index).error_responsibility = error;

        let links = pass.visiting_order(index);
        let mut condition = 0.0;
        for synapse in links.iter().filter(|s| s.tag == Some(SynapseTag::Condition)) {
            condition += pass.link_value(synapse)?;
        }
        let taken = branch(stabilize(condition));
        let active = links.iter().filter(|s| s.tag == Some(taken)).count();
        if active == 0 {
            return Ok(activation);
        }
        let share = error / active as f64;

        let mut achieved = 0.0;
        for synapse in links {
            match synapse.tag {
                Some(tag) if tag == taken => {
                    let link_target = stabilize(pass.link_value(synapse)? + share);
                    achieved += pass.propagate_link(synapse, link_target)?;
                }
                Some(_) => {
                    pass.refresh_link(synapse)?;
                }
                None => {}
            }
        }
        Ok(stabilize(achieved))
    }

    fn validate(&self, graph: &TopologyGraph, index: usize) -> Result<(), StructuralError> {
        for tag in SynapseTag::ALL {
            if !graph.inward(index).any(|s| s.tag == Some(tag)) {
                return Err(StructuralError::MissingRequiredEdge {
                    index,
                    squash: NAME.to_string(),
                    requirement: format!("a {} inward synapse", tag),
                });
            }
        }
        Ok(())
    }

    /// Tag an untagged inward synapse for each missing tag, or request a new
    /// random one when none is left
    fn fix(
        &self,
        graph: &mut TopologyGraph,
        index: usize,
        rng: &mut dyn RngCore,
    ) -> NeuralResult<bool> {
        let mut changed = false;
        for tag in SynapseTag::ALL {
            if graph.inward(index).any(|s| s.tag == Some(tag)) {
                continue;
            }
            let untagged = graph
                .inward(index)
                .find(|s| s.tag.is_none() && !s.is_self_loop())
                .map(|s| s.from);
            match untagged {
                Some(from) => {
                    graph.set_tag(from, index, Some(tag))?;
                    debug!(index, from, %tag, "tagged inward synapse");
                    changed = true;
                }
                None => {
                    let source = graph.connect_random_source(index, Some(tag), rng)?;
                    debug!(index, ?source, %tag, "requested tagged inward synapse");
                    changed |= source.is_some();
                }
            }
        }
        Ok(changed)
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! HYPOT and HYPOTv2
//!
//! HYPOT is the Euclidean norm of the weighted inputs. HYPOTv2 gives the
//! norm the sign of the weighted sum and adds the bias.
//!
//! Credit assignment scales every weighted input by the same factor, which
//! scales the norm by that factor and keeps the sign of the sum. When the
//! norm is negligible every input is asked for `target / √n` instead.

use rand::RngCore;

use crate::numeric::{sign_or_positive, stabilize};
use crate::propagate::Propagator;
use crate::squash::Activation;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NumericError, StructuralError};

use super::{identity_inverse, values, ActivationRange, ActivationStrategy, Stimulus};

pub(super) struct Hypot {
    signed: bool,
}

pub(super) static HYPOT: Hypot = Hypot { signed: false };
pub(super) static HYPOT_V2: Hypot = Hypot { signed: true };

/// `(Σ v, √(Σ v²))`
fn sum_and_norm(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (sum, squares) = values
        .into_iter()
        .fold((0.0, 0.0), |(sum, squares), v| (sum + v, squares + v * v));
    (stabilize(sum), stabilize(squares).sqrt())
}

impl Hypot {
    /// Norm, signed for HYPOTv2; bias excluded
    fn raw(&self, values: impl IntoIterator<Item = f64>) -> f64 {
        let (sum, norm) = sum_and_norm(values);
        if self.signed {
            sign_or_positive(sum) * norm
        } else {
            norm
        }
    }
}

impl ActivationStrategy for Hypot {
    fn name(&self) -> &'static str {
        if self.signed {
            "HYPOTv2"
        } else {
            "HYPOT"
        }
    }

    fn range(&self) -> ActivationRange {
        if self.signed {
            ActivationRange::unbounded(self.name())
        } else {
            ActivationRange::new(self.name(), 0.0, f64::MAX)
        }
    }

    fn uses_bias(&self) -> bool {
        self.signed
    }

    fn activate(&self, stimulus: &Stimulus) -> f64 {
        self.activate_and_trace(stimulus).value
    }

    fn activate_and_trace(&self, stimulus: &Stimulus) -> Activation {
        let state = self.raw(values(stimulus));
        let value = if self.signed {
            stabilize(state + stimulus.bias)
        } else {
            state
        };
        Activation::plain(value, state)
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
        pass.state_mut().neuron_mut(index).error_responsibility = stabilize(target - activation);
        let bias = if self.signed {
            pass.adjusted_bias(index)?
        } else {
            0.0
        };

        let links = pass.visiting_order(index);
        if links.is_empty() {
            return Ok(activation);
        }
        let mut current = Vec::with_capacity(links.len());
        for synapse in &links {
            current.push(pass.link_value(synapse)?);
        }

        let wanted = stabilize(target - bias);
        let raw = self.raw(current.iter().copied());
        let spread = wanted / (links.len() as f64).sqrt();

        let mut achieved = Vec::with_capacity(links.len());
        for (synapse, value) in links.into_iter().zip(current) {
            let link_target = if raw.abs() > pass.plank() {
                stabilize(value * wanted / raw)
            } else {
                spread
            };
            achieved.push(pass.propagate_link(synapse, link_target)?);
        }
        let raw = self.raw(achieved);

        if !self.signed {
            return Ok(raw);
        }
        pass.accumulate_bias(index, stabilize(target - raw))?;
        let bias = pass.adjusted_bias(index)?;
        Ok(stabilize(raw + bias))
    }

    fn validate(&self, _graph: &TopologyGraph, _index: usize) -> Result<(), StructuralError> {
        Ok(())
    }

    fn fix(
        &self,
        _graph: &mut TopologyGraph,
        _index: usize,
        _rng: &mut dyn RngCore,
    ) -> NeuralResult<bool> {
        Ok(false)
    }
}

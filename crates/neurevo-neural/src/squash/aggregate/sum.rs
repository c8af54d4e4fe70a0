// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! SUM and MEAN
//!
//! Both move every inward synapse by the same amount. For SUM the error is
//! split over the synapses; for MEAN each synapse takes the whole error,
//! since moving every input by `δ` moves the mean by `δ`.

use rand::RngCore;

use crate::numeric::stabilize;
use crate::propagate::Propagator;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NumericError, StructuralError};

use super::{identity_inverse, values, ActivationRange, ActivationStrategy, Stimulus};
use crate::squash::Activation;

pub(super) struct Sum {
    mean: bool,
}

pub(super) static SUM: Sum = Sum { mean: false };
pub(super) static MEAN: Sum = Sum { mean: true };

impl ActivationStrategy for Sum {
    fn name(&self) -> &'static str {
        if self.mean {
            "MEAN"
        } else {
            "SUM"
        }
    }

    fn range(&self) -> ActivationRange {
        ActivationRange::unbounded(self.name())
    }

    fn uses_bias(&self) -> bool {
        false
    }

    fn activate(&self, stimulus: &Stimulus) -> f64 {
        let total = stabilize(values(stimulus).sum());
        if !self.mean {
            return total;
        }
        match stimulus.inflows.len() {
            0 => 0.0,
            n => total / n as f64,
        }
    }

    fn activate_and_trace(&self, stimulus: &Stimulus) -> Activation {
        let value = self.activate(stimulus);
        Activation::plain(value, value)
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
        let error = stabilize(target - activation);
        pass.state_mut().neuron_mut(index).error_responsibility = error;

        let count = pass.graph().inward_count(index);
        if count == 0 {
            return Ok(activation);
        }
        if self.mean {
            let total = pass.distribute(index, stabilize(error * count as f64))?;
            Ok(stabilize(total / count as f64))
        } else {
            pass.distribute(index, error)
        }
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

#[cfg(test)]
mod tests {
    use super::super::tests::stimulus;
    use super::*;

    #[test]
    fn test_sum_ignores_bias() {
        assert_eq!(SUM.activate(&stimulus(100.0, &[1.0, 2.0, 3.0])), 6.0);
        assert_eq!(MEAN.activate(&stimulus(100.0, &[1.0, 2.0, 3.0])), 2.0);
    }

    #[test]
    fn test_trace_matches_activate() {
        let s = stimulus(0.0, &[1.5, -0.5]);
        assert_eq!(SUM.activate_and_trace(&s).value, SUM.activate(&s));
        assert_eq!(MEAN.activate_and_trace(&s).derivative, 1.0);
    }

    #[test]
    fn test_non_finite_sum_is_clamped() {
        let s = stimulus(0.0, &[f64::MAX, f64::MAX]);
        assert_eq!(SUM.activate(&s), f64::MAX);
    }
}

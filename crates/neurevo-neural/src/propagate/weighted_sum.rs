// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Generic credit assignment for elementary squashes
//!
//! ```text
//! current  = inverse(activation)          target' = inverse(target)
//! error    = target' − current            share   = error / inward count
//! link     : ask for (link value + share), keep what is achieved
//! bias     : evidence = target' − Σ achieved
//! result   = squash(Σ achieved + adjusted bias)
//! ```
//!
//! Self-loops take no share of the error but still count in the divisor,
//! and keep contributing their current value.

use tracing::trace;

use crate::numeric::stabilize;
use crate::squash::{ActivationStrategy, ElementarySquash};
use crate::types::NeuralResult;

use super::Propagator;

pub(crate) fn propagate(
    pass: &mut Propagator<'_>,
    squash: ElementarySquash,
    index: usize,
    target: f64,
) -> NeuralResult<f64> {
    let activation = pass.adjusted_activation(index)?;
    let hint = pass.state().neuron(index).map(|n| n.state);

    let current_value = squash.inverse(activation, hint).unwrap_or(activation);
    let target_value = squash
        .inverse(target, Some(current_value))
        .unwrap_or(target);
    let error = stabilize(target_value - current_value);
    pass.state_mut().neuron_mut(index).error_responsibility = error;

    let current_bias = pass.adjusted_bias(index)?;
    let achieved = pass.distribute(index, error)?;

    pass.accumulate_bias(index, stabilize(target_value - achieved))?;
    let bias = pass.adjusted_bias(index)?;
    trace!(
        index,
        error,
        current_bias,
        bias,
        "weighted sum propagated"
    );
    Ok(squash.squash(stabilize(achieved + bias)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NetworkState;
    use crate::squash::Squash;
    use crate::topology::TopologyGraph;
    use crate::types::{Neuron, NeuronKind};
    use neurevo_config::BackPropagationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn single_link(weight: f64) -> TopologyGraph {
        let mut graph = TopologyGraph::new(1, 1, Squash::Elementary(ElementarySquash::Identity));
        graph.connect(0, 1, weight, None).unwrap();
        graph
    }

    fn config() -> BackPropagationConfig {
        BackPropagationConfig::default()
            .with_learning_rate(1.0)
            .with_generations(0.0)
            .with_exponential_clamp(false)
            .with_random_samples(false)
    }

    #[test]
    fn test_identity_link_moves_toward_target() {
        let graph = single_link(1.0);
        let mut state = NetworkState::new();
        crate::forward::activate(&graph, &mut state, &[2.0], true).unwrap();

        let config = config();
        let mut rng = StdRng::seed_from_u64(1);
        let mut pass = Propagator::new(&graph, &mut state, &config, &mut rng);
        let achieved = pass.propagate(1, 3.0).unwrap();
        assert!((achieved - 3.0).abs() < 1e-9, "achieved {}", achieved);
        assert_eq!(state.accumulation_count(0, 1), 1);
    }

    #[test]
    fn test_self_loop_takes_no_share() {
        let mut graph = TopologyGraph::new(1, 1, Squash::Elementary(ElementarySquash::Identity));
        let hidden = Neuron::new(
            NeuronKind::Hidden,
            Squash::Elementary(ElementarySquash::Identity),
            0.0,
        );
        graph.insert_neuron(hidden).unwrap();
        graph.connect(0, 1, 1.0, None).unwrap();
        graph.connect(1, 1, 0.5, None).unwrap();
        graph.connect(1, 2, 1.0, None).unwrap();

        let mut state = NetworkState::new();
        crate::forward::activate(&graph, &mut state, &[1.0], true).unwrap();
        crate::forward::activate(&graph, &mut state, &[1.0], true).unwrap();

        let config = config();
        let mut rng = StdRng::seed_from_u64(2);
        let mut pass = Propagator::new(&graph, &mut state, &config, &mut rng);
        pass.propagate(1, 4.0).unwrap();
        assert_eq!(state.accumulation_count(1, 1), 0);
        assert_eq!(state.accumulation_count(0, 1), 1);
    }
}

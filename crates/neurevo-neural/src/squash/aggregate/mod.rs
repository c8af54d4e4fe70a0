// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Aggregate Squash Functions
//!
//! Aggregates combine the individual weighted inputs `v = weight · activation
//! · gain` instead of squashing their sum:
//!
//! | Name      | Activation                                   | Bias |
//! |-----------|----------------------------------------------|------|
//! | `SUM`     | `Σ v`                                        | no   |
//! | `MEAN`    | `Σ v / n` (0 without inputs)                 | no   |
//! | `MAXIMUM` | `max v + bias`                               | yes  |
//! | `MINIMUM` | `min v + bias`                               | yes  |
//! | `HYPOT`   | `√(Σ v²)`                                    | no   |
//! | `HYPOTv2` | `sign(Σ v) · √(Σ v²) + bias`                 | yes  |
//! | `IF`      | `Σ v⁺` if `Σ v^c > 0`, else `Σ v⁻`           | no   |
//!
//! Their inverse is the identity. Each one has its own credit-assignment
//! rule; MAXIMUM, MINIMUM and IF also require certain inward synapses and
//! know how to request them.

mod conditional;
mod extremum;
mod hypot;
mod sum;

use rand::RngCore;
use tracing::debug;

use crate::numeric::require_finite;
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NumericError, StructuralError};

use super::{ActivationRange, ActivationStrategy, Inflow, Stimulus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateSquash {
    Sum,
    Mean,
    Maximum,
    Minimum,
    Hypot,
    HypotV2,
    If,
}

impl AggregateSquash {
    pub const ALL: [AggregateSquash; 7] = [
        AggregateSquash::Sum,
        AggregateSquash::Mean,
        AggregateSquash::Maximum,
        AggregateSquash::Minimum,
        AggregateSquash::Hypot,
        AggregateSquash::HypotV2,
        AggregateSquash::If,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|squash| squash.name() == name)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            AggregateSquash::Sum => "SUM",
            AggregateSquash::Mean => "MEAN",
            AggregateSquash::Maximum => "MAXIMUM",
            AggregateSquash::Minimum => "MINIMUM",
            AggregateSquash::Hypot => "HYPOT",
            AggregateSquash::HypotV2 => "HYPOTv2",
            AggregateSquash::If => "IF",
        }
    }

    pub fn strategy(&self) -> &'static dyn ActivationStrategy {
        match self {
            AggregateSquash::Sum => &sum::SUM,
            AggregateSquash::Mean => &sum::MEAN,
            AggregateSquash::Maximum => &extremum::MAXIMUM,
            AggregateSquash::Minimum => &extremum::MINIMUM,
            AggregateSquash::Hypot => &hypot::HYPOT,
            AggregateSquash::HypotV2 => &hypot::HYPOT_V2,
            AggregateSquash::If => &conditional::IF,
        }
    }
}

/// Aggregates are the identity between value and activation
fn identity_inverse(name: &str, activation: f64) -> Result<f64, NumericError> {
    require_finite(name, activation)
}

fn values(stimulus: &Stimulus) -> impl Iterator<Item = f64> + '_ {
    stimulus.inflows.iter().map(Inflow::value)
}

/// Fail unless `index` has at least one inward synapse
fn require_inward(
    graph: &TopologyGraph,
    index: usize,
    squash: &str,
) -> Result<(), StructuralError> {
    if graph.inward_count(index) == 0 {
        return Err(StructuralError::MissingRequiredEdge {
            index,
            squash: squash.to_string(),
            requirement: "at least one inward synapse".to_string(),
        });
    }
    Ok(())
}

/// Request one random inward synapse if `index` has none
fn ensure_inward(
    graph: &mut TopologyGraph,
    index: usize,
    squash: &str,
    rng: &mut dyn RngCore,
) -> NeuralResult<bool> {
    if graph.inward_count(index) > 0 {
        return Ok(false);
    }
    let source = graph.connect_random_source(index, None, rng)?;
    debug!(index, squash, ?source, "requested inward synapse");
    Ok(source.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squash::{ElementarySquash, Squash};
    use crate::types::SynapseTag;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(super) fn inflow(from: usize, value: f64, tag: Option<SynapseTag>) -> Inflow {
        Inflow {
            from,
            weight: 1.0,
            activation: value,
            gain: 1.0,
            tag,
        }
    }

    pub(super) fn stimulus(bias: f64, values: &[f64]) -> Stimulus {
        Stimulus {
            index: values.len(),
            bias,
            inflows: values
                .iter()
                .enumerate()
                .map(|(from, &v)| inflow(from, v, None))
                .collect(),
        }
    }

    #[test]
    fn test_catalog() {
        for squash in AggregateSquash::ALL {
            assert_eq!(AggregateSquash::from_name(squash.name()), Some(squash));
            assert_eq!(squash.strategy().name(), squash.name());
            assert_eq!(squash.strategy().inverse(2.5, None).unwrap(), 2.5);
            assert!(squash.strategy().inverse(f64::NAN, Some(1.0)).is_err());
        }
        assert_eq!(AggregateSquash::from_name("hypot"), None);
    }

    #[test]
    fn test_bias_usage() {
        let with_bias: Vec<_> = AggregateSquash::ALL
            .iter()
            .filter(|s| s.strategy().uses_bias())
            .map(|s| s.name())
            .collect();
        assert_eq!(with_bias, vec!["MAXIMUM", "MINIMUM", "HYPOTv2"]);
    }

    #[test]
    fn test_forward_table() {
        let s = stimulus(0.5, &[3.0, -4.0]);
        let activate = |squash: AggregateSquash| squash.strategy().activate(&s);
        assert_eq!(activate(AggregateSquash::Sum), -1.0);
        assert_eq!(activate(AggregateSquash::Mean), -0.5);
        assert_eq!(activate(AggregateSquash::Maximum), 3.5);
        assert_eq!(activate(AggregateSquash::Minimum), -3.5);
        assert_eq!(activate(AggregateSquash::Hypot), 5.0);
        assert_eq!(activate(AggregateSquash::HypotV2), -4.5);
        assert_eq!(activate(AggregateSquash::If), 0.0);
    }

    #[test]
    fn test_empty_inputs() {
        let s = stimulus(0.25, &[]);
        for squash in AggregateSquash::ALL {
            let value = squash.strategy().activate(&s);
            assert!(value.is_finite(), "{} gave {}", squash.name(), value);
        }
        assert_eq!(AggregateSquash::Mean.strategy().activate(&s), 0.0);
    }

    #[test]
    fn test_min_max_require_inward() {
        let mut graph = TopologyGraph::new(2, 1, Squash::Aggregate(AggregateSquash::Maximum));
        let strategy = AggregateSquash::Maximum.strategy();
        assert!(matches!(
            strategy.validate(&graph, 2),
            Err(StructuralError::MissingRequiredEdge { index: 2, .. })
        ));

        let mut rng = StdRng::seed_from_u64(5);
        assert!(strategy.fix(&mut graph, 2, &mut rng).unwrap());
        assert_eq!(graph.inward_count(2), 1);
        assert!(strategy.validate(&graph, 2).is_ok());
        assert!(!strategy.fix(&mut graph, 2, &mut rng).unwrap());

        let identity = Squash::Elementary(ElementarySquash::Identity);
        assert!(identity.strategy().validate(&graph, 2).is_ok());
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Weight and Bias Accumulation
//!
//! Propagation does not change weights or biases directly. It records
//! evidence (the value a connection should carry for the activation its
//! source actually had, the bias a neuron should have) and reads back an
//! *adjusted* weight or bias: the evidence average blended with the stored
//! value (weighted by `generations`), then moved toward by a clamped,
//! learning-rate-scaled step.
//!
//! ```text
//! blended  = (Σ evidence + stored · generations) / (count + generations)
//! step     = learning_rate · (blended − stored)
//! step'    = max · (1 − e^(−|step| / max)) · sign(step)   (exponential clamp)
//!          | clamp(step, −max, max)                       (hard clamp)
//! adjusted = clamp(stored + step', −limit, limit)
//! ```

use neurevo_config::BackPropagationConfig;

use crate::numeric::{floor_magnitude, require_finite, stabilize};
use crate::state::{BatchAverage, ConnectionAccumulator, NeuronAccumulator};
use crate::types::NumericError;

/// Record one sample of weight evidence
///
/// `target_value` is the contribution the connection should carry and
/// `activation` the (gain-scaled) source activation it would carry it with.
/// The sign of `activation` (zero counts as positive) selects the bucket;
/// both magnitudes are floored at the plank constant.
pub fn accumulate_weight(
    current_weight: f64,
    acc: &mut ConnectionAccumulator,
    target_value: f64,
    activation: f64,
    config: &BackPropagationConfig,
) -> Result<(), NumericError> {
    require_finite("weight", current_weight)?;
    let plank = config.plank_constant;
    let value = floor_magnitude(stabilize(target_value), plank);
    let activation = floor_magnitude(stabilize(activation), plank);

    if activation > 0.0 {
        acc.positive_value += value;
        acc.positive_activation += activation;
        acc.positive_count += 1;
    } else {
        acc.negative_value += value;
        acc.negative_activation += activation;
        acc.negative_count += 1;
    }
    Ok(())
}

/// Weight implied by the accumulated evidence
///
/// Until the sample count reaches a multiple of `batch_size` this returns
/// the last batch average (or the stored weight if there is none yet).
pub fn adjusted_weight(
    current_weight: f64,
    acc: &mut ConnectionAccumulator,
    config: &BackPropagationConfig,
) -> Result<f64, NumericError> {
    require_finite("weight", current_weight)?;
    let count = acc.count();
    let batch_size = config.batch_size.max(1);

    if count == 0 || count % batch_size != 0 {
        return Ok(acc.batch.map_or(current_weight, |batch| batch.weight));
    }
    if let Some(batch) = acc.batch.filter(|batch| batch.count == count) {
        return Ok(batch.weight);
    }

    let mut evidence = 0.0;
    if acc.positive_count > 0 {
        let average = acc.positive_value / acc.positive_activation;
        evidence += average * acc.positive_count as f64;
    }
    if acc.negative_count > 0 {
        let average = acc.negative_value / acc.negative_activation;
        evidence += average * acc.negative_count as f64;
    }

    let target = blend(evidence, count, current_weight, config.generations);
    let weight = limit_weight(target, current_weight, config)?;
    acc.batch = Some(BatchAverage { weight, count });
    Ok(weight)
}

/// Record one sample of bias evidence
pub fn accumulate_bias(
    acc: &mut NeuronAccumulator,
    target_bias: f64,
    config: &BackPropagationConfig,
) -> Result<(), NumericError> {
    let limit = config.limit_bias_scale;
    acc.total_bias += stabilize(target_bias).clamp(-limit, limit);
    acc.count += 1;
    Ok(())
}

/// Bias implied by the accumulated evidence
pub fn adjusted_bias(
    current_bias: f64,
    acc: Option<&NeuronAccumulator>,
    config: &BackPropagationConfig,
) -> Result<f64, NumericError> {
    require_finite("bias", current_bias)?;
    match acc {
        Some(acc) if acc.count > 0 => {
            let target = blend(acc.total_bias, acc.count, current_bias, config.generations);
            limit_bias(target, current_bias, config)
        }
        _ => Ok(current_bias),
    }
}

/// `(evidence + current · generations) / (count + generations)`
fn blend(evidence: f64, count: u64, current: f64, generations: f64) -> f64 {
    let samples = count as f64;
    stabilize((evidence + current * generations) / (samples + generations))
}

/// Move a weight toward `target` by one clamped step
pub fn limit_weight(
    target: f64,
    current: f64,
    config: &BackPropagationConfig,
) -> Result<f64, NumericError> {
    require_finite("weight", current)?;
    limit(
        target,
        current,
        config.maximum_weight_adjustment_scale,
        config.limit_weight_scale,
        config,
    )
}

/// Move a bias toward `target` by one clamped step
pub fn limit_bias(
    target: f64,
    current: f64,
    config: &BackPropagationConfig,
) -> Result<f64, NumericError> {
    require_finite("bias", current)?;
    limit(
        target,
        current,
        config.maximum_bias_adjustment_scale,
        config.limit_bias_scale,
        config,
    )
}

fn limit(
    target: f64,
    current: f64,
    maximum_step: f64,
    limit: f64,
    config: &BackPropagationConfig,
) -> Result<f64, NumericError> {
    let plank = config.plank_constant;
    let mut target = require_finite("adjustment target", target)?;
    if target.abs() < plank {
        target = 0.0;
    }
    if (target - current).abs() < plank {
        return Ok(current);
    }

    let step = config.learning_rate * (target - current);
    let step = if config.disable_exponential_clamp {
        step.clamp(-maximum_step, maximum_step)
    } else {
        maximum_step * -(-step.abs() / maximum_step).exp_m1() * step.signum()
    };

    Ok(stabilize(current + step).clamp(-limit, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn exact() -> BackPropagationConfig {
        BackPropagationConfig::default()
            .with_learning_rate(1.0)
            .with_generations(0.0)
            .with_exponential_clamp(false)
    }

    #[test]
    fn test_limit_snaps_tiny_target_to_zero() {
        let config = exact();
        assert_eq!(limit_weight(1e-9, 0.5, &config).unwrap(), 0.0);
    }

    #[test]
    fn test_limit_within_plank_is_noop() {
        let config = BackPropagationConfig::default();
        assert_eq!(limit_weight(0.3 + 1e-9, 0.3, &config).unwrap(), 0.3);
    }

    #[test]
    fn test_limit_step_and_magnitude_clamps() {
        let config = exact().with_maximum_adjustment_scale(2.0, 2.0);
        assert_eq!(limit_weight(100.0, 0.0, &config).unwrap(), 2.0);
        assert_eq!(limit_bias(-100.0, 0.0, &config).unwrap(), -2.0);

        let config = exact().with_limit_scale(1.5, 1.5);
        assert_eq!(limit_weight(5.0, 0.0, &config).unwrap(), 1.5);
    }

    #[test]
    fn test_exponential_clamp_saturates() {
        let config = BackPropagationConfig::default()
            .with_learning_rate(1.0)
            .with_maximum_adjustment_scale(10.0, 10.0);
        let small = limit_weight(0.01, 0.0, &config).unwrap();
        assert!((small - 0.01).abs() < 1e-4);
        let huge = limit_weight(100.0, 0.0, &config).unwrap();
        assert!(huge < 10.0 && huge > 9.99);
        let negative = limit_weight(-100.0, 0.0, &config).unwrap();
        assert_eq!(negative, -huge);
    }

    #[test]
    fn test_limit_is_idempotent_once_on_target() {
        let config = exact().with_maximum_adjustment_scale(1000.0, 1000.0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let target = rng.gen_range(-50.0..50.0);
            let current = rng.gen_range(-50.0..50.0);
            let first = limit_weight(target, current, &config).unwrap();
            assert!((first - target).abs() < config.plank_constant);
            let second = limit_weight(target, first, &config).unwrap();
            assert_eq!(first, second);
            let again = limit_weight(target, first, &config).unwrap();
            assert_eq!(second, again);

            let bias = limit_bias(target, current, &config).unwrap();
            assert_eq!(limit_bias(target, bias, &config).unwrap(), bias);
        }
    }

    #[test]
    fn test_non_finite_is_rejected() {
        let config = BackPropagationConfig::default();
        let mut acc = ConnectionAccumulator::default();
        assert!(limit_weight(1.0, f64::NAN, &config).is_err());
        assert!(limit_bias(1.0, f64::INFINITY, &config).is_err());
        assert!(accumulate_weight(f64::NAN, &mut acc, 1.0, 1.0, &config).is_err());
        assert!(adjusted_weight(f64::NEG_INFINITY, &mut acc, &config).is_err());
        assert!(adjusted_bias(f64::NAN, None, &config).is_err());
    }

    #[test]
    fn test_weight_accumulation_recovers_true_weight() {
        let config = exact();
        let mut rng = StdRng::seed_from_u64(3);
        let true_weight = -2.75;
        let mut acc = ConnectionAccumulator::default();

        for _ in 0..1000 {
            let activation: f64 = rng.gen_range(-5.0..5.0);
            accumulate_weight(0.4, &mut acc, activation * true_weight, activation, &config)
                .unwrap();
        }

        let recovered = adjusted_weight(0.4, &mut acc, &config).unwrap();
        assert!(
            (recovered - true_weight).abs() < 1e-6,
            "recovered {}",
            recovered
        );
        assert!(acc.positive_count > 0 && acc.negative_count > 0);
    }

    #[test]
    fn test_generations_add_inertia() {
        let config = exact().with_generations(3.0);
        let mut acc = ConnectionAccumulator::default();
        accumulate_weight(1.0, &mut acc, 5.0, 1.0, &config).unwrap();
        // (5·1 + 1·3) / (1 + 3)
        assert!((adjusted_weight(1.0, &mut acc, &config).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_batch_average_only_refreshes_on_batch_boundary() {
        let config = exact().with_batch_size(2);
        let mut acc = ConnectionAccumulator::default();

        accumulate_weight(1.0, &mut acc, 3.0, 1.0, &config).unwrap();
        assert_eq!(adjusted_weight(1.0, &mut acc, &config).unwrap(), 1.0);

        accumulate_weight(1.0, &mut acc, 5.0, 1.0, &config).unwrap();
        assert_eq!(adjusted_weight(1.0, &mut acc, &config).unwrap(), 4.0);

        accumulate_weight(1.0, &mut acc, 100.0, 1.0, &config).unwrap();
        assert_eq!(adjusted_weight(1.0, &mut acc, &config).unwrap(), 4.0);
        assert_eq!(acc.batch.map(|b| b.count), Some(2));
    }

    #[test]
    fn test_bias_blend() {
        let config = exact();
        let mut acc = NeuronAccumulator::default();
        accumulate_bias(&mut acc, 1.0, &config).unwrap();
        accumulate_bias(&mut acc, 2.0, &config).unwrap();
        assert_eq!(adjusted_bias(0.0, Some(&acc), &config).unwrap(), 1.5);
        assert_eq!(adjusted_bias(0.25, None, &config).unwrap(), 0.25);
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Legal output interval of a squash

use crate::numeric::stabilize;
use crate::types::RangeViolation;

/// Closed interval `[low, high]` every produced activation must lie in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationRange {
    pub squash: &'static str,
    pub low: f64,
    pub high: f64,
}

impl ActivationRange {
    pub const fn new(squash: &'static str, low: f64, high: f64) -> Self {
        Self { squash, low, high }
    }

    /// The whole finite line
    pub const fn unbounded(squash: &'static str) -> Self {
        Self::new(squash, -f64::MAX, f64::MAX)
    }

    /// Finite and inside `[low, high]`
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.low && value <= self.high
    }

    /// Pass `value` through, or fail with a [`RangeViolation`]
    ///
    /// NaN and infinities always fail. `context` is attached to the error
    /// (typically the neuron being evaluated).
    pub fn validate(&self, value: f64, context: Option<&str>) -> Result<f64, RangeViolation> {
        if self.contains(value) {
            return Ok(value);
        }
        Err(RangeViolation {
            squash: self.squash.to_string(),
            value,
            low: self.low,
            high: self.high,
            context: context.map(str::to_string),
        })
    }

    /// Clamp any value (non-finite included) into the interval
    #[inline]
    pub fn limit(&self, value: f64) -> f64 {
        stabilize(value).clamp(self.low, self.high)
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Numeric stability policy
//!
//! Intermediate values are never allowed to carry NaN or infinity out of a
//! pass: infinities clamp to the representable extreme of matching sign and
//! NaN becomes zero. Boundaries that require finiteness (stored weights and
//! biases) use [`require_finite`] instead and fail loudly.

use tracing::trace;

use crate::types::NumericError;

/// Clamp a possibly non-finite intermediate into the finite range
#[inline]
pub fn stabilize(value: f64) -> f64 {
    if value.is_finite() {
        return value;
    }
    trace!(value, "clamping non-finite intermediate");
    if value.is_nan() {
        0.0
    } else if value > 0.0 {
        f64::MAX
    } else {
        -f64::MAX
    }
}

/// Fail with [`NumericError::NonFinite`] unless `value` is finite
#[inline]
pub fn require_finite(what: &str, value: f64) -> Result<f64, NumericError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NumericError::non_finite(what, value))
    }
}

/// Raise `|value|` to at least `floor`, keeping its sign (zero counts as positive)
#[inline]
pub fn floor_magnitude(value: f64, floor: f64) -> f64 {
    if value.abs() >= floor {
        value
    } else if value.is_sign_negative() && value != 0.0 {
        -floor
    } else {
        floor
    }
}

/// Sign with zero mapped to `+1`
#[inline]
pub fn sign_or_positive(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

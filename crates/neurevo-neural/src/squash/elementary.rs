// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Elementary Squash Functions
//!
//! Functions of the single weighted sum `Σ(weight · activation · gain) + bias`.
//!
//! Each function comes with an inverse (`unsquash`) used by propagation to
//! turn a desired activation into a desired pre-activation value. Inverses
//! pull their argument strictly inside the open range first, so
//! `squash(unsquash(squash(x))) ≈ squash(x)` also holds at the range
//! boundaries where the exact inverse diverges.

use std::f64::consts::FRAC_PI_2;

use rand::RngCore;

use crate::numeric::{require_finite, stabilize};
use crate::propagate::{weighted_sum, Propagator};
use crate::topology::TopologyGraph;
use crate::types::{NeuralResult, NumericError, StructuralError};

use super::{Activation, ActivationRange, ActivationStrategy, Stimulus};

/// Distance kept from an asymptotic range boundary when inverting
const EDGE: f64 = 1e-15;

const LEAKY_SLOPE: f64 = 0.01;
const SELU_LAMBDA: f64 = 1.050_700_987_355_480_5;
const SELU_ALPHA: f64 = 1.673_263_242_354_377_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementarySquash {
    Identity,
    Logistic,
    Tanh,
    Relu,
    LeakyRelu,
    Elu,
    Selu,
    Softsign,
    Softplus,
    BentIdentity,
    ArcTan,
    Cube,
    Exponential,
    Clipped,
    Absolute,
    Gaussian,
}

impl ElementarySquash {
    pub const ALL: [ElementarySquash; 16] = [
        ElementarySquash::Identity,
        ElementarySquash::Logistic,
        ElementarySquash::Tanh,
        ElementarySquash::Relu,
        ElementarySquash::LeakyRelu,
        ElementarySquash::Elu,
        ElementarySquash::Selu,
        ElementarySquash::Softsign,
        ElementarySquash::Softplus,
        ElementarySquash::BentIdentity,
        ElementarySquash::ArcTan,
        ElementarySquash::Cube,
        ElementarySquash::Exponential,
        ElementarySquash::Clipped,
        ElementarySquash::Absolute,
        ElementarySquash::Gaussian,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            ElementarySquash::Identity => "IDENTITY",
            ElementarySquash::Logistic => "LOGISTIC",
            ElementarySquash::Tanh => "TANH",
            ElementarySquash::Relu => "RELU",
            ElementarySquash::LeakyRelu => "LeakyReLU",
            ElementarySquash::Elu => "ELU",
            ElementarySquash::Selu => "SELU",
            ElementarySquash::Softsign => "Softsign",
            ElementarySquash::Softplus => "Softplus",
            ElementarySquash::BentIdentity => "BENT_IDENTITY",
            ElementarySquash::ArcTan => "ArcTan",
            ElementarySquash::Cube => "CUBE",
            ElementarySquash::Exponential => "Exponential",
            ElementarySquash::Clipped => "CLIPPED",
            ElementarySquash::Absolute => "ABSOLUTE",
            ElementarySquash::Gaussian => "GAUSSIAN",
        }
    }

    pub fn output_range(&self) -> ActivationRange {
        let name = self.name();
        match self {
            ElementarySquash::Identity
            | ElementarySquash::LeakyRelu
            | ElementarySquash::BentIdentity
            | ElementarySquash::Cube => ActivationRange::unbounded(name),
            ElementarySquash::Logistic | ElementarySquash::Gaussian => {
                ActivationRange::new(name, 0.0, 1.0)
            }
            ElementarySquash::Tanh | ElementarySquash::Softsign | ElementarySquash::Clipped => {
                ActivationRange::new(name, -1.0, 1.0)
            }
            ElementarySquash::Relu
            | ElementarySquash::Softplus
            | ElementarySquash::Exponential
            | ElementarySquash::Absolute => ActivationRange::new(name, 0.0, f64::MAX),
            ElementarySquash::Elu => ActivationRange::new(name, -1.0, f64::MAX),
            ElementarySquash::Selu => {
                ActivationRange::new(name, -SELU_LAMBDA * SELU_ALPHA, f64::MAX)
            }
            ElementarySquash::ArcTan => ActivationRange::new(name, -FRAC_PI_2, FRAC_PI_2),
        }
    }

    /// Round-trip tolerance, relative to `max(1, |squash(x)|)`
    pub fn tolerance(&self) -> f64 {
        match self {
            ElementarySquash::Cube | ElementarySquash::BentIdentity => 1e-9,
            ElementarySquash::Softplus | ElementarySquash::Gaussian => 1e-9,
            _ => 1e-12,
        }
    }

    /// Apply the function; the result is always finite
    pub fn squash(&self, x: f64) -> f64 {
        let y = match self {
            ElementarySquash::Identity => x,
            ElementarySquash::Logistic => 1.0 / (1.0 + (-x).exp()),
            ElementarySquash::Tanh => x.tanh(),
            ElementarySquash::Relu => x.max(0.0),
            ElementarySquash::LeakyRelu => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_SLOPE * x
                }
            }
            ElementarySquash::Elu => {
                if x > 0.0 {
                    x
                } else {
                    x.exp_m1()
                }
            }
            ElementarySquash::Selu => {
                if x > 0.0 {
                    SELU_LAMBDA * x
                } else {
                    SELU_LAMBDA * SELU_ALPHA * x.exp_m1()
                }
            }
            ElementarySquash::Softsign => x / (1.0 + x.abs()),
            ElementarySquash::Softplus => x.max(0.0) + (-x.abs()).exp().ln_1p(),
            ElementarySquash::BentIdentity => ((x * x + 1.0).sqrt() - 1.0) / 2.0 + x,
            ElementarySquash::ArcTan => x.atan(),
            ElementarySquash::Cube => x * x * x,
            ElementarySquash::Exponential => x.exp(),
            ElementarySquash::Clipped => x.clamp(-1.0, 1.0),
            ElementarySquash::Absolute => x.abs(),
            ElementarySquash::Gaussian => (-(x * x)).exp(),
        };
        self.output_range().limit(y)
    }

    /// Pre-activation value producing `y`
    ///
    /// Returns `None` only if the result is not finite. `hint` selects the
    /// sign of the answer for ABSOLUTE and GAUSSIAN, and the saturated
    /// pre-activation for RELU and CLIPPED.
    pub fn unsquash(&self, y: f64, hint: Option<f64>) -> Option<f64> {
        if !y.is_finite() {
            return None;
        }
        let hint_sign = match hint {
            Some(h) if h < 0.0 => -1.0,
            _ => 1.0,
        };
        let x = match self {
            ElementarySquash::Identity | ElementarySquash::Cube if y == 0.0 => 0.0,
            ElementarySquash::Identity => y,
            ElementarySquash::Logistic => {
                let y = y.clamp(EDGE, 1.0 - EDGE);
                (y / (1.0 - y)).ln()
            }
            ElementarySquash::Tanh => y.clamp(-1.0 + EDGE, 1.0 - EDGE).atanh(),
            ElementarySquash::Relu => {
                if y > 0.0 {
                    y
                } else {
                    hint.map_or(0.0, |h| h.min(0.0))
                }
            }
            ElementarySquash::LeakyRelu => {
                if y > 0.0 {
                    y
                } else {
                    y / LEAKY_SLOPE
                }
            }
            ElementarySquash::Elu => {
                if y > 0.0 {
                    y
                } else {
                    (y + 1.0).max(EDGE).ln()
                }
            }
            ElementarySquash::Selu => {
                if y > 0.0 {
                    y / SELU_LAMBDA
                } else {
                    (y / (SELU_LAMBDA * SELU_ALPHA) + 1.0).max(EDGE).ln()
                }
            }
            ElementarySquash::Softsign => {
                let y = y.clamp(-1.0 + EDGE, 1.0 - EDGE);
                y / (1.0 - y.abs())
            }
            ElementarySquash::Softplus => {
                let y = y.max(EDGE);
                if y > 20.0 {
                    y + (-(-y).exp()).ln_1p()
                } else {
                    y.exp_m1().ln()
                }
            }
            ElementarySquash::BentIdentity => {
                let u = 2.0 * y + 1.0;
                (2.0 * u - (u * u + 3.0).sqrt()) / 3.0
            }
            ElementarySquash::ArcTan => y.clamp(-FRAC_PI_2 + EDGE, FRAC_PI_2 - EDGE).tan(),
            ElementarySquash::Cube => y.cbrt(),
            ElementarySquash::Exponential => y.max(f64::MIN_POSITIVE).ln(),
            ElementarySquash::Clipped => {
                if y.abs() >= 1.0 {
                    hint.filter(|h| h.signum() == y.signum() && h.abs() >= 1.0)
                        .unwrap_or(y.clamp(-1.0, 1.0))
                } else {
                    y
                }
            }
            ElementarySquash::Absolute => hint_sign * y.abs(),
            ElementarySquash::Gaussian => {
                let y = y.clamp(f64::MIN_POSITIVE, 1.0);
                hint_sign * (-y.ln()).sqrt()
            }
        };
        x.is_finite().then_some(x)
    }

    /// `dy/dx` at pre-activation `x` with output `y`
    pub fn derivative(&self, x: f64, y: f64) -> f64 {
        let d = match self {
            ElementarySquash::Identity => 1.0,
            ElementarySquash::Logistic => y * (1.0 - y),
            ElementarySquash::Tanh => 1.0 - y * y,
            ElementarySquash::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ElementarySquash::LeakyRelu => {
                if x > 0.0 {
                    1.0
                } else {
                    LEAKY_SLOPE
                }
            }
            ElementarySquash::Elu => {
                if x > 0.0 {
                    1.0
                } else {
                    y + 1.0
                }
            }
            ElementarySquash::Selu => {
                if x > 0.0 {
                    SELU_LAMBDA
                } else {
                    y + SELU_LAMBDA * SELU_ALPHA
                }
            }
            ElementarySquash::Softsign => {
                let d = 1.0 + x.abs();
                1.0 / (d * d)
            }
            ElementarySquash::Softplus => 1.0 / (1.0 + (-x).exp()),
            ElementarySquash::BentIdentity => x / (2.0 * (x * x + 1.0).sqrt()) + 1.0,
            ElementarySquash::ArcTan => 1.0 / (1.0 + x * x),
            ElementarySquash::Cube => 3.0 * x * x,
            ElementarySquash::Exponential => y,
            ElementarySquash::Clipped => {
                if x.abs() < 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ElementarySquash::Absolute => {
                if x < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            ElementarySquash::Gaussian => -2.0 * x * y,
        };
        stabilize(d)
    }
}

impl ActivationStrategy for ElementarySquash {
    fn name(&self) -> &'static str {
        ElementarySquash::name(self)
    }

    fn range(&self) -> ActivationRange {
        self.output_range()
    }

    fn uses_bias(&self) -> bool {
        true
    }

    fn activate(&self, stimulus: &Stimulus) -> f64 {
        self.squash(stabilize(stimulus.weighted_sum() + stimulus.bias))
    }

    fn activate_and_trace(&self, stimulus: &Stimulus) -> Activation {
        let state = stabilize(stimulus.weighted_sum() + stimulus.bias);
        let value = self.squash(state);
        Activation {
            value,
            state,
            derivative: self.derivative(state, value),
            selected: None,
            branch: None,
        }
    }

    fn inverse(&self, activation: f64, hint: Option<f64>) -> Result<f64, NumericError> {
        require_finite("activation", activation)?;
        self.unsquash(activation, hint).ok_or_else(|| {
            NumericError::non_finite(format!("{} inverse of {}", self.name(), activation), f64::NAN)
        })
    }

    fn propagate(
        &self,
        pass: &mut Propagator<'_>,
        index: usize,
        target: f64,
    ) -> NeuralResult<f64> {
        weighted_sum::propagate(pass, *self, index, target)
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

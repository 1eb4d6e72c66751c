//! Numerical stability utilities and bound-respecting parameter transforms.
//!
//! Provides safe implementations of common nonlinear transforms
//! that are prone to overflow/underflow in naïve form.
//! The functions here use explicit cutoffs (`|x| > 20.0`) to keep `f64`
//! arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`EIGEN_EPS`]: eigenvalue cutoff for pseudoinverses of curvature
//!   matrices.
//! - [`BOUND_EPS`]: relative distance by which a value sitting exactly on
//!   a bound is moved inside before it is mapped to optimizer space.
//! - [`safe_softplus(x)`] / [`safe_softplus_inv(x)`]: ℝ ↔ (0, ∞).
//! - [`safe_logistic(x)`] / [`safe_logit(p)`]: ℝ ↔ (0, 1).
//! - [`ParamTransform`]: per-parameter map between a bounded model value
//!   and an unconstrained optimizer coordinate, with its Jacobian.

use serde::{Deserialize, Serialize};

/// Eigenvalues of a curvature matrix at or below this value are treated as
/// zero when forming pseudoinverses.
pub const EIGEN_EPS: f64 = 1e-12;

/// Relative nudge applied to values sitting on a bound.
pub const BOUND_EPS: f64 = 1e-9;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// - For sufficiently large `x`, `softplus(x) ≈ x + ln1p(exp(-x)) ≈ x`.
/// - Otherwise, it falls back to `ln1p(exp(x))`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: solves for `t` in
/// `softplus(t) = x`, returning `t = ln(exp(x) - 1)`.
///
/// `x` must be finite and `> 0`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// Numerically stable logistic `1 / (1 + exp(-x))`.
///
/// Branches on the sign of `x` so `exp` is only ever called on a
/// non-positive argument.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`safe_logistic`] on `(0, 1)`: `ln(p / (1 - p))`.
pub fn safe_logit(p: f64) -> f64 {
    p.ln() - (-p).ln_1p()
}

/// Derivative of softplus, `σ(x)`.
fn softplus_deriv(x: f64) -> f64 {
    safe_logistic(x)
}

/// Map between a model-space parameter value `x` and an unconstrained
/// optimizer coordinate `t`.
///
/// Variants
/// --------
/// - `Bounded { min, max }`: `x = min + (max − min)·σ(t)`.
/// - `Lower { min, scale }`: `x = min + scale·softplus(t)`.
/// - `Upper { max, scale }`: `x = max − scale·softplus(t)`.
/// - `Scaled { scale }`: `x = scale·t`.
///
/// `scale` is the magnitude of the initial value (1 when that is 0), so
/// every coordinate starts at order one whatever the parameter's units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamTransform {
    Bounded { min: f64, max: f64 },
    Lower { min: f64, scale: f64 },
    Upper { max: f64, scale: f64 },
    Scaled { scale: f64 },
}

impl ParamTransform {
    /// Pick the transform for a parameter with optional bounds, using
    /// `value` to set the scale of one-sided and unbounded coordinates.
    pub fn for_bounds(min: Option<f64>, max: Option<f64>, value: f64) -> Self {
        let scale = if value.abs() > 0.0 && value.is_finite() { value.abs() } else { 1.0 };
        match (min, max) {
            (Some(min), Some(max)) => ParamTransform::Bounded { min, max },
            (Some(min), None) => {
                let gap = (value - min).abs();
                ParamTransform::Lower { min, scale: if gap > 0.0 { gap } else { scale } }
            }
            (None, Some(max)) => {
                let gap = (max - value).abs();
                ParamTransform::Upper { max, scale: if gap > 0.0 { gap } else { scale } }
            }
            (None, None) => ParamTransform::Scaled { scale },
        }
    }

    /// Model value → optimizer coordinate.
    ///
    /// Values on (or numerically outside) a bound are first moved inside
    /// by [`BOUND_EPS`] relative to the bound's span so the result is
    /// finite.
    pub fn to_internal(&self, x: f64) -> f64 {
        match *self {
            ParamTransform::Bounded { min, max } => {
                let span = max - min;
                let p = ((x - min) / span).clamp(BOUND_EPS, 1.0 - BOUND_EPS);
                safe_logit(p)
            }
            ParamTransform::Lower { min, scale } => {
                safe_softplus_inv(((x - min) / scale).max(BOUND_EPS))
            }
            ParamTransform::Upper { max, scale } => {
                safe_softplus_inv(((max - x) / scale).max(BOUND_EPS))
            }
            ParamTransform::Scaled { scale } => x / scale,
        }
    }

    /// Optimizer coordinate → model value. Always within the bounds.
    pub fn to_external(&self, t: f64) -> f64 {
        match *self {
            ParamTransform::Bounded { min, max } => min + (max - min) * safe_logistic(t),
            ParamTransform::Lower { min, scale } => min + scale * safe_softplus(t),
            ParamTransform::Upper { max, scale } => max - scale * safe_softplus(t),
            ParamTransform::Scaled { scale } => scale * t,
        }
    }

    /// `dx/dt` at optimizer coordinate `t`.
    pub fn jacobian(&self, t: f64) -> f64 {
        match *self {
            ParamTransform::Bounded { min, max } => {
                let s = safe_logistic(t);
                (max - min) * s * (1.0 - s)
            }
            ParamTransform::Lower { scale, .. } => scale * softplus_deriv(t),
            ParamTransform::Upper { scale, .. } => -scale * softplus_deriv(t),
            ParamTransform::Scaled { scale } => scale,
        }
    }
}

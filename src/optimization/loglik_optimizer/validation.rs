//! loglik_optimizer::validation — finiteness and shape checks on everything
//! the optimizer consumes or returns.
//!
//! A Poisson fit evaluates npred cubes at parameter points the solver
//! chooses, so a single overflowing cell turns the likelihood, its
//! gradient, or the curvature used for the covariance into `NaN`/`±∞`.
//! These checks stop such values at the optimizer boundary and report them
//! as typed [`OptError`]s carrying the offending index and value:
//!
//! - options: [`verify_tol_grad`], [`verify_tol_cost`], [`verify_step`]
//!   (tolerances and finite-difference / simplex steps are `> 0` and finite);
//! - iterates: [`validate_theta`], [`validate_theta_hat`];
//! - objective outputs: [`validate_value`], [`validate_grad`],
//!   [`validate_hessian`].
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta, types::Hessian},
};

/// Reason attached to any non-finite tolerance or step.
const NOT_FINITE: &str = "must be finite";
/// Reason attached to any zero or negative tolerance or step.
const NOT_POSITIVE: &str = "must be strictly positive";

/// Optional L-BFGS gradient-norm tolerance; `None` keeps argmin's default.
///
/// # Errors
/// [`OptError::InvalidTolGrad`] for a non-finite or non-positive value.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if let Some(reason) = positive_reason(tol) {
            return Err(OptError::InvalidTolGrad { tol, reason });
        }
    }
    Ok(())
}

/// Optional cost-change tolerance (simplex spread for Nelder–Mead).
///
/// # Errors
/// [`OptError::InvalidTolCost`] for a non-finite or non-positive value.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if let Some(reason) = positive_reason(tol) {
            return Err(OptError::InvalidTolCost { tol, reason });
        }
    }
    Ok(())
}

/// Step in optimizer coordinates: npred derivatives, covariance Hessian, or
/// the initial simplex edge.
///
/// # Errors
/// [`OptError::InvalidStep`] unless the step is finite and `> 0`.
pub fn verify_step(step: f64) -> OptResult<()> {
    match positive_reason(step) {
        Some(reason) => Err(OptError::InvalidStep { step, reason }),
        None => Ok(()),
    }
}

/// Gradient of the log-likelihood: `dim` entries, all finite.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] on a length mismatch.
/// - [`OptError::InvalidGradient`] at the first non-finite entry.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match first_non_finite(grad) {
        Some((index, value)) => Err(OptError::InvalidGradient {
            index,
            value,
            reason: "gradient entries must be finite",
        }),
        None => Ok(()),
    }
}

/// A point in optimizer coordinates with finite entries.
///
/// # Errors
/// [`OptError::InvalidThetaHat`] at the first non-finite coordinate.
pub fn validate_theta(theta: &Theta) -> OptResult<()> {
    match first_non_finite(theta) {
        Some((index, value)) => Err(OptError::InvalidThetaHat {
            index,
            value,
            reason: "optimizer coordinates must be finite",
        }),
        None => Ok(()),
    }
}

/// The solver's best point, which argmin reports as optional.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] when the solver produced no point.
/// - [`OptError::InvalidThetaHat`] as for [`validate_theta`].
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    validate_theta(&theta)?;
    Ok(theta)
}

/// Log-likelihood value; any finite number, sign included, is accepted.
///
/// # Errors
/// [`OptError::NonFiniteCost`] for `NaN` or `±∞`.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// Curvature matrix used for the covariance: `dim × dim`, all finite.
///
/// # Errors
/// - [`OptError::HessianDimMismatch`] on a shape mismatch.
/// - [`OptError::InvalidHessian`] at the first non-finite entry, row-major.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.dim() != (dim, dim) {
        return Err(OptError::HessianDimMismatch { expected: dim, found: hessian.dim() });
    }
    match hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(OptError::InvalidHessian { row, col, value }),
        None => Ok(()),
    }
}

// ---- Helper methods ----

fn positive_reason(x: f64) -> Option<&'static str> {
    if !x.is_finite() {
        Some(NOT_FINITE)
    } else if x <= 0.0 {
        Some(NOT_POSITIVE)
    } else {
        None
    }
}

fn first_non_finite(v: &Theta) -> Option<(usize, f64)> {
    v.iter().copied().enumerate().find(|(_, x)| !x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Rejection of non-finite and non-positive inputs, with the offending
    // position reported.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Tolerances and steps must be finite and positive; absent tolerances
    // are fine.
    fn tolerances_and_steps_must_be_positive_and_finite() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(Some(1e-9)).is_ok());
        assert!(verify_step(1e-5).is_ok());

        assert!(matches!(
            verify_tol_grad(Some(0.0)),
            Err(OptError::InvalidTolGrad { reason, .. }) if reason == NOT_POSITIVE
        ));
        assert!(matches!(
            verify_tol_cost(Some(f64::NAN)),
            Err(OptError::InvalidTolCost { reason, .. }) if reason == NOT_FINITE
        ));
        assert!(matches!(
            verify_step(-1e-4),
            Err(OptError::InvalidStep { step, .. }) if step == -1e-4
        ));
    }

    #[test]
    // Purpose
    // -------
    // Vector and matrix checks point at the first bad entry.
    fn non_finite_entries_are_located() {
        let theta = array![0.5, f64::INFINITY, f64::NAN];
        let mut hess = Array2::<f64>::eye(2);
        hess[[1, 0]] = f64::NAN;

        assert!(matches!(
            validate_theta_hat(Some(theta.clone())),
            Err(OptError::InvalidThetaHat { index: 1, .. })
        ));
        assert!(matches!(validate_theta_hat(None), Err(OptError::MissingThetaHat)));
        assert!(matches!(
            validate_grad(&theta, 3),
            Err(OptError::InvalidGradient { index: 1, .. })
        ));
        assert!(matches!(
            validate_grad(&theta, 2),
            Err(OptError::GradientDimMismatch { expected: 2, found: 3 })
        ));
        assert!(matches!(
            validate_hessian(&hess, 2),
            Err(OptError::InvalidHessian { row: 1, col: 0, .. })
        ));
        assert!(matches!(validate_value(f64::NEG_INFINITY), Err(OptError::NonFiniteCost { .. })));
        assert!(validate_value(-1e12).is_ok());
    }
}

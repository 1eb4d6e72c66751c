//! loglik_optimizer::finite_diff — finite-difference gradient and Hessian helpers.
//!
//! Purpose
//! -------
//! Provide finite-difference derivatives around a parameter vector, with
//! validation and symmetry cleanup, so the adapter and the fit engine can
//! request derivatives without depending directly on the `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient of a cost closure with
//!   error capture (the adapter's fallback when central differences fail).
//! - [`central_hessian`]: Hessian as the central difference of a fallible
//!   gradient function with an explicit step, symmetrized before return.
//!
//! Invariants & assumptions
//! ------------------------
//! - Any error raised by the objective during differencing is treated as a
//!   hard failure of the derivative.
//! - Returned gradients and Hessians satisfy [`validate_grad`] /
//!   [`validate_hessian`].
//!
//! Conventions
//! -----------
//! - Derivatives are taken in the optimizer's unconstrained coordinates;
//!   mapping back to model units happens in the caller.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian, verify_step},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// Parameters
/// ----------
/// - `theta`: point at which the gradient is approximated.
/// - `func`: cost closure. It must route evaluation errors into
///   `closure_err` and return `NaN` in that case.
/// - `closure_err`: cleared on entry, inspected after differencing.
///
/// Errors
/// ------
/// - The error captured in `closure_err`, converted into `OptError`.
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// central_hessian — Hessian from central differences of a gradient.
///
/// Purpose
/// -------
/// Approximate `H[i, j] = ∂g_i/∂θ_j` by
/// `(g(θ + h·e_j) − g(θ − h·e_j)) / 2h`, then average the off-diagonal
/// pairs.
///
/// Parameters
/// ----------
/// - `grad`: gradient function; may fail.
/// - `theta`: evaluation point; its length sets the dimension.
/// - `step`: absolute step `h`, finite and `> 0`.
///
/// Returns
/// -------
/// `OptResult<Hessian>`: symmetric `n×n` matrix with finite entries.
///
/// Errors
/// ------
/// - `OptError::InvalidStep` for a bad `step`.
/// - Any error returned by `grad`.
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` when a
///   shifted gradient is malformed.
/// - `OptError::InvalidHessian` if a difference quotient is not finite.
///
/// Notes
/// -----
/// - Costs `2n` gradient evaluations.
pub fn central_hessian<F>(grad: &F, theta: &Theta, step: f64) -> OptResult<Hessian>
where
    F: Fn(&Theta) -> OptResult<Grad>,
{
    verify_step(step)?;
    let n = theta.len();
    let mut hess = Hessian::zeros((n, n));
    let mut shifted = theta.clone();
    for j in 0..n {
        shifted[j] = theta[j] + step;
        let g_plus = grad(&shifted)?;
        validate_grad(&g_plus, n)?;
        shifted[j] = theta[j] - step;
        let g_minus = grad(&shifted)?;
        validate_grad(&g_minus, n)?;
        shifted[j] = theta[j];
        hess.column_mut(j).assign(&((g_plus - g_minus) / (2.0 * step)));
    }
    validate_hessian(&hess, n)?;
    symmetrize_hess(&mut hess);
    Ok(hess)
}

// ---- Helper methods ----

/// Replace each off-diagonal pair with its average; the diagonal is left
/// untouched. `hess` must be square.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}

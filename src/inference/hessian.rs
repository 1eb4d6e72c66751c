//! inference::hessian — covariance and standard errors from curvature.
//!
//! Purpose
//! -------
//! Turn the observed information at an optimum (the Hessian of the
//! negative log-likelihood) into a covariance matrix and standard errors,
//! and carry that covariance through a per-coordinate reparameterization.
//!
//! Key behaviors
//! -------------
//! - [`calc_covariance`]: Moore–Penrose pseudoinverse of a symmetric
//!   information matrix via `nalgebra::SymmetricEigen`; eigenvalues at or
//!   below [`EIGEN_EPS`] are dropped.
//! - [`calc_covariance_from_grad`]: build the information matrix with
//!   [`central_hessian`] first, then invert it.
//! - [`transform_covariance`]: `Σ_x = D Σ_t D` for `x_i = g_i(t_i)` with
//!   `D = diag(dx_i/dt_i)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The information matrix is square, finite, and symmetric up to
//!   rounding; it is symmetrized on copy.
//! - No explicit inverse is formed, so singular or weakly identified
//!   directions do not blow up; they contribute zero variance along the
//!   dropped eigenvectors.
//!
//! Conventions
//! -----------
//! - Curvature is on the *summed* negative log-likelihood scale, so the
//!   pseudoinverse is directly the parameter covariance.
//! - Errors are reported via [`InferenceResult<T>`].
//!
//! Testing notes
//! -------------
//! - Unit tests compare against analytic inverses of small matrices,
//!   check truncation of a singular direction, and verify the Jacobian
//!   rescaling.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Grad, Theta, finite_diff::central_hessian},
        numerical_stability::transformations::EIGEN_EPS,
    },
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// calc_covariance — pseudoinverse of an observed information matrix.
///
/// Parameters
/// ----------
/// - `obs_info`: `&Array2<f64>`
///   Square `n×n` Hessian of the negative log-likelihood at the optimum.
///
/// Returns
/// -------
/// `InferenceResult<Array2<f64>>`
///   `Σ = Σ_{k: λ_k > EIGEN_EPS} q_k q_kᵀ / λ_k`, symmetric `n×n`.
///
/// Errors
/// ------
/// - [`InferenceError::NotSquare`] / [`InferenceError::NonFinite`] for a
///   malformed matrix.
/// - [`InferenceError::Unidentified`] when `n > 0` and no eigenvalue
///   survives the cutoff.
pub fn calc_covariance(obs_info: &Array2<f64>) -> InferenceResult<Array2<f64>> {
    let (rows, cols) = obs_info.dim();
    if rows != cols {
        return Err(InferenceError::NotSquare { rows, cols });
    }
    if let Some(((row, col), &value)) = obs_info.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(InferenceError::NonFinite { row, col, value });
    }
    if rows == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    let mut obs_info_nalg = DMatrix::<f64>::zeros(rows, cols);
    fill_dmatrix(obs_info, &mut obs_info_nalg);
    pseudo_inverse(obs_info_nalg)
}

/// Build the information matrix from a gradient of the negative
/// log-likelihood with step `step`, then invert it with
/// [`calc_covariance`].
///
/// Returns `(covariance, standard_errors)`.
pub fn calc_covariance_from_grad<F>(
    grad: &F, theta_hat: &Theta, step: f64,
) -> InferenceResult<(Array2<f64>, Array1<f64>)>
where
    F: Fn(&Theta) -> OptResult<Grad>,
{
    let obs_info = central_hessian(grad, theta_hat, step)?;
    let cov = calc_covariance(&obs_info)?;
    let se = standard_errors(&cov);
    Ok((cov, se))
}

/// Square roots of the diagonal. Tiny negative diagonals from rounding are
/// clamped to zero.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}

/// Propagate a covariance through an elementwise reparameterization:
/// `Σ_x[i, j] = d_i · Σ_t[i, j] · d_j`.
///
/// # Errors
/// - [`InferenceError::NotSquare`] if `cov` is not square.
/// - [`InferenceError::JacobianLength`] if `jacobian.len()` differs from the
///   dimension of `cov`.
pub fn transform_covariance(
    cov: &Array2<f64>, jacobian: &Array1<f64>,
) -> InferenceResult<Array2<f64>> {
    let (rows, cols) = cov.dim();
    if rows != cols {
        return Err(InferenceError::NotSquare { rows, cols });
    }
    if jacobian.len() != rows {
        return Err(InferenceError::JacobianLength { expected: rows, found: jacobian.len() });
    }
    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| jacobian[i] * cov[[i, j]] * jacobian[j]))
}

// ---- Helper methods ----

/// Copy a square `ndarray` matrix into a preallocated `DMatrix`, averaging
/// each off-diagonal pair so the result is exactly symmetric.
fn fill_dmatrix(obs_info: &Array2<f64>, obs_info_nalg: &mut DMatrix<f64>) {
    let n = obs_info.ncols();
    for j in 0..n {
        obs_info_nalg[(j, j)] = obs_info[[j, j]];
        for i in (j + 1)..n {
            let avg = 0.5 * (obs_info[[i, j]] + obs_info[[j, i]]);
            obs_info_nalg[(i, j)] = avg;
            obs_info_nalg[(j, i)] = avg;
        }
    }
}

/// Eigen-truncated pseudoinverse `Σ_k q_k q_kᵀ / λ_k` over `λ_k > EIGEN_EPS`.
fn pseudo_inverse(obs_info_nalg: DMatrix<f64>) -> InferenceResult<Array2<f64>> {
    let n = obs_info_nalg.nrows();
    let eigen_decomp = obs_info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let kept: Vec<(usize, f64)> = eigen_decomp
        .eigenvalues
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, lambda)| *lambda > EIGEN_EPS)
        .collect();
    if kept.is_empty() {
        return Err(InferenceError::Unidentified { cutoff: EIGEN_EPS });
    }
    if kept.len() < n {
        tracing::debug!(dropped = n - kept.len(), "flat directions excluded from covariance");
    }
    let mut cov = Array2::<f64>::zeros((n, n));
    for (k, lambda) in kept {
        for i in 0..n {
            let qi = q[(i, k)] / lambda;
            for j in 0..n {
                cov[[i, j]] += qi * q[(j, k)];
            }
        }
    }
    Ok(cov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Copying (and symmetrizing) into `DMatrix`.
    // - Agreement of the pseudoinverse with the analytic inverse of a
    //   positive-definite matrix.
    // - Truncation of a singular direction and the all-flat failure.
    // - The gradient-based path and Jacobian rescaling.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `fill_dmatrix` copies the diagonal and averages off-diagonal pairs.
    fn fill_dmatrix_copies_and_symmetrizes() {
        let obs_info = array![[2.0, 0.4], [0.6, 1.0]];
        let mut m = DMatrix::<f64>::zeros(2, 2);

        fill_dmatrix(&obs_info, &mut m);

        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(1, 1)], 1.0);
        assert_relative_eq!(m[(0, 1)], 0.5, epsilon = 1e-15);
        assert_relative_eq!(m[(1, 0)], 0.5, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // For a positive-definite matrix the pseudoinverse is the inverse.
    //
    // Given
    // -----
    // - H = [[4, 1], [1, 2]], det = 7.
    //
    // Expect
    // ------
    // - Σ = [[2, −1], [−1, 4]] / 7.
    fn covariance_of_pd_matrix_is_inverse() {
        let h = array![[4.0, 1.0], [1.0, 2.0]];

        let cov = calc_covariance(&h).unwrap();

        assert_relative_eq!(cov[[0, 0]], 2.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], -1.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 0]], -1.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 1]], 4.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A flat direction is dropped instead of producing infinities; a fully
    // flat matrix is reported as unidentified.
    fn singular_directions_are_truncated() {
        let h = array![[4.0, 0.0], [0.0, 0.0]];

        let cov = calc_covariance(&h).unwrap();

        assert_relative_eq!(cov[[0, 0]], 0.25, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 1]], 0.0, epsilon = 1e-12);
        assert!(matches!(
            calc_covariance(&Array2::zeros((2, 2))),
            Err(InferenceError::Unidentified { .. })
        ));
        assert!(matches!(
            calc_covariance(&Array2::zeros((2, 3))),
            Err(InferenceError::NotSquare { rows: 2, cols: 3 })
        ));
        assert!(matches!(
            calc_covariance(&array![[f64::NAN]]),
            Err(InferenceError::NonFinite { row: 0, col: 0, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The gradient path recovers classical SEs of a diagonal quadratic.
    //
    // Given
    // -----
    // - g(θ) = A θ with A = diag(4, 1).
    //
    // Expect
    // ------
    // - SEs ≈ [0.5, 1.0].
    fn covariance_from_gradient_matches_analytic_se() {
        let a = array![[4.0, 0.0], [0.0, 1.0]];
        let grad = |theta: &Theta| -> OptResult<Grad> { Ok(a.dot(theta)) };

        let (cov, se) = calc_covariance_from_grad(&grad, &array![1.0, -1.0], 1e-4).unwrap();

        assert_relative_eq!(se[0], 0.5, epsilon = 1e-8);
        assert_relative_eq!(se[1], 1.0, epsilon = 1e-8);
        assert_relative_eq!(cov[[0, 1]], 0.0, epsilon = 1e-8);
    }

    #[test]
    // Purpose
    // -------
    // Rescaling multiplies row i and column j by the Jacobian entries.
    fn transform_covariance_applies_diagonal_jacobian() {
        let cov = array![[1.0, 0.5], [0.5, 2.0]];
        let jac = array![2.0, -3.0];

        let out = transform_covariance(&cov, &jac).unwrap();

        assert_eq!(out, array![[4.0, -3.0], [-3.0, 18.0]]);
        assert!(matches!(
            transform_covariance(&cov, &array![1.0]),
            Err(InferenceError::JacobianLength { expected: 2, found: 1 })
        ));
    }
}

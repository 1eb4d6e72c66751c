//! loglik_optimizer::builders — solver construction helpers.
//!
//! Purpose
//! -------
//! Hide argmin's generic wiring behind small builders that apply the
//! crate-level [`MLEOptions`] (tolerances, L-BFGS memory, simplex size).
//!
//! Key behaviors
//! -------------
//! - L-BFGS with either Hager–Zhang or More–Thuente line search, with
//!   optional gradient and cost-change tolerances via [`configure_lbfgs`].
//! - Nelder–Mead with an axis-aligned initial simplex around `θ₀` and the
//!   cost tolerance used as the simplex standard-deviation criterion.
//!
//! Conventions
//! -----------
//! - L-BFGS builders do **not** set `θ₀` or `max_iters`; the runner does.
//!   The Nelder–Mead simplex carries `θ₀` by construction.
//! - argmin configuration errors surface as [`OptResult`] values.
//!
//! Testing notes
//! -------------
//! - Unit tests check memory/tolerance propagation and the simplex layout.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, NelderMeadSolver, Theta,
        },
    },
};

/// Build L-BFGS with Hager–Zhang line search.
///
/// Uses `opts.lbfgs_mem` (default [`DEFAULT_LBFGS_MEM`]) and the optional
/// tolerances in `opts.tols`.
///
/// # Errors
/// - `OptError` (via `From<argmin::core::Error>`) when argmin rejects a
///   tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Build L-BFGS with More–Thuente line search; see
/// [`build_optimizer_hager_zhang`] for the options consulted.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Apply optional gradient and cost-change tolerances to an L-BFGS solver.
///
/// A `None` tolerance leaves argmin's default in effect.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// build_optimizer_nelder_mead — simplex solver started around `theta0`.
///
/// Parameters
/// ----------
/// - `theta0`: first vertex of the simplex.
/// - `opts`: `simplex_step` sets the offset of the other `n` vertices,
///   `θ₀ + step·e_i`; `tols.tol_cost`, if present, becomes the simplex
///   standard-deviation tolerance.
///
/// Errors
/// ------
/// - [`OptError::InvalidThetaHat`] when `theta0` is empty.
/// - `OptError` from argmin when the tolerance is rejected.
pub fn build_optimizer_nelder_mead(theta0: &Theta, opts: &MLEOptions) -> OptResult<NelderMeadSolver> {
    if theta0.is_empty() {
        return Err(OptError::InvalidThetaHat {
            index: 0,
            value: f64::NAN,
            reason: "Nelder-Mead needs at least one parameter.",
        });
    }
    let mut solver = NelderMeadSolver::new(initial_simplex(theta0, opts.simplex_step));
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_sd_tolerance(c)?;
    }
    Ok(solver)
}

// ---- Helper methods ----

fn initial_simplex(theta0: &Theta, step: f64) -> Vec<Theta> {
    let mut simplex = Vec::with_capacity(theta0.len() + 1);
    simplex.push(theta0.clone());
    for i in 0..theta0.len() {
        let mut vertex = theta0.clone();
        vertex[i] += step;
        simplex.push(vertex);
    }
    simplex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{
        DEFAULT_SIMPLEX_STEP, LineSearcher, Solver, Tolerances,
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction of both L-BFGS variants with default and explicit
    //   memory.
    // - Tolerance wiring, including all-absent tolerances.
    // - The Nelder–Mead initial simplex.
    //
    // They intentionally DO NOT cover executor behavior (see `run`).
    // -------------------------------------------------------------------------

    fn opts(solver: Solver, mem: Option<usize>, tols: Tolerances) -> MLEOptions {
        MLEOptions::new(tols, solver, mem, DEFAULT_SIMPLEX_STEP).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Both line-search variants build with default and explicit memory.
    fn lbfgs_builders_accept_default_and_explicit_memory() {
        let tols = Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).unwrap();
        for mem in [None, Some(11)] {
            let hz = opts(Solver::Lbfgs(LineSearcher::HagerZhang), mem, tols);
            let mt = opts(Solver::Lbfgs(LineSearcher::MoreThuente), mem, tols);

            assert!(build_optimizer_hager_zhang(&hz).is_ok());
            assert!(build_optimizer_more_thuente(&mt).is_ok());
        }
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` works with only an iteration cap set.
    fn configure_lbfgs_respects_absent_tolerances() {
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).unwrap();

        let configured = configure_lbfgs(raw, &opts(Solver::default(), None, tols));

        assert!(configured.is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The simplex has n + 1 vertices: θ₀ and θ₀ shifted along each axis.
    fn nelder_mead_simplex_is_axis_aligned_around_theta0() {
        let theta0 = array![1.0, -2.0];

        let simplex = initial_simplex(&theta0, 0.5);

        assert_eq!(simplex, vec![array![1.0, -2.0], array![1.5, -2.0], array![1.0, -1.5]]);
        let o = opts(Solver::NelderMead, None, Tolerances::default());
        assert!(build_optimizer_nelder_mead(&theta0, &o).is_ok());
        assert!(build_optimizer_nelder_mead(&array![], &o).is_err());
    }
}

//! High-level entry point for maximizing a user-provided `LogLikelihood`.
//!
//! This selects the solver named in [`MLEOptions::solver`] (L-BFGS with
//! Hager–Zhang or More–Thuente line search, or Nelder–Mead), wraps the model
//! in an `ArgMinAdapter` (which *minimizes* `-ℓ(θ)`), and delegates the run
//! to the matching runner.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{
            build_optimizer_hager_zhang, build_optimizer_more_thuente, build_optimizer_nelder_mead,
        },
        run::{run_lbfgs, run_nelder_mead},
        traits::{LineSearcher, LogLikelihood, MLEOptions, Solver},
    },
};

/// Maximize a log-likelihood `ℓ(θ)` with the configured solver.
///
/// # Behavior
/// - Validates the initial guess via `f.check(theta0, data)`.
/// - Wraps `(f, data)` in an `ArgMinAdapter` exposing `c(θ) = -ℓ(θ)`.
/// - Builds the solver from `opts.solver` and runs it.
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - Propagates builder errors (invalid tolerances, empty `theta0` for
///   Nelder–Mead).
/// - Propagates runtime errors from the runner (line-search failures,
///   errors raised by `f`).
///
/// # Example
/// ```no_run
/// use gammacube::optimization::{
///     errors::OptResult,
///     loglik_optimizer::{maximize, LogLikelihood, MLEOptions, Theta},
/// };
/// use ndarray::array;
///
/// struct Concave;
/// impl LogLikelihood for Concave {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Concave, array![0.1, -0.2, 0.3], &(), &MLEOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), gammacube::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    tracing::debug!(solver = %opts.solver, n_params = theta0.len(), "maximize");
    match opts.solver {
        Solver::Lbfgs(LineSearcher::MoreThuente) => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        Solver::Lbfgs(LineSearcher::HagerZhang) => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        Solver::NelderMead => {
            let solver = build_optimizer_nelder_mead(&theta0, opts)?;
            run_nelder_mead(opts, problem, solver)
        }
    }
}

//! Execution helpers that run an `argmin` solver on a log-likelihood problem
//! and return a crate-friendly [`OptimOutcome`].
//!
//! Progress is reported through `tracing` at `debug` level: the starting
//! log-likelihood before the run and the termination summary after it.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
use argmin::core::{CostFunction, Executor, IterState, Solver, State};

/// Run a gradient-based solver (L-BFGS) on `problem` starting from `theta0`.
///
/// # Type Parameters
/// - `F`: the log-likelihood type.
/// - `S`: any argmin solver over `IterState<Theta, Grad, (), (), (), f64>`.
///
/// # Behavior
/// - Sets `theta0` and, when present, `opts.tols.max_iter` on the state.
/// - Returns the best parameter and `ℓ(θ̂) = −best_cost`.
///
/// # Errors
/// - Any argmin runtime error (line-search failures, errors raised by the
///   cost or gradient), converted into `OptError`.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, IterState<Theta, Grad, (), (), (), f64>> + Send + 'static,
{
    log_initial_state(&theta0, &problem);
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let outcome = OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )?;
    log_outcome("lbfgs", &outcome);
    Ok(outcome)
}

/// Run a gradient-free solver (Nelder–Mead) on `problem`.
///
/// The simplex already encodes the starting point, so only the iteration
/// cap is configured here. No gradient is reported on the outcome.
///
/// # Errors
/// - Any argmin runtime error, converted into `OptError`.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_nelder_mead<'a, F, S>(
    opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, IterState<Theta, (), (), (), (), f64>> + Send + 'static,
{
    let mut optimizer = Executor::new(problem, solver);
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let outcome = OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        None,
    )?;
    log_outcome("neldermead", &outcome);
    Ok(outcome)
}

// ---- Helper Methods ----

fn log_initial_state<F: LogLikelihood>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) {
    match problem.cost(theta0) {
        Ok(cost) => tracing::debug!(loglik = -cost, n_params = theta0.len(), "optimizer start"),
        Err(err) => tracing::debug!(error = %err, "optimizer start: initial cost failed"),
    }
}

fn log_outcome(solver: &str, outcome: &OptimOutcome) {
    tracing::debug!(
        solver,
        status = %outcome.status,
        converged = outcome.converged,
        iterations = outcome.iterations,
        loglik = outcome.value,
        grad_norm = ?outcome.grad_norm,
        "optimizer finished"
    );
}

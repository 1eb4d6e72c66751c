//! loglik_optimizer — argmin-powered log-likelihood maximizer.
//!
//! Purpose
//! -------
//! Provide a high-level optimization layer for **maximizing
//! log-likelihoods** `ℓ(θ)`. Callers implement a single trait,
//! [`LogLikelihood`], and invoke [`maximize`] to run L-BFGS (More–Thuente or
//! Hager–Zhang line search) or the gradient-free Nelder–Mead simplex.
//!
//! Key behaviors
//! -------------
//! - Convert `ℓ(θ)` into the argmin cost `c(θ) = -ℓ(θ)` via
//!   [`adapter::ArgMinAdapter`], with finite-difference gradients when no
//!   analytic gradient is available.
//! - [`maximize`] validates `θ₀` with [`LogLikelihood::check`], builds the
//!   solver named in [`MLEOptions::solver`] via [`builders`], runs it via
//!   [`run`], and normalizes results into an [`OptimOutcome`].
//! - [`finite_diff::central_hessian`] supplies curvature at the optimum for
//!   covariance estimation.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`LogLikelihood::value`] and [`LogLikelihood::grad`] report invalid
//!   inputs as [`OptError`] values, never panics.
//! - Configuration types ([`Tolerances`], [`MLEOptions`]) are validated on
//!   construction.
//! - [`OptimOutcome::converged`] is `true` only when a convergence criterion
//!   fired; running out of iterations is reported, not raised.
//!
//! Conventions
//! -----------
//! - Parameters live in an unconstrained space as [`Theta`]; mapping from
//!   bounded model parameters happens in the caller (see
//!   `numerical_stability::ParamTransform`).
//! - All user-facing values are log-likelihoods; only the adapter sees
//!   costs.
//! - Errors bubble up as [`OptResult<T>`]; progress is logged with
//!   `tracing` at `debug` level.
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover sign conventions ([`adapter`]), solver
//!   construction ([`builders`]), derivative helpers ([`finite_diff`]),
//!   configuration/outcome invariants ([`traits`]) and end-to-end solves of
//!   a toy bowl ([`api`]).
//!
//! [`OptError`]: crate::optimization::errors::OptError
//! [`OptResult<T>`]: crate::optimization::errors::OptResult

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::finite_diff::central_hessian;
pub use self::traits::{
    DEFAULT_SIMPLEX_STEP, LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Solver,
    Tolerances,
};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Hessian, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{
        LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Solver, Tolerances,
    };
    pub use super::types::{Cost, Grad, Theta};
}

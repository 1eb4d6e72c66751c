//! optimization — likelihood maximization, parameter transforms, and the
//! optimizer error surface.
//!
//! Purpose
//! -------
//! Provide the numerical back end of the fit engine: an argmin-backed
//! log-likelihood maximizer, bound-respecting parameter transforms, and a
//! single error/result surface. The fit engine implements a log-likelihood,
//! chooses a solver and tolerances, and obtains fitted coordinates and
//! diagnostics without touching argmin types.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: [`maximize`](loglik_optimizer::maximize) with
//!   L-BFGS or Nelder–Mead, finite-difference derivative helpers, and
//!   [`OptimOutcome`](loglik_optimizer::OptimOutcome) diagnostics.
//! - `numerical_stability`: guarded scalar transforms and
//!   [`ParamTransform`](numerical_stability::ParamTransform).
//! - `errors`: [`OptError`](errors::OptError) / `OptResult<T>`, including
//!   conversion of argmin errors.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ(θ)` by minimizing `c(θ) = −ℓ(θ)`; outcomes are
//!   expressed in terms of `ℓ`.
//! - Nothing here prints; diagnostics go through `tracing`.
//!
//! Downstream usage
//! ----------------
//! - `cube::fit` implements `LogLikelihood` for the Poisson objective and
//!   maps `OptError` into `CubeError`.
//! - `inference` consumes the Hessian produced by
//!   [`central_hessian`](loglik_optimizer::central_hessian).

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}

//! inference — covariance and standard errors at a fitted optimum.
//!
//! Purpose
//! -------
//! Post-estimation uncertainty for the Poisson fit: invert the observed
//! information (Hessian of the negative log-likelihood) into a covariance
//! matrix and carry it from optimizer coordinates into model units.
//!
//! Key behaviors
//! -------------
//! - [`calc_covariance`]: eigen-truncated pseudoinverse of an information
//!   matrix.
//! - [`calc_covariance_from_grad`]: central-difference Hessian of a
//!   gradient, then [`calc_covariance`].
//! - [`transform_covariance`]: delta-method rescaling for elementwise
//!   reparameterizations.
//!
//! Conventions
//! -----------
//! - Pure numerics; the only logging is a `debug` event when flat
//!   directions are dropped.
//!
//! Downstream usage
//! ----------------
//! - `cube::fit` computes the Hessian in scaled optimizer space, inverts it
//!   here, and rescales with the `ParamTransform` Jacobian before writing
//!   errors into the fitted model.

pub mod errors;
pub mod hessian;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::errors::{InferenceError, InferenceResult};
pub use self::hessian::{
    calc_covariance, calc_covariance_from_grad, standard_errors, transform_covariance,
};

pub mod prelude {
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::hessian::{calc_covariance, calc_covariance_from_grad, transform_covariance};
}

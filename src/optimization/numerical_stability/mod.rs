//! numerical_stability — guarded transforms and shared numeric tolerances.
//!
//! Purpose
//! -------
//! Collect numerically stable scalar transforms and the per-parameter map
//! between bounded model values and the unconstrained coordinates the
//! optimizer works in. Centralizing them keeps the fit engine and the
//! covariance code on the same conventions.
//!
//! Key behaviors
//! -------------
//! - Stable scalar transforms (`safe_softplus`, `safe_logistic` and their
//!   inverses) that never overflow for finite input.
//! - [`ParamTransform`]: logistic for two-sided bounds, softplus offset for
//!   one-sided bounds, affine scaling otherwise; exposes `dx/dt` for chain
//!   rules and covariance rescaling.
//! - Shared tolerances (`EIGEN_EPS`, `BOUND_EPS`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite; bound ordering (`min < max`) is enforced by the
//!   parameter layer before transforms are built.
//! - `to_external` always lands inside the bounds, so model evaluation
//!   never sees an out-of-bounds value during optimization.
//!
//! Conventions
//! -----------
//! - Pure functions; no logging, no I/O.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] cover inverse pairs, tail behavior,
//!   Jacobians against central differences, and bound nudging.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    BOUND_EPS, EIGEN_EPS, ParamTransform, safe_logistic, safe_logit, safe_softplus,
    safe_softplus_inv,
};

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, ParamTransform, safe_logistic, safe_logit, safe_softplus, safe_softplus_inv,
    };
}

//! Error type for curvature-based inference.
//!
//! [`InferenceError`] reports malformed information matrices and wraps
//! optimizer errors raised while differentiating the objective;
//! [`InferenceResult<T>`] is the shared alias.
use crate::optimization::errors::OptError;
use thiserror::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Information matrix is not square.
    #[error("Inference Error: information matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    /// Information matrix contains a NaN or infinite entry.
    #[error("Inference Error: non-finite information entry {value} at ({row}, {col})")]
    NonFinite { row: usize, col: usize, value: f64 },

    /// Jacobian length does not match the matrix dimension.
    #[error("Inference Error: Jacobian has length {found}, expected {expected}")]
    JacobianLength { expected: usize, found: usize },

    /// Every eigenvalue fell at or below the cutoff; no direction is
    /// identified.
    #[error("Inference Error: information matrix has no eigenvalue above {cutoff}")]
    Unidentified { cutoff: f64 },

    /// Failure while computing the Hessian.
    #[error("Inference Error: {0}")]
    Opt(#[from] OptError),
}

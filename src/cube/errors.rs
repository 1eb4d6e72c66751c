//! Errors for the forward evaluator, simulator and fit engine.
//!
//! [`CubeError`] is the top-level taxonomy callers see from `cube`: geometry
//! disagreements, invalid models, degenerate fits, optimizer failures, and
//! invalid predicted counts. Lower-level map and response errors are
//! wrapped; response geometry disagreements surface as
//! [`CubeError::ShapeMismatch`] so callers match on a single variant.
//!
//! Non-convergence is not an error: it is reported as
//! `FitResult::converged == false`.
use crate::{
    inference::errors::InferenceError,
    irf::errors::IrfError,
    maps::errors::MapError,
    models::errors::ModelError,
    optimization::errors::OptError,
};
use thiserror::Error;

pub type CubeResult<T> = Result<T, CubeError>;

#[derive(Debug, Error)]
pub enum CubeError {
    // ---- Inputs ----
    /// Counts, mask, model output or response maps disagree in geometry.
    #[error("Shape mismatch: {reason}")]
    ShapeMismatch { reason: String },

    /// A model parameter violates its bounds or its component's domain.
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),

    /// Predicted counts contain a negative or non-finite mean.
    #[error("Invalid npred value {value} at cell {index:?}")]
    InvalidNpred { index: (usize, usize, usize), value: f64 },

    // ---- Fit ----
    /// Nothing to fit: no free parameters or no unmasked pixels.
    #[error("Degenerate fit: {reason}")]
    DegenerateModel { reason: String },

    /// Objective non-finite at the start, or the solver failed
    /// unrecoverably.
    #[error("Optimizer diverged: {reason}")]
    OptimizerDivergence { reason: String },

    /// Configuration rejected by the optimizer layer.
    #[error("Invalid fit options: {0}")]
    InvalidOptions(OptError),

    /// Covariance estimation failed at the optimum.
    #[error("Covariance estimation failed: {0}")]
    Covariance(#[from] InferenceError),

    // ---- Wrapped ----
    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Irf(IrfError),
}

impl From<IrfError> for CubeError {
    fn from(err: IrfError) -> Self {
        match err {
            IrfError::GeometryMismatch { reason } => CubeError::ShapeMismatch { reason },
            IrfError::Map(MapError::ShapeMismatch { expected, found }) => {
                CubeError::ShapeMismatch {
                    reason: format!("expected shape {expected:?}, found {found:?}"),
                }
            }
            other => CubeError::Irf(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the mapping of response errors into the cube
    // taxonomy.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Response geometry disagreements surface as `ShapeMismatch`; other
    // response errors stay wrapped.
    fn irf_geometry_errors_become_shape_mismatch() {
        let geometry = IrfError::GeometryMismatch { reason: "psf".to_string() };
        let kernel = IrfError::InvalidKernel { reason: "sum".to_string() };

        let a: CubeError = geometry.into();
        let b: CubeError = kernel.into();

        assert!(matches!(a, CubeError::ShapeMismatch { ref reason } if reason == "psf"));
        assert!(matches!(b, CubeError::Irf(IrfError::InvalidKernel { .. })));
    }
}

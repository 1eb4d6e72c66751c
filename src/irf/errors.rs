//! Errors for instrument-response construction and validation.
use crate::maps::errors::MapError;
use thiserror::Error;

pub type IrfResult<T> = Result<T, IrfError>;

/// Unified error type for the `irf` module.
#[derive(Debug, Error)]
pub enum IrfError {
    // ---- Inputs ----
    #[error("Invalid observation: {reason}")]
    InvalidObservation { reason: String },

    /// Provider returned a negative or non-finite quantity.
    #[error("Invalid response value for {quantity} at E = {energy} TeV, offset = {offset} deg: {value}")]
    InvalidResponse { quantity: &'static str, energy: f64, offset: f64, value: f64 },

    // ---- Response artifacts ----
    #[error("Invalid PSF kernel: {reason}")]
    InvalidKernel { reason: String },

    #[error("Invalid energy dispersion: {reason}")]
    InvalidDispersion { reason: String },

    /// Two response components are defined on incompatible geometries.
    #[error("Response geometry mismatch: {reason}")]
    GeometryMismatch { reason: String },

    #[error(transparent)]
    Map(#[from] MapError),
}

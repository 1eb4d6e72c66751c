//! Errors for map geometry, map containers, and artifact persistence.
//!
//! [`MapError`] covers axis/grid validation, shape mismatches between a
//! geometry and its data array, and failures while reading or writing
//! persisted artifacts. [`MapResult<T>`] is the shared alias.
use thiserror::Error;

/// Result alias for map and geometry operations.
pub type MapResult<T> = Result<T, MapError>;

/// Unified error type for the `maps` module.
#[derive(Debug, Error)]
pub enum MapError {
    // ---- Geometry validation ----
    /// Energy axis edges are missing, non-finite, non-positive, or not
    /// strictly increasing.
    #[error("Invalid energy axis: {reason} (index {index}, value {value})")]
    InvalidAxis { index: usize, value: f64, reason: &'static str },

    /// Spatial grid parameters are invalid.
    #[error("Invalid spatial grid: {reason}")]
    InvalidGrid { reason: String },

    // ---- Map data ----
    /// Data array shape does not match the geometry, or two map operands
    /// have different geometries.
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },

    /// Requested slice or cutout lies outside the map.
    #[error("Slice out of range: {reason}")]
    SliceOutOfRange { reason: String },

    // ---- Persistence ----
    /// Artifact on disk has a different kind tag than the one requested.
    #[error("Artifact kind mismatch: expected '{expected}', found '{found}'")]
    KindMismatch { expected: String, found: String },

    /// Artifact was written by an unsupported format version.
    #[error("Unsupported artifact format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Underlying file system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Artifact decoded but violates its own invariants.
    #[error("Invalid artifact contents: {reason}")]
    InvalidArtifact { reason: String },
}

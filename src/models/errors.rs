//! Errors for sky-model parameters and components.
use thiserror::Error;

/// Result alias for model construction and parameter updates.
pub type ModelResult<T> = Result<T, ModelError>;

/// Unified error type for the `models` module.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    // ---- Parameter values ----
    /// Value lies outside the declared `[min, max]` range.
    #[error("Parameter '{name}' = {value} outside bounds [{min:?}, {max:?}]")]
    OutOfBounds { name: String, value: f64, min: Option<f64>, max: Option<f64> },

    /// Bounds are non-finite or `min >= max`.
    #[error("Parameter '{name}' has invalid bounds [{min:?}, {max:?}]")]
    InvalidBounds { name: String, min: Option<f64>, max: Option<f64> },

    /// Value is NaN or infinite.
    #[error("Parameter '{name}' has non-finite value {value}")]
    NonFiniteValue { name: String, value: f64 },

    /// Value is inside its bounds but outside the component's domain.
    #[error("Parameter '{name}' = {value} is invalid: {reason}")]
    InvalidValue { name: String, value: f64, reason: &'static str },

    // ---- Parameter lookup ----
    /// No parameter with this name.
    #[error("Missing parameter '{name}'")]
    MissingParameter { name: String },

    /// Bare name matches parameters in more than one component.
    #[error("Parameter name '{name}' is ambiguous; qualify it with 'spatial.' or 'spectral.'")]
    AmbiguousParameter { name: String },

    /// Two parameters share a name within one component.
    #[error("Duplicate parameter name '{name}'")]
    DuplicateParameter { name: String },

    // ---- Free-parameter vectors ----
    /// Free-value vector length does not match the number of free parameters.
    #[error("Free parameter vector length mismatch: expected {expected}, found {found}")]
    FreeValueLength { expected: usize, found: usize },

    /// Component parameter list does not match its declared kind.
    #[error("Invalid model component: {reason}")]
    InvalidComponent { reason: String },
}

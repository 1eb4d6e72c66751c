//! models — parameterized sky models.
//!
//! Purpose
//! -------
//! Describe gamma-ray sources as a spatial morphology times a differential
//! spectrum, with named, bounded, freezable parameters the fit engine can
//! move.
//!
//! Key behaviors
//! -------------
//! - [`Parameter`] / [`Parameters`]: bounded scalar knobs with unique names.
//! - [`SpatialModel`]: Gaussian, point source, or uniform disk; evaluated as
//!   per-pixel flux fractions on a [`crate::maps::SpatialGrid`].
//! - [`SpectralModel`]: power law or exponential-cutoff power law; evaluated
//!   as bin integrals on an [`crate::maps::EnergyAxis`].
//! - [`SkyModel`]: the composition, exposing a flat qualified parameter list
//!   and the free-parameter vector used by the optimizer.
//!
//! Downstream usage
//! ----------------
//! - `cube::compute_npred` calls [`SkyModel::integrate_geom`]; the fit
//!   engine round-trips free vectors through
//!   [`SkyModel::with_free_values`].

pub mod errors;
pub mod parameter;
pub mod sky_model;
pub mod spatial;
pub mod spectral;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{ModelError, ModelResult};
pub use self::parameter::{Parameter, Parameters};
pub use self::sky_model::SkyModel;
pub use self::spatial::{SpatialKind, SpatialModel};
pub use self::spectral::{SpectralKind, SpectralModel};

pub mod prelude {
    pub use super::{
        ModelError, ModelResult, Parameter, Parameters, SkyModel, SpatialModel, SpectralModel,
    };
}

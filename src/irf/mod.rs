//! irf — instrument response: exposure, background, PSF, energy dispersion.
//!
//! Purpose
//! -------
//! Translate a [`ResponseProvider`] plus an [`Observation`] into the maps and
//! kernels the forward evaluator needs, and bundle them with all geometry
//! checks done once.
//!
//! Key behaviors
//! -------------
//! - [`make_map_exposure_true_energy`] / [`make_map_background`] sample the
//!   provider per pixel and energy bin.
//! - [`PsfKernel`] holds per-energy normalized kernels and performs the
//!   zero-padded convolution.
//! - [`EnergyDispersion`] maps true to reconstructed energy bins.
//! - [`ResponseBundle`] validates exposure/background/PSF/dispersion
//!   compatibility.
//!
//! Downstream usage
//! ----------------
//! - `cube::MapEvaluator` borrows a [`ResponseBundle`]; `cube::compute_npred`
//!   re-runs [`check_response_geometry`] on loose components.

pub mod bundle;
pub mod edisp;
pub mod errors;
pub mod exposure;
pub mod observation;
pub mod provider;
pub mod psf;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::bundle::{ResponseBundle, check_response_geometry};
pub use self::edisp::EnergyDispersion;
pub use self::errors::{IrfError, IrfResult};
pub use self::exposure::{make_map_background, make_map_exposure_true_energy};
pub use self::observation::Observation;
pub use self::provider::{AnalyticResponse, ResponseProvider};
pub use self::psf::PsfKernel;

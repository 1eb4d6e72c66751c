//! cube — forward model, simulation, and Poisson fitting of counts cubes.
//!
//! Purpose
//! -------
//! Tie sky models and instrument responses together: predict counts,
//! draw reproducible Poisson realizations, and fit model parameters back
//! from observed counts.
//!
//! Key behaviors
//! -------------
//! - [`compute_npred`] / [`MapEvaluator`]: sky model × exposure, PSF
//!   convolution, energy dispersion, plus background.
//! - [`simulate_counts`]: seeded Poisson sampling of an npred map.
//! - [`MapFit`] / [`fit`]: Cash-statistic maximum likelihood with
//!   covariance at the optimum, returning a [`FitResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The same evaluator serves simulation and fitting, so both see the
//!   same zero-padded PSF convolution.
//! - No function here mutates its inputs.
//!
//! Conventions
//! -----------
//! - All failures are [`CubeError`]; response geometry disagreements are
//!   reported as [`CubeError::ShapeMismatch`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; the simulate → fit pipeline is
//!   covered by the integration tests in `tests/`.

pub mod errors;
pub mod evaluator;
pub mod fit;
pub mod simulator;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{CubeError, CubeResult};
pub use self::evaluator::{MapEvaluator, compute_npred};
pub use self::fit::{FitOptions, FitResult, MapFit, NPRED_FLOOR, fit};
pub use self::simulator::simulate_counts;

pub mod prelude {
    pub use super::{
        CubeError, CubeResult, FitOptions, FitResult, MapEvaluator, MapFit, compute_npred, fit,
        simulate_counts,
    };
}

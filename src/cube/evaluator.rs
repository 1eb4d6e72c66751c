//! cube::evaluator — predicted counts of a sky model under a response.
//!
//! Purpose
//! -------
//! Turn a [`SkyModel`] into a cube of expected counts (`npred`) for one
//! dataset: integrate the model over the true-energy geometry, fold in
//! exposure, blur with the PSF, migrate to reconstructed energy, and add
//! the background.
//!
//! Key behaviors
//! -------------
//! - [`compute_npred`]: free function over loose response maps; checks
//!   every cross-geometry invariant on each call.
//! - [`MapEvaluator`]: evaluator bound to a validated [`ResponseBundle`];
//!   the fit engine calls it once per objective evaluation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Output geometry is the background geometry.
//! - PSF convolution uses zero padding: flux blurred past the map edge is
//!   lost, identically for simulation and fitting.
//! - Inputs are never mutated; every call allocates a fresh cube.
//!
//! Conventions
//! -----------
//! - Exposure in cm²·s, integrated flux in cm⁻²·s⁻¹, background and npred
//!   in counts per pixel.
use crate::{
    cube::errors::CubeResult,
    irf::{
        bundle::{ResponseBundle, check_response_geometry},
        edisp::EnergyDispersion,
        psf::PsfKernel,
    },
    maps::map::Map,
    models::sky_model::SkyModel,
};
use ndarray::Array3;

/// Predicted counts for `model` given loose response components.
///
/// # Errors
/// - [`CubeError::ShapeMismatch`](crate::cube::CubeError::ShapeMismatch)
///   when exposure, background, PSF and dispersion disagree.
/// - [`CubeError::InvalidModel`](crate::cube::CubeError::InvalidModel) when a
///   parameter is out of bounds.
pub fn compute_npred(
    model: &SkyModel, exposure: &Map<f64>, background: &Map<f64>, psf: &PsfKernel,
    edisp: Option<&EnergyDispersion>,
) -> CubeResult<Map<f64>> {
    check_response_geometry(exposure, background, psf, edisp)?;
    let data = npred_cube(model, exposure, background, psf, edisp)?;
    Ok(Map::new(background.geom().clone(), data)?)
}

/// Forward evaluator bound to one response bundle.
#[derive(Debug, Clone, Copy)]
pub struct MapEvaluator<'a> {
    bundle: &'a ResponseBundle,
}

impl<'a> MapEvaluator<'a> {
    pub fn new(bundle: &'a ResponseBundle) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &'a ResponseBundle {
        self.bundle
    }

    /// Predicted counts on the bundle's counts geometry.
    pub fn compute_npred(&self, model: &SkyModel) -> CubeResult<Map<f64>> {
        let data = self.npred_data(model)?;
        Ok(Map::new(self.bundle.counts_geom().clone(), data)?)
    }

    /// Raw npred array without wrapping it in a [`Map`].
    pub(crate) fn npred_data(&self, model: &SkyModel) -> CubeResult<Array3<f64>> {
        let b = self.bundle;
        npred_cube(model, b.exposure(), b.background(), b.psf(), b.edisp())
    }
}

// ---- Helper methods ----

fn npred_cube(
    model: &SkyModel, exposure: &Map<f64>, background: &Map<f64>, psf: &PsfKernel,
    edisp: Option<&EnergyDispersion>,
) -> CubeResult<Array3<f64>> {
    model.validate()?;
    let flux = model.integrate_geom(exposure.geom());
    let counts_true = flux * exposure.data();
    let blurred = psf.convolve_cube(&counts_true)?;
    let mut npred = match edisp {
        Some(edisp) => edisp.apply(&blurred)?,
        None => blurred,
    };
    npred += background.data();
    // Round-off in the convolution can leave tiny negatives.
    npred.mapv_inplace(|v| v.max(0.0));
    Ok(npred)
}

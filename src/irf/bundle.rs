//! irf::bundle — the validated set of response maps for one dataset.
//!
//! Purpose
//! -------
//! Group exposure, background, PSF and optional energy dispersion, and check
//! every cross-geometry invariant once, up front, so the evaluator and the
//! fit engine can assume consistency.
//!
//! Invariants & assumptions
//! ------------------------
//! - Exposure (true energy) and background (reco energy) share one spatial
//!   grid.
//! - PSF energy axis equals the exposure axis; PSF pixel size equals the
//!   grid pixel size.
//! - With dispersion: its true axis equals the exposure axis and its reco
//!   axis equals the background axis. Without: exposure and background
//!   axes are equal.
use crate::{
    irf::{
        edisp::EnergyDispersion,
        errors::{IrfError, IrfResult},
        exposure::{make_map_background, make_map_exposure_true_energy},
        observation::Observation,
        provider::ResponseProvider,
        psf::PsfKernel,
    },
    maps::{geometry::Geometry, map::Map},
};

/// Relative tolerance on PSF vs. grid pixel size.
const BINSZ_RTOL: f64 = 1e-9;

/// Exposure + background + PSF (+ energy dispersion).
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBundle {
    exposure: Map<f64>,
    background: Map<f64>,
    psf: PsfKernel,
    edisp: Option<EnergyDispersion>,
}

impl ResponseBundle {
    /// # Errors
    /// - [`IrfError::GeometryMismatch`] for any violated cross-geometry
    ///   invariant (see module docs).
    pub fn new(
        exposure: Map<f64>, background: Map<f64>, psf: PsfKernel, edisp: Option<EnergyDispersion>,
    ) -> IrfResult<Self> {
        check_response_geometry(&exposure, &background, &psf, edisp.as_ref())?;
        Ok(Self { exposure, background, psf, edisp })
    }

    /// Build every component from `provider`.
    ///
    /// `geom_true` carries the true-energy axis (exposure, PSF) and
    /// `geom_reco` the reconstructed-energy axis (background, counts). When
    /// the axes differ and no dispersion is given, a diagonal response is
    /// used.
    pub fn from_provider<P: ResponseProvider + ?Sized>(
        obs: &Observation, provider: &P, geom_true: &Geometry, geom_reco: &Geometry,
        psf_max_radius: f64, edisp: Option<EnergyDispersion>,
    ) -> IrfResult<Self> {
        let exposure = make_map_exposure_true_energy(obs, provider, geom_true)?;
        let background = make_map_background(obs, provider, geom_reco)?;
        let psf = PsfKernel::from_provider(obs, provider, geom_true, psf_max_radius)?;
        let edisp = match edisp {
            Some(edisp) => Some(edisp),
            None if geom_true.axis != geom_reco.axis => Some(
                EnergyDispersion::from_diagonal_response(&geom_true.axis, &geom_reco.axis)?,
            ),
            None => None,
        };
        Self::new(exposure, background, psf, edisp)
    }

    /// Same response with a different background map.
    pub fn with_background(self, background: Map<f64>) -> IrfResult<Self> {
        Self::new(self.exposure, background, self.psf, self.edisp)
    }

    pub fn exposure(&self) -> &Map<f64> {
        &self.exposure
    }

    pub fn background(&self) -> &Map<f64> {
        &self.background
    }

    pub fn psf(&self) -> &PsfKernel {
        &self.psf
    }

    pub fn edisp(&self) -> Option<&EnergyDispersion> {
        self.edisp.as_ref()
    }

    /// Geometry of predicted and observed counts (the background geometry).
    pub fn counts_geom(&self) -> &Geometry {
        self.background.geom()
    }
}

/// Check the cross-geometry invariants of a response set.
pub fn check_response_geometry(
    exposure: &Map<f64>, background: &Map<f64>, psf: &PsfKernel, edisp: Option<&EnergyDispersion>,
) -> IrfResult<()> {
    let (eg, bg) = (exposure.geom(), background.geom());
    if eg.grid != bg.grid {
        return Err(IrfError::GeometryMismatch {
            reason: format!(
                "exposure grid {:?} differs from background grid {:?}",
                eg.grid.shape(),
                bg.grid.shape()
            ),
        });
    }
    if psf.axis() != &eg.axis {
        return Err(IrfError::GeometryMismatch {
            reason: format!(
                "PSF has {} energy bins, exposure has {}",
                psf.axis().nbins(),
                eg.axis.nbins()
            ),
        });
    }
    if ((psf.binsz() - eg.grid.binsz) / eg.grid.binsz).abs() > BINSZ_RTOL {
        return Err(IrfError::GeometryMismatch {
            reason: format!("PSF pixel size {} vs grid {}", psf.binsz(), eg.grid.binsz),
        });
    }
    match edisp {
        Some(edisp) => {
            if edisp.e_true() != &eg.axis || edisp.e_reco() != &bg.axis {
                return Err(IrfError::GeometryMismatch {
                    reason: format!(
                        "dispersion is {}x{}, exposure/background have {}/{} energy bins",
                        edisp.e_true().nbins(),
                        edisp.e_reco().nbins(),
                        eg.axis.nbins(),
                        bg.axis.nbins()
                    ),
                });
            }
        }
        None => {
            if eg.axis != bg.axis {
                return Err(IrfError::GeometryMismatch {
                    reason: "exposure and background energy axes differ and no dispersion given"
                        .to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        irf::provider::AnalyticResponse,
        maps::geometry::{EnergyAxis, SpatialGrid},
    };

    fn geoms() -> (Geometry, Geometry) {
        let grid = SpatialGrid::new((0.0, 0.0), 0.05, 12, 10).unwrap();
        let true_axis = EnergyAxis::logspace(0.1, 10.0, 3).unwrap();
        let reco_axis = EnergyAxis::logspace(0.1, 10.0, 2).unwrap();
        (Geometry::new(grid.clone(), true_axis), Geometry::new(grid, reco_axis))
    }

    #[test]
    // Purpose
    // -------
    // Building from a provider with different true/reco axes inserts a
    // diagonal dispersion and passes validation.
    fn from_provider_adds_diagonal_dispersion() {
        let (gt, gr) = geoms();
        let obs = Observation::new((0.0, 0.0), 3600.0).unwrap();

        let bundle =
            ResponseBundle::from_provider(&obs, &AnalyticResponse::default(), &gt, &gr, 0.2, None)
                .unwrap();

        assert_eq!(bundle.edisp().unwrap().matrix().dim(), (3, 2));
        assert_eq!(bundle.counts_geom(), &gr);
    }

    #[test]
    // Purpose
    // -------
    // Mismatched axes without dispersion, or a PSF on the wrong axis, are
    // rejected.
    fn mismatched_components_are_rejected() {
        let (gt, gr) = geoms();
        let exposure = Map::filled(gt.clone(), 1.0);
        let background = Map::filled(gr.clone(), 0.1);

        let err =
            ResponseBundle::new(exposure.clone(), background.clone(), PsfKernel::delta(&gt), None)
                .unwrap_err();
        assert!(matches!(err, IrfError::GeometryMismatch { .. }));

        let edisp = EnergyDispersion::from_diagonal_response(&gt.axis, &gr.axis).unwrap();
        let err = ResponseBundle::new(exposure, background, PsfKernel::delta(&gr), Some(edisp))
            .unwrap_err();
        assert!(matches!(err, IrfError::GeometryMismatch { .. }));
    }
}

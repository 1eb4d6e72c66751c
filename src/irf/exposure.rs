//! irf::exposure — exposure and background maps from a response provider.
//!
//! Purpose
//! -------
//! Turn provider queries into the two per-pixel response maps the forward
//! evaluator consumes.
//!
//! Key behaviors
//! -------------
//! - Exposure (cm² s) = effective area at the bin's log-center energy and
//!   the pixel's offset from the pointing × live time.
//! - Background (counts) = band-integrated rate at the pixel's offset ×
//!   pixel solid angle × live time.
//! - Provider outputs are checked: negative or non-finite values fail with
//!   [`IrfError::InvalidResponse`].
use crate::{
    irf::{
        errors::{IrfError, IrfResult},
        observation::Observation,
        provider::ResponseProvider,
    },
    maps::{
        geometry::{Geometry, separation},
        map::Map,
    },
};
use ndarray::{Array2, Array3};

/// Exposure map on a true-energy geometry.
pub fn make_map_exposure_true_energy<P: ResponseProvider + ?Sized>(
    obs: &Observation, provider: &P, geom: &Geometry,
) -> IrfResult<Map<f64>> {
    let offsets = pixel_offsets(obs, geom);
    let mut data = Array3::<f64>::zeros(geom.shape());
    for (ie, energy) in geom.axis.centers().into_iter().enumerate() {
        for ((iy, ix), &offset) in offsets.indexed_iter() {
            let aeff = provider.effective_area(energy, offset);
            check_value("effective_area", energy, offset, aeff)?;
            data[[ie, iy, ix]] = aeff * obs.livetime_s;
        }
    }
    tracing::debug!(shape = ?geom.shape(), livetime_s = obs.livetime_s, "exposure map built");
    Ok(Map::new(geom.clone(), data)?)
}

/// Expected background counts on a reconstructed-energy geometry.
pub fn make_map_background<P: ResponseProvider + ?Sized>(
    obs: &Observation, provider: &P, geom: &Geometry,
) -> IrfResult<Map<f64>> {
    let offsets = pixel_offsets(obs, geom);
    let omega = geom.grid.solid_angle();
    let mut data = Array3::<f64>::zeros(geom.shape());
    for ie in 0..geom.axis.nbins() {
        let (lo, hi) = (geom.axis.lo(ie), geom.axis.hi(ie));
        for ((iy, ix), &offset) in offsets.indexed_iter() {
            let rate = provider.background_rate(lo, hi, offset);
            check_value("background_rate", geom.axis.center(ie), offset, rate)?;
            data[[ie, iy, ix]] = rate * omega[iy] * obs.livetime_s;
        }
    }
    Ok(Map::new(geom.clone(), data)?)
}

// ---- Helper methods ----

fn pixel_offsets(obs: &Observation, geom: &Geometry) -> Array2<f64> {
    let (plon, plat) = obs.pointing;
    Array2::from_shape_fn(geom.grid.shape(), |(iy, ix)| {
        let (lon, lat) = geom.grid.pixel_to_coord(iy, ix);
        separation(plon, plat, lon, lat)
    })
}

fn check_value(quantity: &'static str, energy: f64, offset: f64, value: f64) -> IrfResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(IrfError::InvalidResponse { quantity, energy, offset, value });
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
    use approx::assert_relative_eq;

    struct BrokenProvider;

    impl ResponseProvider for BrokenProvider {
        fn effective_area(&self, _: f64, _: f64) -> f64 {
            f64::NAN
        }
        fn psf_sigma(&self, _: f64, _: f64) -> f64 {
            0.1
        }
        fn background_rate(&self, _: f64, _: f64, _: f64) -> f64 {
            -1.0
        }
    }

    fn geom() -> Geometry {
        let grid = SpatialGrid::new((0.0, 0.0), 0.1, 5, 5).unwrap();
        Geometry::new(grid, EnergyAxis::logspace(0.1, 10.0, 2).unwrap())
    }

    #[test]
    // Purpose
    // -------
    // Exposure at the pointing equals A_eff(center energy, 0) × livetime and
    // decreases away from it.
    fn exposure_peaks_at_pointing() {
        let obs = Observation::new((0.0, 0.0), 100.0).unwrap();
        let provider = AnalyticResponse::default();

        let exposure = make_map_exposure_true_energy(&obs, &provider, &geom()).unwrap();

        let expected = provider.effective_area(geom().axis.center(1), 0.0) * 100.0;
        assert_relative_eq!(exposure.data()[[1, 2, 2]], expected, max_relative = 1e-12);
        assert!(exposure.data()[[1, 0, 0]] < exposure.data()[[1, 2, 2]]);
    }

    #[test]
    // Purpose
    // -------
    // Invalid provider output is surfaced, not written into the map.
    fn invalid_provider_values_are_rejected() {
        let obs = Observation::new((0.0, 0.0), 1.0).unwrap();
        assert!(matches!(
            make_map_exposure_true_energy(&obs, &BrokenProvider, &geom()),
            Err(IrfError::InvalidResponse { quantity: "effective_area", .. })
        ));
        assert!(matches!(
            make_map_background(&obs, &BrokenProvider, &geom()),
            Err(IrfError::InvalidResponse { quantity: "background_rate", .. })
        ));
    }
}

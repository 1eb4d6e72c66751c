//! models::spatial — spatial morphology of a sky model.
//!
//! Purpose
//! -------
//! Describe where on the sky a source emits. Each [`SpatialModel`] is a
//! [`SpatialKind`] tag plus a [`Parameters`] list laid out in a fixed order
//! for that kind.
//!
//! Key behaviors
//! -------------
//! - [`SpatialModel::evaluate`] returns the surface brightness profile in
//!   sr⁻¹, normalized so its integral over the sphere is 1 (small-angle
//!   approximation for the Gaussian).
//! - [`SpatialModel::integrate_on_grid`] returns, per pixel, the fraction of
//!   the source's total flux falling in that pixel: pixel-center density ×
//!   pixel solid angle for extended shapes, bilinear weights over the four
//!   nearest pixel centers for a point source. Flux assigned outside the
//!   grid is dropped.
//!
//! Conventions
//! -----------
//! - Parameter layouts:
//!   - `Gaussian`:    `[lon_0, lat_0, sigma]` (deg)
//!   - `PointSource`: `[lon_0, lat_0]`        (deg)
//!   - `Disk`:        `[lon_0, lat_0, r_0]`   (deg)
use crate::{
    maps::geometry::{SpatialGrid, separation},
    models::{
        errors::{ModelError, ModelResult},
        parameter::{Parameter, Parameters},
    },
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Morphology family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialKind {
    Gaussian,
    PointSource,
    Disk,
}

impl SpatialKind {
    /// Parameter names in layout order.
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            SpatialKind::Gaussian => &["lon_0", "lat_0", "sigma"],
            SpatialKind::PointSource => &["lon_0", "lat_0"],
            SpatialKind::Disk => &["lon_0", "lat_0", "r_0"],
        }
    }
}

/// Spatial component: kind + parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialModel {
    kind: SpatialKind,
    parameters: Parameters,
}

impl SpatialModel {
    /// Symmetric 2-D Gaussian of width `sigma` (deg) centered on
    /// `(lon_0, lat_0)`.
    pub fn gaussian(lon_0: f64, lat_0: f64, sigma: f64) -> ModelResult<Self> {
        Self::from_parameters(
            SpatialKind::Gaussian,
            Parameters::new(vec![
                Parameter::new("lon_0", lon_0, "deg"),
                Parameter::new("lat_0", lat_0, "deg").with_bounds(-90.0, 90.0),
                Parameter::new("sigma", sigma, "deg").with_min(0.0),
            ])?,
        )
    }

    pub fn point_source(lon_0: f64, lat_0: f64) -> ModelResult<Self> {
        Self::from_parameters(
            SpatialKind::PointSource,
            Parameters::new(vec![
                Parameter::new("lon_0", lon_0, "deg"),
                Parameter::new("lat_0", lat_0, "deg").with_bounds(-90.0, 90.0),
            ])?,
        )
    }

    /// Uniform disk of radius `r_0` (deg).
    pub fn disk(lon_0: f64, lat_0: f64, r_0: f64) -> ModelResult<Self> {
        Self::from_parameters(
            SpatialKind::Disk,
            Parameters::new(vec![
                Parameter::new("lon_0", lon_0, "deg"),
                Parameter::new("lat_0", lat_0, "deg").with_bounds(-90.0, 90.0),
                Parameter::new("r_0", r_0, "deg").with_min(0.0),
            ])?,
        )
    }

    /// Assemble from an explicit parameter list, checking it matches `kind`.
    pub fn from_parameters(kind: SpatialKind, parameters: Parameters) -> ModelResult<Self> {
        let model = Self { kind, parameters };
        model.validate()?;
        Ok(model)
    }

    pub fn kind(&self) -> SpatialKind {
        self.kind
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    /// Layout, bounds, and domain checks.
    pub fn validate(&self) -> ModelResult<()> {
        if self.parameters.names() != self.kind.parameter_names() {
            return Err(ModelError::InvalidComponent {
                reason: format!(
                    "{:?} expects parameters {:?}, found {:?}",
                    self.kind,
                    self.kind.parameter_names(),
                    self.parameters.names()
                ),
            });
        }
        self.parameters.validate()?;
        if matches!(self.kind, SpatialKind::Gaussian | SpatialKind::Disk) {
            let width = self.parameters.value_at(2);
            if width <= 0.0 {
                return Err(ModelError::InvalidValue {
                    name: self.kind.parameter_names()[2].to_string(),
                    value: width,
                    reason: "extent must be strictly positive",
                });
            }
        }
        Ok(())
    }

    /// Source position `(lon_0, lat_0)` in degrees.
    pub fn position(&self) -> (f64, f64) {
        (self.parameters.value_at(0), self.parameters.value_at(1))
    }

    /// Surface brightness at `(lon, lat)` in sr⁻¹.
    ///
    /// A point source has no finite surface brightness and evaluates to 0;
    /// use [`SpatialModel::integrate_on_grid`] for binned evaluation.
    pub fn evaluate(&self, lon: f64, lat: f64) -> f64 {
        let (lon_0, lat_0) = self.position();
        match self.kind {
            SpatialKind::Gaussian => {
                let sigma = self.parameters.value_at(2).to_radians();
                let theta = separation(lon_0, lat_0, lon, lat).to_radians();
                (-0.5 * theta * theta / (sigma * sigma)).exp() / (2.0 * PI * sigma * sigma)
            }
            SpatialKind::Disk => {
                let r_0 = self.parameters.value_at(2);
                if separation(lon_0, lat_0, lon, lat) <= r_0 {
                    1.0 / (2.0 * PI * (1.0 - r_0.to_radians().cos()))
                } else {
                    0.0
                }
            }
            SpatialKind::PointSource => 0.0,
        }
    }

    /// Per-pixel flux fraction on `grid`, shape `(ny, nx)`.
    pub fn integrate_on_grid(&self, grid: &SpatialGrid) -> Array2<f64> {
        match self.kind {
            SpatialKind::PointSource => self.point_weights(grid),
            SpatialKind::Gaussian | SpatialKind::Disk => {
                let omega = grid.solid_angle();
                Array2::from_shape_fn(grid.shape(), |(iy, ix)| {
                    let (lon, lat) = grid.pixel_to_coord(iy, ix);
                    self.evaluate(lon, lat) * omega[iy]
                })
            }
        }
    }

    /// Bilinear split of a unit flux among the four surrounding pixel
    /// centers.
    fn point_weights(&self, grid: &SpatialGrid) -> Array2<f64> {
        let (lon_0, lat_0) = self.position();
        let (y, x) = grid.coord_to_pixel(lon_0, lat_0);
        let (y0, x0) = (y.floor(), x.floor());
        let (fy, fx) = (y - y0, x - x0);
        let mut out = Array2::<f64>::zeros(grid.shape());
        let corners = [
            (y0, x0, (1.0 - fy) * (1.0 - fx)),
            (y0, x0 + 1.0, (1.0 - fy) * fx),
            (y0 + 1.0, x0, fy * (1.0 - fx)),
            (y0 + 1.0, x0 + 1.0, fy * fx),
        ];
        for (cy, cx, w) in corners {
            if cy >= 0.0 && cx >= 0.0 && (cy as usize) < grid.ny && (cx as usize) < grid.nx {
                out[[cy as usize, cx as usize]] += w;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Normalization of the Gaussian and disk profiles on a fine grid.
    // - Bilinear flux splitting for point sources, including edge loss.
    // - Layout/domain validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A Gaussian well inside a fine grid must integrate to ~1.
    fn gaussian_integrates_to_unity_on_fine_grid() {
        let grid = SpatialGrid::create((0.0, 0.0), 0.01, (2.0, 2.0)).unwrap();
        let model = SpatialModel::gaussian(0.1, -0.05, 0.1).unwrap();

        let total = model.integrate_on_grid(&grid).sum();

        assert_relative_eq!(total, 1.0, max_relative = 1e-3);
    }

    #[test]
    // Purpose
    // -------
    // A disk much larger than a pixel integrates to ~1 (edge pixels make the
    // discretization error of order pixel/radius).
    fn disk_integrates_close_to_unity() {
        let grid = SpatialGrid::create((0.0, 0.0), 0.005, (1.0, 1.0)).unwrap();
        let model = SpatialModel::disk(0.0, 0.0, 0.3).unwrap();

        let total = model.integrate_on_grid(&grid).sum();

        assert_relative_eq!(total, 1.0, max_relative = 2e-2);
    }

    #[test]
    // Purpose
    // -------
    // A point source between pixel centers is split bilinearly and conserves
    // flux; one placed past the grid edge loses the outside share.
    fn point_source_bilinear_weights() {
        let grid = SpatialGrid::new((0.0, 0.0), 1.0, 4, 4).unwrap();
        // pixel centers at -1.5, -0.5, 0.5, 1.5
        let inside = SpatialModel::point_source(0.0, 0.25).unwrap();
        let w = inside.integrate_on_grid(&grid);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[[1, 1]], 0.25 * 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[[2, 2]], 0.75 * 0.5, epsilon = 1e-12);

        let edge = SpatialModel::point_source(1.75, 0.5).unwrap();
        let w = edge.integrate_on_grid(&grid);
        assert_relative_eq!(w.sum(), 0.75, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A point source just west of lon = 0, written as 359.9, keeps its flux
    // on a grid centered at lon = 0 and agrees with the Gaussian, which
    // goes through the great-circle separation.
    fn point_source_across_longitude_seam_keeps_flux() {
        let grid = SpatialGrid::create((0.0, 0.0), 0.05, (1.0, 1.0)).unwrap();
        let wrapped = SpatialModel::point_source(359.9, 0.0).unwrap();
        let signed = SpatialModel::point_source(-0.1, 0.0).unwrap();

        let w_wrapped = wrapped.integrate_on_grid(&grid);
        let w_signed = signed.integrate_on_grid(&grid);
        let gauss = SpatialModel::gaussian(359.9, 0.0, 0.05).unwrap().integrate_on_grid(&grid);

        assert_relative_eq!(w_wrapped.sum(), 1.0, epsilon = 1e-12);
        for (a, b) in w_wrapped.iter().zip(w_signed.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
        assert_relative_eq!(gauss.sum(), 1.0, max_relative = 1e-3);
    }

    #[test]
    // Purpose
    // -------
    // A zero-width Gaussian is out of domain even though sigma ≥ 0 holds.
    fn zero_sigma_is_rejected() {
        assert!(matches!(
            SpatialModel::gaussian(0.0, 0.0, 0.0),
            Err(ModelError::InvalidValue { .. })
        ));
    }
}

//! maps::geometry — energy axes, spatial pixel grids, and their product.
//!
//! Purpose
//! -------
//! Describe the discretized sky + energy grid that every map, response, and
//! model evaluation is defined on. Geometry is pure data: it carries the bin
//! layout and a handful of coordinate transforms, nothing else.
//!
//! Key behaviors
//! -------------
//! - [`EnergyAxis`] stores strictly increasing, strictly positive bin edges
//!   in TeV and exposes log-centers and widths.
//! - [`SpatialGrid`] is a regular rectangular grid in a plate-carrée (CAR)
//!   projection around a center `(lon, lat)` in degrees, with per-pixel
//!   solid angles that shrink with |lat|.
//! - [`Geometry`] pairs a grid with an axis and reports the canonical cube
//!   shape `(n_energy, ny, nx)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Axis edges: at least two, finite, `> 0`, strictly increasing.
//! - Grid: `binsz > 0` and finite, `nx ≥ 1`, `ny ≥ 1`, center finite.
//! - Geometries compare by exact equality; callers build related maps from
//!   the same inputs, so no tolerance is applied.
//!
//! Conventions
//! -----------
//! - Row index `iy` runs along latitude, column index `ix` along longitude;
//!   pixel `(0, 0)` is the lowest lon/lat corner.
//! - Angles are degrees at the API surface; solid angles are steradians.
use crate::maps::errors::{MapError, MapResult};
use serde::{Deserialize, Serialize};

/// Energy binning in TeV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyAxis {
    edges: Vec<f64>,
}

impl EnergyAxis {
    /// Build an axis from explicit bin edges.
    ///
    /// # Errors
    /// - [`MapError::InvalidAxis`] if fewer than two edges are given, or any
    ///   edge is non-finite, non-positive, or not strictly above its
    ///   predecessor.
    pub fn from_edges(edges: Vec<f64>) -> MapResult<Self> {
        validate_edges(&edges)?;
        Ok(Self { edges })
    }

    /// Logarithmically spaced axis with `nbins` bins between `emin` and
    /// `emax` (both in TeV).
    pub fn logspace(emin: f64, emax: f64, nbins: usize) -> MapResult<Self> {
        if nbins == 0 {
            return Err(MapError::InvalidAxis {
                index: 0,
                value: 0.0,
                reason: "Axis needs at least one bin.",
            });
        }
        if !(emin > 0.0 && emax > 0.0) {
            return Err(MapError::InvalidAxis {
                index: 0,
                value: emin.min(emax),
                reason: "Logarithmic axis bounds must be strictly positive.",
            });
        }
        let (lmin, lmax) = (emin.log10(), emax.log10());
        let step = (lmax - lmin) / nbins as f64;
        let mut edges: Vec<f64> = (0..=nbins).map(|i| 10f64.powf(lmin + step * i as f64)).collect();
        // pin the end points so they match the requested values bit-for-bit
        edges[0] = emin;
        edges[nbins] = emax;
        Self::from_edges(edges)
    }

    pub fn nbins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of bin `i`.
    pub fn lo(&self, i: usize) -> f64 {
        self.edges[i]
    }

    /// Upper edge of bin `i`.
    pub fn hi(&self, i: usize) -> f64 {
        self.edges[i + 1]
    }

    /// Geometric (log) center of bin `i`.
    pub fn center(&self, i: usize) -> f64 {
        (self.lo(i) * self.hi(i)).sqrt()
    }

    pub fn centers(&self) -> Vec<f64> {
        (0..self.nbins()).map(|i| self.center(i)).collect()
    }

    pub fn widths(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Re-check invariants; used after deserialization.
    pub fn validate(&self) -> MapResult<()> {
        validate_edges(&self.edges)
    }

    /// Sub-axis covering bins `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> MapResult<Self> {
        if start >= end || end > self.nbins() {
            return Err(MapError::SliceOutOfRange {
                reason: format!("energy bins {start}..{end} of {}", self.nbins()),
            });
        }
        Self::from_edges(self.edges[start..=end].to_vec())
    }
}

/// Regular CAR-projected pixel grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialGrid {
    /// Grid center `(lon, lat)` in degrees.
    pub center: (f64, f64),
    /// Pixel size in degrees.
    pub binsz: f64,
    /// Number of columns (longitude direction).
    pub nx: usize,
    /// Number of rows (latitude direction).
    pub ny: usize,
}

impl SpatialGrid {
    /// Construct and validate a grid from explicit pixel counts.
    pub fn new(center: (f64, f64), binsz: f64, nx: usize, ny: usize) -> MapResult<Self> {
        let grid = Self { center, binsz, nx, ny };
        grid.validate()?;
        Ok(grid)
    }

    /// Construct a grid covering `width = (w_lon, w_lat)` degrees.
    ///
    /// Pixel counts are `round(width / binsz)`, at least one.
    pub fn create(center: (f64, f64), binsz: f64, width: (f64, f64)) -> MapResult<Self> {
        if !(binsz.is_finite() && binsz > 0.0) {
            return Err(MapError::InvalidGrid {
                reason: format!("pixel size must be finite and > 0, got {binsz}"),
            });
        }
        if !(width.0.is_finite() && width.0 > 0.0 && width.1.is_finite() && width.1 > 0.0) {
            return Err(MapError::InvalidGrid {
                reason: format!("width must be finite and > 0, got {width:?}"),
            });
        }
        let nx = ((width.0 / binsz).round() as usize).max(1);
        let ny = ((width.1 / binsz).round() as usize).max(1);
        Self::new(center, binsz, nx, ny)
    }

    pub fn validate(&self) -> MapResult<()> {
        if !(self.binsz.is_finite() && self.binsz > 0.0) {
            return Err(MapError::InvalidGrid {
                reason: format!("pixel size must be finite and > 0, got {}", self.binsz),
            });
        }
        if self.nx == 0 || self.ny == 0 {
            return Err(MapError::InvalidGrid {
                reason: format!("grid must have at least one pixel, got {}x{}", self.ny, self.nx),
            });
        }
        if !(self.center.0.is_finite() && self.center.1.is_finite()) {
            return Err(MapError::InvalidGrid {
                reason: format!("center must be finite, got {:?}", self.center),
            });
        }
        let half_height = 0.5 * self.ny as f64 * self.binsz;
        if self.center.1.abs() + half_height > 90.0 {
            return Err(MapError::InvalidGrid {
                reason: "grid extends beyond the poles".to_string(),
            });
        }
        Ok(())
    }

    /// `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// Center coordinate `(lon, lat)` of pixel `(iy, ix)`.
    pub fn pixel_to_coord(&self, iy: usize, ix: usize) -> (f64, f64) {
        self.fractional_pixel_to_coord(iy as f64, ix as f64)
    }

    /// Coordinate of a fractional pixel position.
    pub fn fractional_pixel_to_coord(&self, y: f64, x: f64) -> (f64, f64) {
        let lon = self.center.0 + (x - 0.5 * (self.nx as f64 - 1.0)) * self.binsz;
        let lat = self.center.1 + (y - 0.5 * (self.ny as f64 - 1.0)) * self.binsz;
        (lon, lat)
    }

    /// Fractional pixel position `(y, x)` of a coordinate; pixel centers map
    /// to integers.
    ///
    /// The longitude offset from the grid center is wrapped into
    /// `[-180, 180)`, so 359.9 and -0.1 land on the same pixel.
    pub fn coord_to_pixel(&self, lon: f64, lat: f64) -> (f64, f64) {
        let dlon = (lon - self.center.0 + 180.0).rem_euclid(360.0) - 180.0;
        let x = dlon / self.binsz + 0.5 * (self.nx as f64 - 1.0);
        let y = (lat - self.center.1) / self.binsz + 0.5 * (self.ny as f64 - 1.0);
        (y, x)
    }

    pub fn lon_centers(&self) -> Vec<f64> {
        (0..self.nx).map(|ix| self.pixel_to_coord(0, ix).0).collect()
    }

    pub fn lat_centers(&self) -> Vec<f64> {
        (0..self.ny).map(|iy| self.pixel_to_coord(iy, 0).1).collect()
    }

    /// Solid angle (sr) of every pixel in row `iy`.
    ///
    /// Exact for the CAR projection: `Δlon · (sin lat_hi − sin lat_lo)`.
    pub fn row_solid_angle(&self, iy: usize) -> f64 {
        let (_, lat) = self.pixel_to_coord(iy, 0);
        let half = 0.5 * self.binsz;
        let (lo, hi) = ((lat - half).to_radians(), (lat + half).to_radians());
        self.binsz.to_radians() * (hi.sin() - lo.sin())
    }

    /// Per-row solid angles, indexed by `iy`.
    pub fn solid_angle(&self) -> Vec<f64> {
        (0..self.ny).map(|iy| self.row_solid_angle(iy)).collect()
    }

    /// Sub-grid of `ny × nx` pixels starting at `(iy0, ix0)`.
    pub fn cutout(&self, iy0: usize, ix0: usize, ny: usize, nx: usize) -> MapResult<Self> {
        if ny == 0 || nx == 0 || iy0 + ny > self.ny || ix0 + nx > self.nx {
            return Err(MapError::SliceOutOfRange {
                reason: format!(
                    "cutout {ny}x{nx} at ({iy0}, {ix0}) exceeds grid {}x{}",
                    self.ny, self.nx
                ),
            });
        }
        let y_mid = iy0 as f64 + 0.5 * (ny as f64 - 1.0);
        let x_mid = ix0 as f64 + 0.5 * (nx as f64 - 1.0);
        let center = self.fractional_pixel_to_coord(y_mid, x_mid);
        Self::new(center, self.binsz, nx, ny)
    }
}

/// Great-circle separation in degrees (haversine form).
pub fn separation(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (l1, b1, l2, b2) = (lon1.to_radians(), lat1.to_radians(), lon2.to_radians(), lat2.to_radians());
    let sdb = (0.5 * (b2 - b1)).sin();
    let sdl = (0.5 * (l2 - l1)).sin();
    let h = sdb * sdb + b1.cos() * b2.cos() * sdl * sdl;
    (2.0 * h.sqrt().min(1.0).asin()).to_degrees()
}

/// Spatial grid × energy axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub grid: SpatialGrid,
    pub axis: EnergyAxis,
}

impl Geometry {
    pub fn new(grid: SpatialGrid, axis: EnergyAxis) -> Self {
        Self { grid, axis }
    }

    /// Convenience constructor mirroring [`SpatialGrid::create`].
    pub fn create(
        center: (f64, f64), binsz: f64, width: (f64, f64), axis: EnergyAxis,
    ) -> MapResult<Self> {
        Ok(Self { grid: SpatialGrid::create(center, binsz, width)?, axis })
    }

    /// Cube shape `(n_energy, ny, nx)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.axis.nbins(), self.grid.ny, self.grid.nx)
    }

    pub fn n_pixels(&self) -> usize {
        let (ne, ny, nx) = self.shape();
        ne * ny * nx
    }

    pub fn validate(&self) -> MapResult<()> {
        self.grid.validate()?;
        self.axis.validate()
    }

    /// Same spatial grid with a different energy axis.
    pub fn with_axis(&self, axis: EnergyAxis) -> Self {
        Self { grid: self.grid.clone(), axis }
    }

    /// Fail with [`MapError::ShapeMismatch`] unless `other` is identical.
    pub fn ensure_same(&self, other: &Geometry) -> MapResult<()> {
        if self != other {
            let (a, b, c) = self.shape();
            let (d, e, f) = other.shape();
            return Err(MapError::ShapeMismatch { expected: vec![a, b, c], found: vec![d, e, f] });
        }
        Ok(())
    }
}

// ---- Helper methods ----

fn validate_edges(edges: &[f64]) -> MapResult<()> {
    if edges.len() < 2 {
        return Err(MapError::InvalidAxis {
            index: edges.len(),
            value: f64::NAN,
            reason: "Axis needs at least two edges.",
        });
    }
    for (index, &value) in edges.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(MapError::InvalidAxis {
                index,
                value,
                reason: "Energy edges must be finite and strictly positive.",
            });
        }
        if index > 0 && value <= edges[index - 1] {
            return Err(MapError::InvalidAxis {
                index,
                value,
                reason: "Energy edges must be strictly increasing.",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Edge validation for `EnergyAxis`.
    // - Pixel/coordinate transforms and solid angles for `SpatialGrid`.
    // - Cutout placement and geometry comparison.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Non-increasing edges must be rejected with the offending index.
    fn energy_axis_rejects_non_increasing_edges() {
        let err = EnergyAxis::from_edges(vec![0.1, 1.0, 1.0]).unwrap_err();
        match err {
            MapError::InvalidAxis { index, .. } => assert_eq!(index, 2),
            other => panic!("Expected InvalidAxis, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // `logspace` should hit its end points exactly and place log-centers at
    // the geometric mean of each bin.
    fn energy_axis_logspace_endpoints_and_centers() {
        let axis = EnergyAxis::logspace(0.1, 10.0, 2).unwrap();

        assert_eq!(axis.nbins(), 2);
        assert_eq!(axis.lo(0), 0.1);
        assert_eq!(axis.hi(1), 10.0);
        assert_relative_eq!(axis.hi(0), 1.0, max_relative = 1e-12);
        assert_relative_eq!(axis.center(0), 0.1f64.sqrt(), max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Pixel centers and coordinates must be inverse transforms.
    //
    // Given
    // -----
    // - A 2°×2° grid at 0.02° resolution centered on (0, 0).
    //
    // Expect
    // ------
    // - 100×100 pixels; the center coordinate lies between pixels 49 and 50.
    // - `coord_to_pixel(pixel_to_coord(p)) == p`.
    fn spatial_grid_coordinate_round_trip() {
        let grid = SpatialGrid::create((0.0, 0.0), 0.02, (2.0, 2.0)).unwrap();
        assert_eq!(grid.shape(), (100, 100));

        let (y, x) = grid.coord_to_pixel(0.0, 0.0);
        assert_relative_eq!(y, 49.5, epsilon = 1e-9);
        assert_relative_eq!(x, 49.5, epsilon = 1e-9);

        let (lon, lat) = grid.pixel_to_coord(10, 73);
        let (y, x) = grid.coord_to_pixel(lon, lat);
        assert_relative_eq!(y, 10.0, epsilon = 1e-9);
        assert_relative_eq!(x, 73.0, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Longitudes across the 0/360 seam map to the same pixel position.
    //
    // Given
    // -----
    // - A grid centered on (0, 0) and one centered on (359.5, 0).
    //
    // Expect
    // ------
    // - 359.9 and -0.1 agree on the first grid; 0.3 and 360.3 on the second.
    fn coord_to_pixel_wraps_longitude() {
        let grid = SpatialGrid::create((0.0, 0.0), 0.02, (2.0, 2.0)).unwrap();
        let seam = SpatialGrid::create((359.5, 0.0), 0.02, (2.0, 2.0)).unwrap();

        let (y_a, x_a) = grid.coord_to_pixel(359.9, 0.1);
        let (y_b, x_b) = grid.coord_to_pixel(-0.1, 0.1);
        let (_, x_c) = seam.coord_to_pixel(0.3, 0.0);
        let (_, x_d) = seam.coord_to_pixel(360.3, 0.0);

        assert_relative_eq!(x_a, x_b, epsilon = 1e-9);
        assert_relative_eq!(y_a, y_b, epsilon = 1e-9);
        assert_relative_eq!(x_a, 44.5, epsilon = 1e-9);
        assert_relative_eq!(x_c, x_d, epsilon = 1e-9);
        assert_relative_eq!(x_c, 89.5, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // The per-pixel solid angle near the equator should match the flat
    // approximation `binsz²` in radians, and the full-sky-band sum must match
    // the analytic band area.
    fn spatial_grid_solid_angle_matches_flat_and_band_area() {
        let grid = SpatialGrid::new((0.0, 0.0), 0.1, 10, 10).unwrap();
        let flat = 0.1f64.to_radians().powi(2);
        assert_relative_eq!(grid.row_solid_angle(5), flat, max_relative = 1e-5);

        let total: f64 = grid.solid_angle().iter().sum::<f64>() * grid.nx as f64;
        let band = 1.0f64.to_radians() * (2.0 * 0.5f64.to_radians().sin());
        assert_relative_eq!(total, band, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A cutout must keep pixel centers aligned with the parent grid.
    fn spatial_grid_cutout_preserves_pixel_centers() {
        let grid = SpatialGrid::new((1.0, -0.5), 0.05, 40, 30).unwrap();
        let cut = grid.cutout(5, 7, 10, 12).unwrap();

        let parent = grid.pixel_to_coord(5, 7);
        let child = cut.pixel_to_coord(0, 0);
        assert_relative_eq!(parent.0, child.0, epsilon = 1e-12);
        assert_relative_eq!(parent.1, child.1, epsilon = 1e-12);
        assert!(grid.cutout(25, 0, 10, 10).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Haversine separation should reproduce simple known separations.
    fn separation_matches_known_values() {
        assert_relative_eq!(separation(0.0, 0.0, 1.0, 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(separation(0.0, 0.0, 0.0, 90.0), 90.0, epsilon = 1e-12);
        assert_relative_eq!(separation(10.0, 20.0, 10.0, 20.0), 0.0, epsilon = 1e-12);
    }
}

//! maps::map — geometry-tagged data cubes.
//!
//! Purpose
//! -------
//! Pair a [`Geometry`] with an `ndarray::Array3<T>` indexed
//! `[energy, row, col]`. The same container serves real-valued maps
//! (exposure, background, npred), integer counts, and boolean masks.
//!
//! Key behaviors
//! -------------
//! - [`Map::new`] enforces that the array shape equals the geometry shape.
//! - Slicing operations ([`Map::cutout`], [`Map::slice_energy`]) and value
//!   transforms ([`Map::map_values`]) always allocate a new map; nothing in
//!   this module mutates a map after construction.
//! - Boolean maps double as fit masks and can be built from a
//!   [`CircleRegion`].
//!
//! Invariants & assumptions
//! ------------------------
//! - `data.dim() == geom.shape()` for every constructed map.
//! - Maps own their data; clones share no mutable state.
use crate::maps::{
    errors::{MapError, MapResult},
    geometry::{Geometry, separation},
};
use ndarray::{Array3, s};
use serde::{Deserialize, Serialize};

/// Geometry + data cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map<T> {
    geom: Geometry,
    data: Array3<T>,
}

impl<T: Clone> Map<T> {
    /// Wrap `data` with `geom`, checking that the shapes agree.
    ///
    /// # Errors
    /// - [`MapError::ShapeMismatch`] when `data.dim() != geom.shape()`.
    pub fn new(geom: Geometry, data: Array3<T>) -> MapResult<Self> {
        check_shape(&geom, &data)?;
        Ok(Self { geom, data })
    }

    /// Map with every cell set to `value`.
    pub fn filled(geom: Geometry, value: T) -> Self {
        let data = Array3::from_elem(geom.shape(), value);
        Self { geom, data }
    }

    pub fn geom(&self) -> &Geometry {
        &self.geom
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn into_parts(self) -> (Geometry, Array3<T>) {
        (self.geom, self.data)
    }

    /// Fail unless `other` has exactly the same geometry.
    pub fn ensure_same_geom<U>(&self, other: &Map<U>) -> MapResult<()> {
        self.geom.ensure_same(&other.geom)
    }

    /// Apply `f` to every cell, producing a new map on the same geometry.
    pub fn map_values<U, F: Fn(&T) -> U>(&self, f: F) -> Map<U> {
        Map { geom: self.geom.clone(), data: self.data.map(f) }
    }

    /// Spatial sub-rectangle `ny × nx` starting at `(iy0, ix0)`, all energies.
    pub fn cutout(&self, iy0: usize, ix0: usize, ny: usize, nx: usize) -> MapResult<Self> {
        let grid = self.geom.grid.cutout(iy0, ix0, ny, nx)?;
        let data = self.data.slice(s![.., iy0..iy0 + ny, ix0..ix0 + nx]).to_owned();
        Ok(Self { geom: Geometry::new(grid, self.geom.axis.clone()), data })
    }

    /// Energy bins `start..end`, full spatial extent.
    pub fn slice_energy(&self, start: usize, end: usize) -> MapResult<Self> {
        let axis = self.geom.axis.slice(start, end)?;
        let data = self.data.slice(s![start..end, .., ..]).to_owned();
        Ok(Self { geom: self.geom.with_axis(axis), data })
    }

    /// Re-check shape and geometry invariants; used after deserialization.
    pub fn validate(&self) -> MapResult<()> {
        self.geom.validate()?;
        check_shape(&self.geom, &self.data)
    }
}

impl Map<f64> {
    /// All-zero real map.
    pub fn zeros(geom: Geometry) -> Self {
        Self::filled(geom, 0.0)
    }

    /// Sum over the spatial axes, one value per energy bin.
    pub fn sum_spatial(&self) -> Vec<f64> {
        self.data.outer_iter().map(|slice| slice.sum()).collect()
    }

    pub fn sum(&self) -> f64 {
        self.data.sum()
    }
}

impl Map<u64> {
    /// Counts as reals, for likelihood evaluation.
    pub fn to_f64(&self) -> Map<f64> {
        self.map_values(|&n| n as f64)
    }

    pub fn total(&self) -> u64 {
        self.data.iter().sum()
    }
}

impl Map<bool> {
    /// Mask that is `true` inside `region` for every energy bin.
    pub fn from_region(geom: Geometry, region: &CircleRegion) -> Self {
        let (ne, ny, nx) = geom.shape();
        let mut data = Array3::from_elem((ne, ny, nx), false);
        for iy in 0..ny {
            for ix in 0..nx {
                let (lon, lat) = geom.grid.pixel_to_coord(iy, ix);
                if region.contains(lon, lat) {
                    data.slice_mut(s![.., iy, ix]).fill(true);
                }
            }
        }
        Self { geom, data }
    }

    /// Number of `true` cells.
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&m| m).count()
    }
}

/// Circular sky region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleRegion {
    /// Center `(lon, lat)` in degrees.
    pub center: (f64, f64),
    /// Radius in degrees.
    pub radius: f64,
}

impl CircleRegion {
    pub fn new(center: (f64, f64), radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        separation(self.center.0, self.center.1, lon, lat) <= self.radius
    }
}

// ---- Helper methods ----

fn check_shape<T>(geom: &Geometry, data: &Array3<T>) -> MapResult<()> {
    let (a, b, c) = geom.shape();
    let (d, e, f) = data.dim();
    if (a, b, c) != (d, e, f) {
        return Err(MapError::ShapeMismatch { expected: vec![a, b, c], found: vec![d, e, f] });
    }
    Ok(())
}

//! irf::psf — point-spread-function kernels and zero-padded convolution.
//!
//! Purpose
//! -------
//! Hold one small, odd-sized, normalized convolution kernel per true-energy
//! bin and apply it to count cubes.
//!
//! Key behaviors
//! -------------
//! - Kernels are built on the exposure grid's pixel size, so convolution is a
//!   plain index shift.
//! - [`PsfKernel::convolve_image`] uses zero padding: flux whose kernel
//!   support reaches past the map edge is lost, and the loss equals the
//!   kernel mass falling outside the map.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data.dim() == (n_energy, size, size)` with `size` odd.
//! - Every entry is finite and `≥ 0`; every slice sums to 1 (to 1e-9).
//! - `binsz > 0`.
use crate::{
    irf::{
        errors::{IrfError, IrfResult},
        observation::Observation,
        provider::ResponseProvider,
    },
    maps::{
        errors::{MapError, MapResult},
        geometry::{EnergyAxis, Geometry, separation},
        io::Artifact,
    },
};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

const NORM_TOL: f64 = 1e-9;

/// Per-energy PSF kernels on a fixed pixel size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsfKernel {
    axis: EnergyAxis,
    binsz: f64,
    data: Array3<f64>,
}

impl PsfKernel {
    /// Wrap explicit kernel slices, checking shape and normalization.
    pub fn new(axis: EnergyAxis, binsz: f64, data: Array3<f64>) -> IrfResult<Self> {
        let kernel = Self { axis, binsz, data };
        kernel.validate()?;
        Ok(kernel)
    }

    /// Gaussian kernels with width `sigmas[i]` (deg) for energy bin `i`,
    /// truncated at `max_radius` (deg) and renormalized.
    ///
    /// # Errors
    /// - [`IrfError::InvalidKernel`] when the number of widths differs from
    ///   the number of energy bins, a width is not finite and `> 0`, or
    ///   `max_radius` is negative.
    pub fn from_gaussian(geom: &Geometry, sigmas: &[f64], max_radius: f64) -> IrfResult<Self> {
        let ne = geom.axis.nbins();
        if sigmas.len() != ne {
            return Err(IrfError::InvalidKernel {
                reason: format!("expected {ne} PSF widths, got {}", sigmas.len()),
            });
        }
        if !(max_radius.is_finite() && max_radius >= 0.0) {
            return Err(IrfError::InvalidKernel {
                reason: format!("max radius must be finite and >= 0, got {max_radius}"),
            });
        }
        let binsz = geom.grid.binsz;
        let half = (max_radius / binsz - 1e-9).ceil().max(0.0) as usize;
        let size = 2 * half + 1;
        let mut data = Array3::<f64>::zeros((ne, size, size));
        for (ie, &sigma) in sigmas.iter().enumerate() {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(IrfError::InvalidKernel {
                    reason: format!("PSF width for energy bin {ie} must be > 0, got {sigma}"),
                });
            }
            let mut slice = data.index_axis_mut(Axis(0), ie);
            for ((y, x), v) in slice.indexed_iter_mut() {
                let dy = (y as f64 - half as f64) * binsz;
                let dx = (x as f64 - half as f64) * binsz;
                let r2 = dx * dx + dy * dy;
                if r2 <= max_radius * max_radius || half == 0 {
                    *v = (-0.5 * r2 / (sigma * sigma)).exp();
                }
            }
            let total = slice.sum();
            slice.mapv_inplace(|v| v / total);
        }
        Self::new(geom.axis.clone(), binsz, data)
    }

    /// Gaussian kernels using the provider's PSF width at the offset of the
    /// map center from the pointing.
    pub fn from_provider<P: ResponseProvider + ?Sized>(
        obs: &Observation, provider: &P, geom: &Geometry, max_radius: f64,
    ) -> IrfResult<Self> {
        let (clon, clat) = geom.grid.center;
        let offset = separation(obs.pointing.0, obs.pointing.1, clon, clat);
        let sigmas: Vec<f64> =
            geom.axis.centers().into_iter().map(|e| provider.psf_sigma(e, offset)).collect();
        tracing::debug!(offset, ?sigmas, "PSF kernel widths from provider");
        Self::from_gaussian(geom, &sigmas, max_radius)
    }

    /// Single-pixel kernel: convolution is the identity.
    pub fn delta(geom: &Geometry) -> Self {
        let data = Array3::from_elem((geom.axis.nbins(), 1, 1), 1.0);
        Self { axis: geom.axis.clone(), binsz: geom.grid.binsz, data }
    }

    pub fn axis(&self) -> &EnergyAxis {
        &self.axis
    }

    pub fn binsz(&self) -> f64 {
        self.binsz
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Kernel side length in pixels.
    pub fn size(&self) -> usize {
        self.data.dim().1
    }

    pub fn validate(&self) -> IrfResult<()> {
        self.axis.validate()?;
        if !(self.binsz.is_finite() && self.binsz > 0.0) {
            return Err(IrfError::InvalidKernel {
                reason: format!("pixel size must be finite and > 0, got {}", self.binsz),
            });
        }
        let (ne, ny, nx) = self.data.dim();
        if ne != self.axis.nbins() || ny != nx || ny % 2 == 0 {
            return Err(IrfError::InvalidKernel {
                reason: format!(
                    "kernel shape {:?} must be ({}, odd, odd) and square",
                    self.data.dim(),
                    self.axis.nbins()
                ),
            });
        }
        if self.data.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(IrfError::InvalidKernel {
                reason: "kernel values must be finite and >= 0".to_string(),
            });
        }
        for (ie, slice) in self.data.outer_iter().enumerate() {
            let total = slice.sum();
            if (total - 1.0).abs() > NORM_TOL {
                return Err(IrfError::InvalidKernel {
                    reason: format!("kernel slice {ie} sums to {total}, expected 1"),
                });
            }
        }
        Ok(())
    }

    /// Convolve one image with kernel slice `ie`, zero padding at the edges.
    pub fn convolve_image(&self, image: ArrayView2<f64>, ie: usize) -> Array2<f64> {
        let kernel = self.data.index_axis(Axis(0), ie);
        let half = (self.size() / 2) as isize;
        let (ny, nx) = image.dim();
        let mut out = Array2::<f64>::zeros((ny, nx));
        for ((y, x), &v) in image.indexed_iter() {
            if v == 0.0 {
                continue;
            }
            for ((ky, kx), &w) in kernel.indexed_iter() {
                let ty = y as isize + ky as isize - half;
                let tx = x as isize + kx as isize - half;
                if ty >= 0 && tx >= 0 && (ty as usize) < ny && (tx as usize) < nx {
                    out[[ty as usize, tx as usize]] += v * w;
                }
            }
        }
        out
    }

    /// Convolve every energy slice of `cube` with its matching kernel.
    ///
    /// # Errors
    /// - [`IrfError::GeometryMismatch`] if the cube's energy dimension differs
    ///   from the kernel's.
    pub fn convolve_cube(&self, cube: &Array3<f64>) -> IrfResult<Array3<f64>> {
        let ne = cube.dim().0;
        if ne != self.axis.nbins() {
            return Err(IrfError::GeometryMismatch {
                reason: format!("cube has {ne} energy bins, PSF has {}", self.axis.nbins()),
            });
        }
        let mut out = Array3::<f64>::zeros(cube.dim());
        for (ie, image) in cube.outer_iter().enumerate() {
            out.index_axis_mut(Axis(0), ie).assign(&self.convolve_image(image, ie));
        }
        Ok(out)
    }
}

impl Artifact for PsfKernel {
    const KIND: &'static str = "psf_kernel";

    fn validate_artifact(&self) -> MapResult<()> {
        self.validate().map_err(|e| MapError::InvalidArtifact { reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::geometry::SpatialGrid;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Kernel construction (odd size, normalization, invalid widths).
    // - Flux conservation away from edges and exact edge loss under zero
    //   padding.
    // -------------------------------------------------------------------------

    fn geom(n: usize) -> Geometry {
        let grid = SpatialGrid::new((0.0, 0.0), 0.02, n, n).unwrap();
        Geometry::new(grid, EnergyAxis::logspace(0.1, 10.0, 2).unwrap())
    }

    #[test]
    // Purpose
    // -------
    // Gaussian kernels have odd size `2·ceil(r/binsz)+1` and unit sum.
    fn gaussian_kernel_is_odd_and_normalized() {
        let psf = PsfKernel::from_gaussian(&geom(20), &[0.05, 0.03], 0.1).unwrap();

        assert_eq!(psf.size(), 11);
        for slice in psf.data().outer_iter() {
            assert_relative_eq!(slice.sum(), 1.0, epsilon = 1e-12);
        }
        assert!(psf.data()[[0, 5, 5]] > psf.data()[[0, 5, 6]]);
        assert!(PsfKernel::from_gaussian(&geom(20), &[0.05], 0.1).is_err());
        assert!(PsfKernel::from_gaussian(&geom(20), &[0.05, 0.0], 0.1).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Convolution preserves the total when the kernel support lies inside
    // the map.
    fn convolution_conserves_flux_away_from_edges() {
        let g = geom(41);
        let psf = PsfKernel::from_gaussian(&g, &[0.05, 0.05], 0.1).unwrap();
        let mut cube = Array3::<f64>::zeros(g.shape());
        cube[[0, 20, 20]] = 3.5;
        cube[[1, 15, 22]] = 1.25;

        let out = psf.convolve_cube(&cube).unwrap();

        assert_relative_eq!(out.index_axis(Axis(0), 0).sum(), 3.5, max_relative = 1e-12);
        assert_relative_eq!(out.index_axis(Axis(0), 1).sum(), 1.25, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A unit source in a corner loses exactly the kernel mass that falls
    // outside the map.
    //
    // Given
    // -----
    // - Source at pixel (0, 0); kernel half-width 5.
    //
    // Expect
    // ------
    // - Retained flux = sum of the kernel quadrant with offsets ≥ 0 in both
    //   axes.
    fn convolution_loses_flux_outside_map() {
        let g = geom(20);
        let psf = PsfKernel::from_gaussian(&g, &[0.05, 0.05], 0.1).unwrap();
        let mut cube = Array3::<f64>::zeros(g.shape());
        cube[[0, 0, 0]] = 1.0;

        let out = psf.convolve_cube(&cube).unwrap();

        let kept: f64 = psf.data().index_axis(Axis(0), 0).slice(ndarray::s![5.., 5..]).sum();
        assert_relative_eq!(out.index_axis(Axis(0), 0).sum(), kept, max_relative = 1e-12);
        assert!(kept < 0.5);
    }

    #[test]
    // Purpose
    // -------
    // The delta kernel leaves a cube unchanged and a cube with the wrong
    // number of energy bins is rejected.
    fn delta_kernel_is_identity() {
        let g = geom(6);
        let psf = PsfKernel::delta(&g);
        let cube = Array3::from_shape_fn(g.shape(), |(e, y, x)| (e + y * x) as f64);

        assert_eq!(psf.convolve_cube(&cube).unwrap(), cube);
        assert!(matches!(
            psf.convolve_cube(&Array3::zeros((3, 6, 6))),
            Err(IrfError::GeometryMismatch { .. })
        ));
    }
}

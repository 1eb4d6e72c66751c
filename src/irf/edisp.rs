//! irf::edisp — energy dispersion matrices.
//!
//! Purpose
//! -------
//! Map predicted counts from true-energy bins to reconstructed-energy bins.
//! Entry `(i, j)` is the probability that an event in true bin `i` is
//! reconstructed in bin `j`.
//!
//! Key behaviors
//! -------------
//! - [`EnergyDispersion::from_diagonal_response`]: perfect reconstruction;
//!   row `i` holds the fraction of true bin `i` (in ln E) overlapping each
//!   reco bin.
//! - [`EnergyDispersion::from_gaussian`]: log-normal migration,
//!   `ln(E_reco / E_true) ~ N(bias, sigma)`, evaluated at the true bin's
//!   log-center with the `statrs` normal CDF.
//! - [`EnergyDispersion::apply`] is a per-pixel matrix product over the
//!   energy axis.
//!
//! Invariants & assumptions
//! ------------------------
//! - `matrix.dim() == (n_true, n_reco)`.
//! - Entries finite and in `[0, 1]`; each row sums to a value in `[0, 1]`
//!   (events may migrate outside the reco range).
use crate::{
    irf::errors::{IrfError, IrfResult},
    maps::{
        errors::{MapError, MapResult},
        geometry::EnergyAxis,
        io::Artifact,
    },
};
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

const ROW_SUM_TOL: f64 = 1e-9;

/// True × reco migration matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyDispersion {
    e_true: EnergyAxis,
    e_reco: EnergyAxis,
    matrix: Array2<f64>,
}

impl EnergyDispersion {
    pub fn new(e_true: EnergyAxis, e_reco: EnergyAxis, matrix: Array2<f64>) -> IrfResult<Self> {
        let edisp = Self { e_true, e_reco, matrix };
        edisp.validate()?;
        Ok(edisp)
    }

    /// Perfect energy reconstruction expressed on possibly different axes.
    pub fn from_diagonal_response(e_true: &EnergyAxis, e_reco: &EnergyAxis) -> IrfResult<Self> {
        let matrix = Array2::from_shape_fn((e_true.nbins(), e_reco.nbins()), |(i, j)| {
            let (t0, t1) = (e_true.lo(i).ln(), e_true.hi(i).ln());
            let (r0, r1) = (e_reco.lo(j).ln(), e_reco.hi(j).ln());
            let overlap = (t1.min(r1) - t0.max(r0)).max(0.0);
            overlap / (t1 - t0)
        });
        Self::new(e_true.clone(), e_reco.clone(), matrix)
    }

    /// Log-normal migration with width `sigma` and `bias` in ln E.
    ///
    /// # Errors
    /// - [`IrfError::InvalidDispersion`] unless `sigma` is finite and `> 0`
    ///   and `bias` is finite.
    pub fn from_gaussian(
        e_true: &EnergyAxis, e_reco: &EnergyAxis, sigma: f64, bias: f64,
    ) -> IrfResult<Self> {
        if !(bias.is_finite() && sigma.is_finite() && sigma > 0.0) {
            return Err(IrfError::InvalidDispersion {
                reason: format!("need finite bias and sigma > 0, got bias {bias}, sigma {sigma}"),
            });
        }
        let normal = Normal::new(bias, sigma).map_err(|e| IrfError::InvalidDispersion {
            reason: format!("migration width {sigma}: {e}"),
        })?;
        let matrix = Array2::from_shape_fn((e_true.nbins(), e_reco.nbins()), |(i, j)| {
            let center = e_true.center(i);
            let hi = normal.cdf((e_reco.hi(j) / center).ln());
            let lo = normal.cdf((e_reco.lo(j) / center).ln());
            (hi - lo).max(0.0)
        });
        Self::new(e_true.clone(), e_reco.clone(), matrix)
    }

    pub fn e_true(&self) -> &EnergyAxis {
        &self.e_true
    }

    pub fn e_reco(&self) -> &EnergyAxis {
        &self.e_reco
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Per-row totals: probability of landing anywhere in the reco range.
    pub fn row_sums(&self) -> Vec<f64> {
        self.matrix.sum_axis(Axis(1)).to_vec()
    }

    pub fn validate(&self) -> IrfResult<()> {
        self.e_true.validate()?;
        self.e_reco.validate()?;
        let expected = (self.e_true.nbins(), self.e_reco.nbins());
        if self.matrix.dim() != expected {
            return Err(IrfError::InvalidDispersion {
                reason: format!("matrix shape {:?}, expected {expected:?}", self.matrix.dim()),
            });
        }
        if self.matrix.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
            return Err(IrfError::InvalidDispersion {
                reason: "entries must be finite probabilities in [0, 1]".to_string(),
            });
        }
        for (i, total) in self.row_sums().into_iter().enumerate() {
            if total > 1.0 + ROW_SUM_TOL {
                return Err(IrfError::InvalidDispersion {
                    reason: format!("row {i} sums to {total} > 1"),
                });
            }
        }
        Ok(())
    }

    /// Redistribute a `(n_true, ny, nx)` cube into `(n_reco, ny, nx)`.
    ///
    /// # Errors
    /// - [`IrfError::GeometryMismatch`] if the cube's energy dimension is not
    ///   `n_true`.
    pub fn apply(&self, cube: &Array3<f64>) -> IrfResult<Array3<f64>> {
        let (ne, ny, nx) = cube.dim();
        if ne != self.e_true.nbins() {
            return Err(IrfError::GeometryMismatch {
                reason: format!(
                    "cube has {ne} true-energy bins, dispersion expects {}",
                    self.e_true.nbins()
                ),
            });
        }
        let mut out = Array3::<f64>::zeros((self.e_reco.nbins(), ny, nx));
        for ((i, j), &p) in self.matrix.indexed_iter() {
            if p == 0.0 {
                continue;
            }
            out.index_axis_mut(Axis(0), j).scaled_add(p, &cube.index_axis(Axis(0), i));
        }
        Ok(out)
    }
}

impl Artifact for EnergyDispersion {
    const KIND: &'static str = "energy_dispersion";

    fn validate_artifact(&self) -> MapResult<()> {
        self.validate().map_err(|e| MapError::InvalidArtifact { reason: e.to_string() })
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
    // - Overlap fractions of the diagonal response on nested axes.
    // - Row sums of the Gaussian migration matrix.
    // - Counts conservation of `apply` when rows sum to 1.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // With true edges logspace(-1, 1, 3) and reco edges logspace(-1, 1, 2),
    // the middle true bin straddles the reco boundary at 1 TeV evenly in
    // ln E.
    //
    // Expect
    // ------
    // - Row 1 = [0.5, 0.5]; rows 0 and 2 are one-hot; all rows sum to 1.
    fn diagonal_response_splits_by_log_overlap() {
        let e_true = EnergyAxis::logspace(0.1, 10.0, 3).unwrap();
        let e_reco = EnergyAxis::logspace(0.1, 10.0, 2).unwrap();

        let edisp = EnergyDispersion::from_diagonal_response(&e_true, &e_reco).unwrap();
        let m = edisp.matrix();

        assert_relative_eq!(m[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[[1, 0]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(m[[1, 1]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(m[[2, 1]], 1.0, epsilon = 1e-12);
        for total in edisp.row_sums() {
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Gaussian migration rows lie in [0, 1]; the edge rows lose mass outside
    // the reco range.
    fn gaussian_rows_sum_within_unit_interval() {
        let e_true = EnergyAxis::logspace(0.1, 10.0, 8).unwrap();
        let e_reco = EnergyAxis::logspace(0.1, 10.0, 6).unwrap();

        let edisp = EnergyDispersion::from_gaussian(&e_true, &e_reco, 0.2, 0.0).unwrap();
        let sums = edisp.row_sums();

        assert!(sums.iter().all(|&s| (0.0..=1.0 + 1e-12).contains(&s)));
        assert!(sums[0] < 0.99);
        assert!(sums[4] > 0.99);
        assert!(EnergyDispersion::from_gaussian(&e_true, &e_reco, 0.0, 0.0).is_err());
    }

    #[test]
    // Purpose
    // -------
    // `apply` conserves total counts per pixel when every row sums to 1.
    fn apply_conserves_counts_for_unit_rows() {
        let e_true = EnergyAxis::logspace(0.1, 10.0, 3).unwrap();
        let e_reco = EnergyAxis::logspace(0.1, 10.0, 2).unwrap();
        let edisp = EnergyDispersion::from_diagonal_response(&e_true, &e_reco).unwrap();
        let cube =
            Array3::from_shape_fn((3, 2, 2), |(e, y, x)| 1.0 + e as f64 + 0.5 * (y + x) as f64);

        let out = edisp.apply(&cube).unwrap();

        assert_eq!(out.dim(), (2, 2, 2));
        assert_relative_eq!(out.sum(), cube.sum(), max_relative = 1e-12);
        assert!(edisp.apply(&Array3::zeros((2, 2, 2))).is_err());
    }
}

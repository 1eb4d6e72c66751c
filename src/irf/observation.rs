//! irf::observation — pointing and live time of one observation.
use crate::irf::errors::{IrfError, IrfResult};
use serde::{Deserialize, Serialize};

/// Where the instrument pointed and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Pointing direction `(lon, lat)` in degrees.
    pub pointing: (f64, f64),
    /// Live time in seconds.
    pub livetime_s: f64,
}

impl Observation {
    /// # Errors
    /// - [`IrfError::InvalidObservation`] unless the pointing is finite with
    ///   `|lat| ≤ 90` and the live time is finite and `> 0`.
    pub fn new(pointing: (f64, f64), livetime_s: f64) -> IrfResult<Self> {
        if !(pointing.0.is_finite() && pointing.1.is_finite() && pointing.1.abs() <= 90.0) {
            return Err(IrfError::InvalidObservation {
                reason: format!("pointing must be finite with |lat| <= 90, got {pointing:?}"),
            });
        }
        if !(livetime_s.is_finite() && livetime_s > 0.0) {
            return Err(IrfError::InvalidObservation {
                reason: format!("livetime must be finite and > 0, got {livetime_s}"),
            });
        }
        Ok(Self { pointing, livetime_s })
    }

    /// Live time given in hours.
    pub fn from_hours(pointing: (f64, f64), hours: f64) -> IrfResult<Self> {
        Self::new(pointing, hours * 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Zero live time and out-of-range latitudes are rejected.
    fn observation_rejects_bad_inputs() {
        assert!(Observation::new((0.0, 0.0), 0.0).is_err());
        assert!(Observation::new((0.0, 91.0), 10.0).is_err());
        assert_eq!(Observation::from_hours((1.0, 2.0), 10.0).unwrap().livetime_s, 36_000.0);
    }
}

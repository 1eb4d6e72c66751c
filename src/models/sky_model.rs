//! models::sky_model — spatial × spectral composition.
//!
//! Purpose
//! -------
//! Combine one [`SpatialModel`] and one [`SpectralModel`] into the source
//! description the forward evaluator and the fit engine operate on, and
//! expose both components' parameters as a single flat list.
//!
//! Key behaviors
//! -------------
//! - The flat list is spatial parameters followed by spectral parameters,
//!   named `spatial.<name>` / `spectral.<name>`. Lookups accept a qualified
//!   name, or a bare name when exactly one component defines it.
//! - The free vector (non-frozen parameters, flat order) is what the fit
//!   engine optimizes; [`SkyModel::with_free_values`] returns a new model and
//!   never mutates `self`.
//! - After a fit, per-parameter errors and the flat covariance matrix are
//!   written together by a single crate-internal call.
//!
//! Invariants & assumptions
//! ------------------------
//! - Both components are valid at all times (constructors and setters
//!   validate).
//! - When present, `covariance` is `n × n` over the flat parameter list, with
//!   zero rows/columns for frozen parameters.
use crate::{
    maps::{
        errors::{MapError, MapResult},
        geometry::Geometry,
        io::Artifact,
    },
    models::{
        errors::{ModelError, ModelResult},
        parameter::{Parameter, Parameters},
        spatial::SpatialModel,
        spectral::SpectralModel,
    },
};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

const SPATIAL_PREFIX: &str = "spatial.";
const SPECTRAL_PREFIX: &str = "spectral.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Spatial,
    Spectral,
}

/// Source model: morphology × spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyModel {
    name: String,
    spatial: SpatialModel,
    spectral: SpectralModel,
    covariance: Option<Array2<f64>>,
}

impl SkyModel {
    pub fn new(spatial: SpatialModel, spectral: SpectralModel) -> Self {
        Self { name: "source".to_string(), spatial, spectral, covariance: None }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spatial(&self) -> &SpatialModel {
        &self.spatial
    }

    pub fn spectral(&self) -> &SpectralModel {
        &self.spectral
    }

    /// Flat covariance over [`SkyModel::parameters`], if a fit produced one.
    pub fn covariance(&self) -> Option<&Array2<f64>> {
        self.covariance.as_ref()
    }

    pub fn validate(&self) -> ModelResult<()> {
        self.spatial.validate()?;
        self.spectral.validate()?;
        if let Some(cov) = &self.covariance {
            let n = self.n_parameters();
            if cov.dim() != (n, n) || cov.iter().any(|v| !v.is_finite()) {
                return Err(ModelError::InvalidComponent {
                    reason: format!("covariance must be a finite {n}x{n} matrix"),
                });
            }
        }
        Ok(())
    }

    /// Differential flux density at `(lon, lat, energy)` in
    /// cm⁻² s⁻¹ TeV⁻¹ sr⁻¹.
    pub fn evaluate(&self, lon: f64, lat: f64, energy: f64) -> f64 {
        self.spatial.evaluate(lon, lat) * self.spectral.evaluate(energy)
    }

    /// Integrated flux per cell of `geom` (cm⁻² s⁻¹), shape
    /// `(n_energy, ny, nx)`.
    ///
    /// Outer product of the spectral bin integrals and the spatial per-pixel
    /// flux fractions.
    pub fn integrate_geom(&self, geom: &Geometry) -> Array3<f64> {
        let spectrum = self.spectral.integrate_edges(geom.axis.edges());
        let weights = self.spatial.integrate_on_grid(&geom.grid);
        Array3::from_shape_fn(geom.shape(), |(ie, iy, ix)| spectrum[ie] * weights[[iy, ix]])
    }

    // ---- Flat parameter view ----

    pub fn n_parameters(&self) -> usize {
        self.spatial.parameters().len() + self.spectral.parameters().len()
    }

    /// Flat parameter list with qualified names.
    pub fn parameters(&self) -> Vec<Parameter> {
        self.flat_iter()
            .map(|(prefix, p)| Parameter { name: format!("{prefix}{}", p.name), ..p.clone() })
            .collect()
    }

    /// Look up a parameter by qualified or unambiguous bare name.
    pub fn parameter(&self, name: &str) -> ModelResult<&Parameter> {
        let (component, bare) = self.resolve(name)?;
        self.component(component).get(bare)
    }

    /// Set a parameter value, rejecting out-of-bounds values without side
    /// effects.
    pub fn set_value(&mut self, name: &str, value: f64) -> ModelResult<()> {
        let (component, bare) = self.resolve(name)?;
        let bare = bare.to_string();
        let previous = self.component(component).get(&bare)?.value;
        self.component_mut(component).set_value(&bare, value)?;
        // domain checks beyond bounds (e.g. zero width) roll the value back
        if let Err(e) = self.validate_component(component) {
            self.component_mut(component).get_mut(&bare)?.value = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn set_frozen(&mut self, name: &str, frozen: bool) -> ModelResult<()> {
        let (component, bare) = self.resolve(name)?;
        let bare = bare.to_string();
        self.component_mut(component).set_frozen(&bare, frozen)
    }

    // ---- Free-parameter vector ----

    /// Qualified names of the non-frozen parameters, flat order.
    pub fn free_parameter_names(&self) -> Vec<String> {
        self.free_parameters().into_iter().map(|p| p.name).collect()
    }

    /// Non-frozen parameters (qualified names), flat order.
    pub fn free_parameters(&self) -> Vec<Parameter> {
        self.parameters().into_iter().filter(|p| !p.frozen).collect()
    }

    pub fn free_values(&self) -> Vec<f64> {
        self.flat_iter().filter(|(_, p)| !p.frozen).map(|(_, p)| p.value).collect()
    }

    /// Copy of `self` with the free parameters set to `values`.
    ///
    /// # Errors
    /// - [`ModelError::FreeValueLength`] on a length mismatch.
    /// - Any bounds or domain violation of the new values.
    pub fn with_free_values(&self, values: &[f64]) -> ModelResult<Self> {
        let names = self.free_parameter_names();
        if names.len() != values.len() {
            return Err(ModelError::FreeValueLength { expected: names.len(), found: values.len() });
        }
        let mut out = self.clone();
        for (name, &value) in names.iter().zip(values) {
            out.set_value(name, value)?;
        }
        Ok(out)
    }

    /// Store fit uncertainties.
    ///
    /// `free_cov` is over the free parameters in flat order. Errors become
    /// `sqrt(diag)` for free parameters and `None` for frozen ones; the flat
    /// covariance gets zero rows/columns for frozen parameters. Nothing is
    /// written unless every input checks out.
    pub(crate) fn set_fit_uncertainties(&mut self, free_cov: &Array2<f64>) -> ModelResult<()> {
        let flat = self.parameters();
        let free_idx: Vec<usize> =
            flat.iter().enumerate().filter(|(_, p)| !p.frozen).map(|(i, _)| i).collect();
        let k = free_idx.len();
        if free_cov.dim() != (k, k) {
            return Err(ModelError::FreeValueLength { expected: k, found: free_cov.nrows() });
        }
        if free_cov.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidComponent {
                reason: "covariance contains non-finite entries".to_string(),
            });
        }

        let n = flat.len();
        let mut cov = Array2::<f64>::zeros((n, n));
        for (a, &i) in free_idx.iter().enumerate() {
            for (b, &j) in free_idx.iter().enumerate() {
                cov[[i, j]] = free_cov[[a, b]];
            }
        }
        let errors: Vec<Option<f64>> = flat
            .iter()
            .enumerate()
            .map(|(i, p)| (!p.frozen).then(|| cov[[i, i]].max(0.0).sqrt()))
            .collect();

        let n_spatial = self.spatial.parameters().len();
        for (i, error) in errors.into_iter().enumerate() {
            let (component, index) = if i < n_spatial {
                (Component::Spatial, i)
            } else {
                (Component::Spectral, i - n_spatial)
            };
            let name = self.component(component).names()[index].to_string();
            self.component_mut(component).get_mut(&name)?.error = error;
        }
        self.covariance = Some(cov);
        Ok(())
    }

    // ---- Helper methods ----

    fn flat_iter(&self) -> impl Iterator<Item = (&'static str, &Parameter)> {
        self.spatial
            .parameters()
            .iter()
            .map(|p| (SPATIAL_PREFIX, p))
            .chain(self.spectral.parameters().iter().map(|p| (SPECTRAL_PREFIX, p)))
    }

    fn resolve<'a>(&self, name: &'a str) -> ModelResult<(Component, &'a str)> {
        if let Some(bare) = name.strip_prefix(SPATIAL_PREFIX) {
            return Ok((Component::Spatial, bare));
        }
        if let Some(bare) = name.strip_prefix(SPECTRAL_PREFIX) {
            return Ok((Component::Spectral, bare));
        }
        match (self.spatial.parameters().contains(name), self.spectral.parameters().contains(name)) {
            (true, false) => Ok((Component::Spatial, name)),
            (false, true) => Ok((Component::Spectral, name)),
            (true, true) => Err(ModelError::AmbiguousParameter { name: name.to_string() }),
            (false, false) => Err(ModelError::MissingParameter { name: name.to_string() }),
        }
    }

    fn component(&self, component: Component) -> &Parameters {
        match component {
            Component::Spatial => self.spatial.parameters(),
            Component::Spectral => self.spectral.parameters(),
        }
    }

    fn component_mut(&mut self, component: Component) -> &mut Parameters {
        match component {
            Component::Spatial => self.spatial.parameters_mut(),
            Component::Spectral => self.spectral.parameters_mut(),
        }
    }

    fn validate_component(&self, component: Component) -> ModelResult<()> {
        match component {
            Component::Spatial => self.spatial.validate(),
            Component::Spectral => self.spectral.validate(),
        }
    }
}

impl Artifact for SkyModel {
    const KIND: &'static str = "sky_model";

    fn validate_artifact(&self) -> MapResult<()> {
        self.validate().map_err(|e| MapError::InvalidArtifact { reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::geometry::{EnergyAxis, SpatialGrid};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Qualified and bare parameter lookup.
    // - Free-vector extraction and non-mutating updates.
    // - Atomic rollback of invalid updates.
    // - Writing fit uncertainties into the flat covariance.
    // -------------------------------------------------------------------------

    fn model() -> SkyModel {
        SkyModel::new(
            SpatialModel::gaussian(0.2, 0.1, 0.2).unwrap(),
            SpectralModel::power_law(3.0, 1e-11, 1.0).unwrap(),
        )
    }

    #[test]
    // Purpose
    // -------
    // Qualified names resolve to their component; bare names resolve when
    // unique; unknown names fail.
    fn parameter_lookup_accepts_qualified_and_bare_names() {
        let m = model();
        assert_eq!(m.parameter("spatial.lon_0").unwrap().value, 0.2);
        assert_eq!(m.parameter("index").unwrap().value, 3.0);
        assert!(matches!(m.parameter("spectral.lon_0"), Err(ModelError::MissingParameter { .. })));
        assert!(matches!(m.parameter("beta"), Err(ModelError::MissingParameter { .. })));
        assert_eq!(m.parameters()[3].name, "spectral.index");
    }

    #[test]
    // Purpose
    // -------
    // Frozen parameters drop out of the free vector and `with_free_values`
    // leaves the source model untouched.
    //
    // Given
    // -----
    // - Gaussian sigma frozen; spectral reference frozen by default.
    //
    // Expect
    // ------
    // - Free names: lon_0, lat_0, index, amplitude.
    fn free_vector_skips_frozen_and_does_not_mutate() {
        let mut m = model();
        m.set_frozen("sigma", true).unwrap();

        assert_eq!(
            m.free_parameter_names(),
            vec!["spatial.lon_0", "spatial.lat_0", "spectral.index", "spectral.amplitude"]
        );
        let moved = m.with_free_values(&[0.5, 0.5, 2.0, 2e-11]).unwrap();

        assert_eq!(moved.free_values(), vec![0.5, 0.5, 2.0, 2e-11]);
        assert_eq!(m.free_values(), vec![0.2, 0.1, 3.0, 1e-11]);
        assert!(matches!(
            m.with_free_values(&[1.0]),
            Err(ModelError::FreeValueLength { expected: 4, found: 1 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A value inside the bounds but outside the component domain (zero
    // width) is rejected and the previous value kept.
    fn set_value_rolls_back_domain_violation() {
        let mut m = model();
        assert!(m.set_value("sigma", 0.0).is_err());
        assert_eq!(m.parameter("sigma").unwrap().value, 0.2);
        assert!(m.set_value("amplitude", -1.0).is_err());
        assert_eq!(m.parameter("amplitude").unwrap().value, 1e-11);
    }

    #[test]
    // Purpose
    // -------
    // Free-parameter covariance is scattered into the flat matrix and the
    // diagonal becomes the parameter errors.
    fn fit_uncertainties_fill_errors_and_covariance() {
        let mut m = model();
        for name in ["lon_0", "lat_0", "sigma"] {
            m.set_frozen(name, true).unwrap();
        }
        let free_cov = array![[0.04, 1e-13], [1e-13, 4e-24]];

        m.set_fit_uncertainties(&free_cov).unwrap();

        assert_relative_eq!(m.parameter("index").unwrap().error.unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(m.parameter("amplitude").unwrap().error.unwrap(), 2e-12, max_relative = 1e-12);
        assert_eq!(m.parameter("lon_0").unwrap().error, None);
        let cov = m.covariance().unwrap();
        assert_eq!(cov.dim(), (6, 6));
        assert_eq!(cov[[3, 4]], 1e-13);
        assert_eq!(cov[[0, 0]], 0.0);
        assert!(m.validate().is_ok());
    }

    #[test]
    // Purpose
    // -------
    // `integrate_geom` is the outer product of spectral bin integrals and
    // spatial pixel fractions.
    fn integrate_geom_is_outer_product() {
        let grid = SpatialGrid::create((0.0, 0.0), 0.05, (2.0, 2.0)).unwrap();
        let geom = Geometry::new(grid, EnergyAxis::logspace(0.1, 10.0, 2).unwrap());
        let m = SkyModel::new(
            SpatialModel::gaussian(0.0, 0.0, 0.1).unwrap(),
            SpectralModel::power_law(2.0, 1e-11, 1.0).unwrap(),
        );

        let flux = m.integrate_geom(&geom);
        let per_bin: Vec<f64> = flux.outer_iter().map(|s| s.sum()).collect();

        assert_relative_eq!(per_bin[0], m.spectral().integral(0.1, 1.0), max_relative = 1e-3);
        assert_relative_eq!(per_bin[1], m.spectral().integral(1.0, 10.0), max_relative = 1e-3);
    }
}

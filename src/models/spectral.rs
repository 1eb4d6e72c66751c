//! models::spectral — differential energy spectra.
//!
//! Purpose
//! -------
//! Describe how a source's flux is distributed in energy. A [`SpectralModel`]
//! is a [`SpectralKind`] plus a fixed-layout [`Parameters`] list, mirroring
//! the spatial side.
//!
//! Key behaviors
//! -------------
//! - [`SpectralModel::evaluate`] returns dN/dE in cm⁻² s⁻¹ TeV⁻¹.
//! - [`SpectralModel::integral`] returns the bin-integrated flux in
//!   cm⁻² s⁻¹: closed form for the power law (log form when Γ ≈ 1),
//!   composite Simpson in ln E for the cutoff power law.
//!
//! Conventions
//! -----------
//! - Parameter layouts:
//!   - `PowerLaw`:          `[index, amplitude, reference]`
//!   - `ExpCutoffPowerLaw`: `[index, amplitude, reference, lambda_]`
//! - Energies are TeV; `reference` is frozen by default.
use crate::models::{
    errors::{ModelError, ModelResult},
    parameter::{Parameter, Parameters},
};
use serde::{Deserialize, Serialize};

/// Number of Simpson intervals (even) per bin for numerical integrals.
const SIMPSON_INTERVALS: usize = 64;

/// |Γ − 1| below which the power-law integral switches to its log form.
const INDEX_ONE_TOL: f64 = 1e-10;

/// Spectral family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectralKind {
    PowerLaw,
    ExpCutoffPowerLaw,
}

impl SpectralKind {
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            SpectralKind::PowerLaw => &["index", "amplitude", "reference"],
            SpectralKind::ExpCutoffPowerLaw => &["index", "amplitude", "reference", "lambda_"],
        }
    }
}

/// Spectral component: kind + parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralModel {
    kind: SpectralKind,
    parameters: Parameters,
}

impl SpectralModel {
    /// `dN/dE = amplitude · (E / reference)^(−index)`.
    pub fn power_law(index: f64, amplitude: f64, reference: f64) -> ModelResult<Self> {
        let items = base_parameters(index, amplitude, reference);
        Self::from_parameters(SpectralKind::PowerLaw, Parameters::new(items)?)
    }

    /// Power law times `exp(−lambda_ · E)`; `lambda_` in TeV⁻¹.
    pub fn exp_cutoff_power_law(
        index: f64, amplitude: f64, reference: f64, lambda_: f64,
    ) -> ModelResult<Self> {
        let mut items = base_parameters(index, amplitude, reference);
        items.push(Parameter::new("lambda_", lambda_, "TeV-1").with_min(0.0));
        Self::from_parameters(SpectralKind::ExpCutoffPowerLaw, Parameters::new(items)?)
    }

    pub fn from_parameters(kind: SpectralKind, parameters: Parameters) -> ModelResult<Self> {
        let model = Self { kind, parameters };
        model.validate()?;
        Ok(model)
    }

    pub fn kind(&self) -> SpectralKind {
        self.kind
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

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
        let reference = self.parameters.value_at(2);
        if reference <= 0.0 {
            return Err(ModelError::InvalidValue {
                name: "reference".to_string(),
                value: reference,
                reason: "reference energy must be strictly positive",
            });
        }
        Ok(())
    }

    /// Differential flux at `energy` (TeV).
    pub fn evaluate(&self, energy: f64) -> f64 {
        let index = self.parameters.value_at(0);
        let amplitude = self.parameters.value_at(1);
        let reference = self.parameters.value_at(2);
        let pl = amplitude * (energy / reference).powf(-index);
        match self.kind {
            SpectralKind::PowerLaw => pl,
            SpectralKind::ExpCutoffPowerLaw => pl * (-self.parameters.value_at(3) * energy).exp(),
        }
    }

    /// Flux integrated over `[e_lo, e_hi]` (TeV).
    pub fn integral(&self, e_lo: f64, e_hi: f64) -> f64 {
        match self.kind {
            SpectralKind::PowerLaw => {
                let index = self.parameters.value_at(0);
                let amplitude = self.parameters.value_at(1);
                let reference = self.parameters.value_at(2);
                power_law_integral(index, amplitude, reference, e_lo, e_hi)
            }
            SpectralKind::ExpCutoffPowerLaw => simpson_log(|e| self.evaluate(e), e_lo, e_hi),
        }
    }

    /// Bin integrals over consecutive `edges`.
    pub fn integrate_edges(&self, edges: &[f64]) -> Vec<f64> {
        edges.windows(2).map(|w| self.integral(w[0], w[1])).collect()
    }
}

// ---- Helper methods ----

fn base_parameters(index: f64, amplitude: f64, reference: f64) -> Vec<Parameter> {
    vec![
        Parameter::new("index", index, ""),
        Parameter::new("amplitude", amplitude, "cm-2 s-1 TeV-1").with_min(0.0),
        Parameter::new("reference", reference, "TeV").frozen(),
    ]
}

fn power_law_integral(index: f64, amplitude: f64, reference: f64, e_lo: f64, e_hi: f64) -> f64 {
    let g1 = 1.0 - index;
    if g1.abs() < INDEX_ONE_TOL {
        return amplitude * reference * (e_hi / e_lo).ln();
    }
    amplitude * reference / g1 * ((e_hi / reference).powf(g1) - (e_lo / reference).powf(g1))
}

/// Composite Simpson rule in `u = ln E`: `∫ f(E) dE = ∫ f(eᵘ) eᵘ du`.
fn simpson_log<F: Fn(f64) -> f64>(f: F, e_lo: f64, e_hi: f64) -> f64 {
    let (u0, u1) = (e_lo.ln(), e_hi.ln());
    let h = (u1 - u0) / SIMPSON_INTERVALS as f64;
    let g = |u: f64| {
        let e = u.exp();
        f(e) * e
    };
    let mut acc = g(u0) + g(u1);
    for k in 1..SIMPSON_INTERVALS {
        let w = if k % 2 == 1 { 4.0 } else { 2.0 };
        acc += w * g(u0 + h * k as f64);
    }
    acc * h / 3.0
}

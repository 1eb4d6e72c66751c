//! cube::fit — Poisson maximum-likelihood fit of a sky model to a counts
//! cube.
//!
//! Purpose
//! -------
//! Recover the free parameters of a [`SkyModel`] and their covariance from
//! observed counts, an instrument response, and an optional pixel mask.
//!
//! Key behaviors
//! -------------
//! - Objective: `NLL(θ) = Σ_unmasked [μ − n·ln μ]` with `μ = max(npred,
//!   NPRED_FLOOR)`; the Cash statistic is `2·NLL`.
//! - Free parameters are mapped to unconstrained optimizer coordinates with
//!   [`ParamTransform`], so every evaluation sees an in-bound model.
//! - Gradient: `∂NLL/∂p = Σ (1 − n/μ)·∂μ/∂p` with `∂μ/∂p` from central
//!   differences of the npred cube, chained through the transform Jacobian.
//! - Solvers: L-BFGS (More–Thuente or Hager–Zhang) or Nelder–Mead; a failed
//!   L-BFGS run is retried once with Nelder–Mead from the starting point.
//! - Covariance: central-difference Hessian of the NLL in optimizer
//!   coordinates, eigen pseudoinverse, rescaled to parameter units and
//!   written into the returned model.
//!
//! Invariants & assumptions
//! ------------------------
//! - The input model, counts, mask and response are never mutated.
//! - Counts, mask and bundle share the counts geometry.
//! - Non-convergence is data: [`FitResult::converged`] is `false`.
//!
//! Conventions
//! -----------
//! - `debug!` for the starting point and solver choice, `info!` for the fit
//!   summary, `warn!` for solver fallback and non-convergence.
//!
//! Downstream usage
//! ----------------
//! - `MapFit::new(&model, &counts, &bundle).with_mask(&mask).run()`, or the
//!   [`fit`] convenience wrapper over loose response maps.
use crate::{
    cube::{
        errors::{CubeError, CubeResult},
        evaluator::MapEvaluator,
    },
    inference::{
        errors::InferenceError,
        hessian::{calc_covariance_from_grad, transform_covariance},
    },
    irf::{bundle::ResponseBundle, edisp::EnergyDispersion, psf::PsfKernel},
    maps::{
        errors::{MapError, MapResult},
        io::Artifact,
        map::Map,
    },
    models::sky_model::SkyModel,
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{
            DEFAULT_SIMPLEX_STEP, Grad, LogLikelihood, MLEOptions, OptimOutcome, Solver, Theta,
            Tolerances, maximize,
            validation::{validate_theta, verify_step},
        },
        numerical_stability::ParamTransform,
    },
};
use ndarray::{Array1, Array2, Array3, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Lower floor applied to npred before the logarithm.
pub const NPRED_FLOOR: f64 = 1e-25;

/// Default step (optimizer coordinates) for npred derivatives.
pub const DEFAULT_DERIVATIVE_STEP: f64 = 1e-5;

/// Default step (optimizer coordinates) for the covariance Hessian.
pub const DEFAULT_HESSIAN_STEP: f64 = 1e-4;

// ---- Configuration ----

/// Fit configuration.
///
/// - `solver`: L-BFGS with a line search, or Nelder–Mead.
/// - `tols`: optimizer tolerances and iteration cap.
/// - `lbfgs_mem`: L-BFGS history size (`None` uses the optimizer default).
/// - `covariance`: estimate the covariance at the optimum.
/// - `derivative_step`: central-difference step for `∂npred/∂θ`.
/// - `hessian_step`: central-difference step for the Hessian.
/// - `nelder_mead_step`: initial simplex edge, also used by the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub solver: Solver,
    pub tols: Tolerances,
    pub lbfgs_mem: Option<usize>,
    pub covariance: bool,
    pub derivative_step: f64,
    pub hessian_step: f64,
    pub nelder_mead_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            solver: Solver::default(),
            tols: Tolerances::default(),
            lbfgs_mem: None,
            covariance: true,
            derivative_step: DEFAULT_DERIVATIVE_STEP,
            hessian_step: DEFAULT_HESSIAN_STEP,
            nelder_mead_step: DEFAULT_SIMPLEX_STEP,
        }
    }
}

impl FitOptions {
    /// Validated constructor.
    ///
    /// # Errors
    /// - [`CubeError::InvalidOptions`] for invalid tolerances, a zero L-BFGS
    ///   memory, or a non-finite / non-positive step.
    pub fn new(
        solver: Solver, tols: Tolerances, lbfgs_mem: Option<usize>, covariance: bool,
        derivative_step: f64, hessian_step: f64, nelder_mead_step: f64,
    ) -> CubeResult<Self> {
        let opts = Self {
            solver,
            tols,
            lbfgs_mem,
            covariance,
            derivative_step,
            hessian_step,
            nelder_mead_step,
        };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> CubeResult<()> {
        self.tols.validate().map_err(CubeError::InvalidOptions)?;
        for step in [self.derivative_step, self.hessian_step] {
            verify_step(step).map_err(CubeError::InvalidOptions)?;
        }
        self.mle_options(self.solver)?;
        Ok(())
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_covariance(mut self, covariance: bool) -> Self {
        self.covariance = covariance;
        self
    }

    fn mle_options(&self, solver: Solver) -> CubeResult<MLEOptions> {
        MLEOptions::new(self.tols, solver, self.lbfgs_mem, self.nelder_mead_step)
            .map_err(CubeError::InvalidOptions)
    }
}

impl Artifact for FitOptions {
    const KIND: &'static str = "fit_options";

    fn validate_artifact(&self) -> MapResult<()> {
        self.validate().map_err(|e| MapError::InvalidArtifact { reason: e.to_string() })
    }
}

// ---- Result ----

/// Outcome of a fit.
///
/// `model` is a fresh copy of the input with best-fit values and, when
/// covariance was estimated, parameter errors and the flat covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub model: SkyModel,
    /// Qualified names of the fitted parameters, in covariance order.
    pub free_parameters: Vec<String>,
    /// Covariance over `free_parameters`, in parameter units.
    pub covariance: Option<Array2<f64>>,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    /// Solver that produced the result (Nelder–Mead after a fallback).
    pub solver: Solver,
    /// Negative log-likelihood at the optimum.
    pub nll: f64,
    /// Cash statistic, `2·nll`.
    pub total_stat: f64,
    pub optim: OptimOutcome,
}

impl FitResult {
    /// 1σ error of a fitted parameter, if covariance was estimated.
    pub fn error(&self, name: &str) -> Option<f64> {
        self.model.parameter(name).ok().and_then(|p| p.error)
    }

    /// Best-fit value of a parameter.
    pub fn value(&self, name: &str) -> CubeResult<f64> {
        Ok(self.model.parameter(name)?.value)
    }
}

// ---- Fit driver ----

/// Fit a sky model to observed counts.
///
/// ```no_run
/// # use gammacube::cube::{MapFit, FitOptions};
/// # fn demo(
/// #     model: &gammacube::models::SkyModel,
/// #     counts: &gammacube::maps::Map<u64>,
/// #     bundle: &gammacube::irf::ResponseBundle,
/// # ) -> gammacube::cube::CubeResult<()> {
/// let result = MapFit::new(model, counts, bundle).with_options(FitOptions::default()).run()?;
/// println!("index = {}", result.value("spectral.index")?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MapFit<'a> {
    model: &'a SkyModel,
    counts: &'a Map<u64>,
    bundle: &'a ResponseBundle,
    mask: Option<&'a Map<bool>>,
    options: FitOptions,
}

impl<'a> MapFit<'a> {
    pub fn new(model: &'a SkyModel, counts: &'a Map<u64>, bundle: &'a ResponseBundle) -> Self {
        Self { model, counts, bundle, mask: None, options: FitOptions::default() }
    }

    /// Only pixels where `mask` is `true` enter the likelihood.
    pub fn with_mask(mut self, mask: &'a Map<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Negative log-likelihood of `model` on this dataset.
    pub fn nll(&self, model: &SkyModel) -> CubeResult<f64> {
        self.check_inputs()?;
        let data = self.fit_data();
        let npred = MapEvaluator::new(self.bundle).npred_data(model)?;
        Ok(poisson_nll(&npred, &data))
    }

    /// Run the fit.
    ///
    /// # Errors
    /// - [`CubeError::ShapeMismatch`] for counts/mask/bundle disagreement.
    /// - [`CubeError::InvalidModel`] if the starting model is out of bounds.
    /// - [`CubeError::DegenerateModel`] with no free parameters or no
    ///   unmasked pixels.
    /// - [`CubeError::OptimizerDivergence`] if the objective is non-finite at
    ///   the start or both solvers fail.
    /// - [`CubeError::InvalidOptions`] / [`CubeError::Covariance`].
    pub fn run(&self) -> CubeResult<FitResult> {
        self.check_inputs()?;
        self.options.validate()?;
        let free = self.model.free_parameters();
        if free.is_empty() {
            return Err(CubeError::DegenerateModel {
                reason: "model has no free parameters".to_string(),
            });
        }
        let data = self.fit_data();
        let n_used = data.mask.as_ref().map_or(data.counts.len(), |m| m.iter().filter(|&&b| b).count());
        if n_used < 1 {
            return Err(CubeError::DegenerateModel { reason: "mask excludes every pixel".to_string() });
        }

        let transforms: Vec<ParamTransform> =
            free.iter().map(|p| ParamTransform::for_bounds(p.min, p.max, p.value)).collect();
        let theta0: Theta =
            free.iter().zip(&transforms).map(|(p, tr)| tr.to_internal(p.value)).collect();
        let objective = PoissonObjective {
            template: self.model,
            evaluator: MapEvaluator::new(self.bundle),
            transforms,
            derivative_step: self.options.derivative_step,
        };

        let nll0 = poisson_nll(&objective.npred(&theta0).map_err(divergence)?, &data);
        if !nll0.is_finite() {
            return Err(CubeError::OptimizerDivergence {
                reason: format!("negative log-likelihood is {nll0} at the starting point"),
            });
        }
        debug!(nll = nll0, n_free = free.len(), n_pixels = n_used, solver = %self.options.solver, "fit start");

        let (outcome, solver) = optimize_with_fallback(&objective, theta0, &data, &self.options)?;
        let best = objective.model_at(&outcome.theta_hat).map_err(divergence)?;
        let nll = -outcome.value;
        if outcome.converged {
            info!(status = %outcome.status, iterations = outcome.iterations, nll, "fit converged");
        } else {
            warn!(status = %outcome.status, iterations = outcome.iterations, nll, "fit did not converge");
        }

        let (model, covariance) = if self.options.covariance {
            self.with_covariance(&objective, &data, &outcome.theta_hat, best)?
        } else {
            (best, None)
        };

        Ok(FitResult {
            model,
            free_parameters: free.into_iter().map(|p| p.name).collect(),
            covariance,
            converged: outcome.converged,
            status: outcome.status.clone(),
            iterations: outcome.iterations,
            solver,
            nll,
            total_stat: 2.0 * nll,
            optim: outcome,
        })
    }

    // ---- Helper methods ----

    fn check_inputs(&self) -> CubeResult<()> {
        let geom = self.bundle.counts_geom();
        if self.counts.geom() != geom {
            return Err(CubeError::ShapeMismatch {
                reason: format!(
                    "counts shape {:?} does not match response shape {:?}",
                    self.counts.geom().shape(),
                    geom.shape()
                ),
            });
        }
        if let Some(mask) = self.mask {
            if mask.geom() != geom {
                return Err(CubeError::ShapeMismatch {
                    reason: format!(
                        "mask shape {:?} does not match response shape {:?}",
                        mask.geom().shape(),
                        geom.shape()
                    ),
                });
            }
        }
        self.model.validate()?;
        Ok(())
    }

    fn fit_data(&self) -> FitData {
        FitData {
            counts: self.counts.data().mapv(|n| n as f64),
            mask: self.mask.map(|m| m.data().clone()),
        }
    }

    fn with_covariance(
        &self, objective: &PoissonObjective<'_>, data: &FitData, theta_hat: &Theta,
        mut model: SkyModel,
    ) -> CubeResult<(SkyModel, Option<Array2<f64>>)> {
        let grad = |theta: &Theta| objective.nll_grad(theta, data);
        let cov_internal = match calc_covariance_from_grad(&grad, theta_hat, self.options.hessian_step)
        {
            Ok((cov, _)) => cov,
            Err(InferenceError::Unidentified { cutoff }) => {
                warn!(cutoff, "no identified direction at the optimum; covariance skipped");
                return Ok((model, None));
            }
            Err(err) => return Err(err.into()),
        };
        let jacobian: Array1<f64> = objective
            .transforms
            .iter()
            .zip(theta_hat.iter())
            .map(|(tr, &t)| tr.jacobian(t))
            .collect();
        let cov = transform_covariance(&cov_internal, &jacobian)?;
        model.set_fit_uncertainties(&cov)?;
        Ok((model, Some(cov)))
    }
}

/// Run the configured solver, falling back to Nelder–Mead once if
/// L-BFGS errors out.
fn optimize_with_fallback<F: LogLikelihood>(
    objective: &F, theta0: Theta, data: &F::Data, options: &FitOptions,
) -> CubeResult<(OptimOutcome, Solver)> {
    let solver = options.solver;
    let opts = options.mle_options(solver)?;
    match maximize(objective, theta0.clone(), data, &opts) {
        Ok(outcome) => Ok((outcome, solver)),
        Err(err) if solver.uses_gradient() => {
            warn!(error = %err, "L-BFGS failed; retrying with Nelder-Mead");
            let fallback = options.mle_options(Solver::NelderMead)?;
            let outcome = maximize(objective, theta0, data, &fallback).map_err(|e| {
                CubeError::OptimizerDivergence {
                    reason: format!("L-BFGS failed ({err}); Nelder-Mead failed ({e})"),
                }
            })?;
            Ok((outcome, Solver::NelderMead))
        }
        Err(err) => Err(divergence(err)),
    }
}

/// Fit with default [`FitOptions`] over loose response components.
///
/// # Errors
/// As [`MapFit::run`]; response geometry disagreements surface as
/// [`CubeError::ShapeMismatch`].
pub fn fit(
    model: &SkyModel, counts: &Map<u64>, exposure: &Map<f64>, background: &Map<f64>,
    psf: &PsfKernel, edisp: Option<&EnergyDispersion>, mask: Option<&Map<bool>>,
) -> CubeResult<FitResult> {
    let bundle =
        ResponseBundle::new(exposure.clone(), background.clone(), psf.clone(), edisp.cloned())?;
    let mut fit = MapFit::new(model, counts, &bundle);
    if let Some(mask) = mask {
        fit = fit.with_mask(mask);
    }
    fit.run()
}

// ---- Objective ----

/// Observed counts and optional mask, owned so the optimizer can borrow
/// them for the whole run.
#[derive(Debug, Clone)]
struct FitData {
    counts: Array3<f64>,
    mask: Option<Array3<bool>>,
}

/// Poisson log-likelihood over the free parameters of a template model.
struct PoissonObjective<'a> {
    template: &'a SkyModel,
    evaluator: MapEvaluator<'a>,
    transforms: Vec<ParamTransform>,
    derivative_step: f64,
}

impl PoissonObjective<'_> {
    fn model_at(&self, theta: &Theta) -> OptResult<SkyModel> {
        let values: Vec<f64> =
            self.transforms.iter().zip(theta.iter()).map(|(tr, &t)| tr.to_external(t)).collect();
        self.template.with_free_values(&values).map_err(objective_failed)
    }

    fn npred(&self, theta: &Theta) -> OptResult<Array3<f64>> {
        let model = self.model_at(theta)?;
        self.evaluator.npred_data(&model).map_err(objective_failed)
    }

    /// Gradient of the NLL in optimizer coordinates.
    fn nll_grad(&self, theta: &Theta, data: &FitData) -> OptResult<Grad> {
        let npred = self.npred(theta)?;
        let weights = residual_weights(&npred, data);
        let h = self.derivative_step;
        let mut grad = Grad::zeros(theta.len());
        for (i, tr) in self.transforms.iter().enumerate() {
            let (t_lo, t_hi) = (theta[i] - h, theta[i] + h);
            let (p_lo, p_hi) = (tr.to_external(t_lo), tr.to_external(t_hi));
            if p_hi == p_lo {
                continue;
            }
            let mut shifted = theta.clone();
            shifted[i] = t_hi;
            let mu_hi = self.npred(&shifted)?;
            shifted[i] = t_lo;
            let mu_lo = self.npred(&shifted)?;
            let mut d_nll_dp = 0.0;
            Zip::from(&weights).and(&mu_hi).and(&mu_lo).for_each(|&w, &hi, &lo| {
                d_nll_dp += w * (hi - lo);
            });
            d_nll_dp /= p_hi - p_lo;
            grad[i] = d_nll_dp * tr.jacobian(theta[i]);
        }
        Ok(grad)
    }
}

impl LogLikelihood for PoissonObjective<'_> {
    type Data = FitData;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<f64> {
        let npred = self.npred(theta)?;
        Ok(-poisson_nll(&npred, data))
    }

    fn check(&self, theta: &Theta, _data: &Self::Data) -> OptResult<()> {
        if theta.len() != self.transforms.len() {
            return Err(OptError::ObjectiveFailed {
                text: format!(
                    "expected {} free coordinates, found {}",
                    self.transforms.len(),
                    theta.len()
                ),
            });
        }
        validate_theta(theta)?;
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        Ok(-self.nll_grad(theta, data)?)
    }
}

// ---- Helper methods ----

/// `Σ_unmasked [μ − n·ln μ]` with `μ` floored at [`NPRED_FLOOR`].
fn poisson_nll(npred: &Array3<f64>, data: &FitData) -> f64 {
    let mut total = 0.0;
    match &data.mask {
        Some(mask) => Zip::from(npred).and(&data.counts).and(mask).for_each(|&mu, &n, &keep| {
            if keep {
                total += cash_term(mu, n);
            }
        }),
        None => Zip::from(npred).and(&data.counts).for_each(|&mu, &n| total += cash_term(mu, n)),
    }
    total
}

fn cash_term(mu: f64, n: f64) -> f64 {
    let mu = mu.max(NPRED_FLOOR);
    if n > 0.0 { mu - n * mu.ln() } else { mu }
}

/// `1 − n/μ` on unmasked cells, zero elsewhere.
fn residual_weights(npred: &Array3<f64>, data: &FitData) -> Array3<f64> {
    let mut weights =
        Zip::from(npred).and(&data.counts).map_collect(|&mu, &n| 1.0 - n / mu.max(NPRED_FLOOR));
    if let Some(mask) = &data.mask {
        Zip::from(&mut weights).and(mask).for_each(|w, &keep| {
            if !keep {
                *w = 0.0;
            }
        });
    }
    weights
}

fn objective_failed<E: std::fmt::Display>(err: E) -> OptError {
    OptError::ObjectiveFailed { text: err.to_string() }
}

fn divergence(err: OptError) -> CubeError {
    CubeError::OptimizerDivergence { reason: err.to_string() }
}

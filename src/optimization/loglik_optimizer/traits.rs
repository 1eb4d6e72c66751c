//! Public API surface for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait users implement for their model.
//! - [`MLEOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`Solver`] / [`LineSearcher`]: choice of minimizer and, for L-BFGS, of
//!   line search.
//! - [`OptimOutcome`]: normalized result returned by the high-level `maximize` API.
//!
//! Convention: we *maximize* a user log-likelihood `ℓ(θ)` by minimizing the cost
//! `c(θ) = -ℓ(θ)`. If an analytic gradient is provided, it should be the gradient
//! of the log-likelihood (`∇ℓ(θ)`); the adapter flips the sign as needed.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{
            validate_theta_hat, validate_value, verify_step, verify_tol_cost, verify_tol_grad,
        },
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// User-implemented log-likelihood interface.
///
/// You maximize `ℓ(θ)`; internally we minimize the cost `c(θ) = -ℓ(θ)`.
/// If you provide an analytic gradient, return the gradient of the
/// log-likelihood `∇ℓ(θ)` (the adapter flips the sign to match the cost).
///
/// - `type Data`: per-model data carried into `value`/`grad`/`check`.
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: validation hook to reject
///   obviously invalid `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   If not implemented, finite differences are used automatically.
pub trait LogLikelihood {
    type Data: 'static;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Choice of line search used inside the L-BFGS solver.
///
/// Parses case-insensitively from `"MoreThuente"` / `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidSolver {
                name: s.to_string(),
                reason: "Valid line searches are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Minimizer used by [`maximize`](crate::optimization::loglik_optimizer::maximize).
///
/// String form (used by `FromStr`, `Display` and serde):
/// - `"lbfgs"` or `"lbfgs-morethuente"` → `Lbfgs(MoreThuente)`
/// - `"lbfgs-hagerzhang"` → `Lbfgs(HagerZhang)`
/// - `"neldermead"` (or `"nelder-mead"`) → `NelderMead`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Solver {
    Lbfgs(LineSearcher),
    NelderMead,
}

impl Solver {
    /// `true` for solvers that consume gradients.
    pub fn uses_gradient(&self) -> bool {
        matches!(self, Solver::Lbfgs(_))
    }
}

impl Default for Solver {
    fn default() -> Self {
        Solver::Lbfgs(LineSearcher::MoreThuente)
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solver::Lbfgs(LineSearcher::MoreThuente) => write!(f, "lbfgs-morethuente"),
            Solver::Lbfgs(LineSearcher::HagerZhang) => write!(f, "lbfgs-hagerzhang"),
            Solver::NelderMead => write!(f, "neldermead"),
        }
    }
}

impl FromStr for Solver {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "lbfgs" => Ok(Solver::Lbfgs(LineSearcher::MoreThuente)),
            "neldermead" | "nelder-mead" => Ok(Solver::NelderMead),
            _ => match lower.strip_prefix("lbfgs-") {
                Some(ls) => Ok(Solver::Lbfgs(ls.parse()?)),
                None => Err(OptError::InvalidSolver {
                    name: s.to_string(),
                    reason: "Valid solvers are 'lbfgs', 'lbfgs-morethuente', \
                             'lbfgs-hagerzhang' or 'neldermead'.",
                }),
            },
        }
    }
}

impl TryFrom<String> for Solver {
    type Error = OptError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Solver> for String {
    fn from(solver: Solver) -> Self {
        solver.to_string()
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols: Tolerances` — numerical tolerances and iteration limits.
/// - `solver: Solver` — L-BFGS (with line search) or Nelder–Mead.
/// - `lbfgs_mem: Option<usize>` — L-BFGS history size (default 7).
/// - `simplex_step: f64` — edge length of the initial Nelder–Mead simplex
///   around `θ₀`.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub solver: Solver,
    pub lbfgs_mem: Option<usize>,
    pub simplex_step: f64,
}

/// Default edge length of the initial Nelder–Mead simplex.
pub const DEFAULT_SIMPLEX_STEP: f64 = 0.1;

impl MLEOptions {
    /// Create a new set of optimizer options.
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] if `lbfgs_mem == Some(0)`.
    /// - [`OptError::InvalidStep`] unless `simplex_step` is finite and `> 0`.
    pub fn new(
        tols: Tolerances, solver: Solver, lbfgs_mem: Option<usize>, simplex_step: f64,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        verify_step(simplex_step)?;
        Ok(Self { tols, solver, lbfgs_mem, simplex_step })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            solver: Solver::default(),
            lbfgs_mem: None,
            simplex_step: DEFAULT_SIMPLEX_STEP,
        }
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_grad`: terminate when the gradient norm falls below this threshold
///   (L-BFGS only).
/// - `tol_cost`: terminate when the change in cost falls below this
///   threshold; for Nelder–Mead, the simplex cost spread.
/// - `max_iter`: hard cap on the number of iterations.
///
/// Any field can be `None` but **at least one** of the three must be provided
/// (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one of `tol_grad`, `tol_cost`, or `max_iter` must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        let tols = Self { tol_grad, tol_cost, max_iter };
        tols.validate()?;
        Ok(tols)
    }

    /// Re-check the rules of [`Tolerances::new`], e.g. after deserialization.
    pub fn validate(&self) -> OptResult<()> {
        if self.tol_grad.is_none() && self.tol_cost.is_none() && self.max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(self.tol_cost)?;
        verify_tol_grad(self.tol_grad)?;
        if let Some(max_iter) = self.max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(())
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-5), tol_cost: Some(1e-7), max_iter: Some(500) }
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best **log-likelihood** value `ℓ(θ)` (not the cost).
/// - `converged`: `true` only if a convergence criterion was met; hitting
///   the iteration cap or an interruption leaves it `false`.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`
///   (cost_count, gradient_count, ...).
/// - `grad_norm`: norm of the last available gradient, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// Performs:
    /// - `theta_hat` check via `validate_theta_hat` (present and all finite).
    /// - `value` check via `validate_value` (finite).
    /// - Maps `TerminationStatus` into `(converged, status)`.
    /// - Computes `grad_norm` if a gradient was provided.
    ///
    /// # Errors
    /// - Propagates any validation errors for `theta_hat` or `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match &termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(reason) => {
                let converged = matches!(
                    reason,
                    TerminationReason::SolverConverged | TerminationReason::TargetCostReached
                );
                (converged, reason.text().to_string())
            }
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self { theta_hat, value, converged, status, iterations, fn_evals, grad_norm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Parsing and string round trips of `Solver` / `LineSearcher`.
    // - Validation rules of `Tolerances` and `MLEOptions`.
    // - Mapping of termination reasons onto `OptimOutcome::converged`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Solver names parse case-insensitively and print back to a form that
    // parses to the same value.
    fn solver_parses_and_displays_consistently() {
        assert_eq!("LBFGS".parse::<Solver>().unwrap(), Solver::Lbfgs(LineSearcher::MoreThuente));
        assert_eq!(
            "lbfgs-HagerZhang".parse::<Solver>().unwrap(),
            Solver::Lbfgs(LineSearcher::HagerZhang)
        );
        assert_eq!("nelder-mead".parse::<Solver>().unwrap(), Solver::NelderMead);
        for solver in [
            Solver::NelderMead,
            Solver::Lbfgs(LineSearcher::HagerZhang),
            Solver::Lbfgs(LineSearcher::MoreThuente),
        ] {
            assert_eq!(solver.to_string().parse::<Solver>().unwrap(), solver);
        }
        assert!(matches!("bfgs".parse::<Solver>(), Err(OptError::InvalidSolver { .. })));
        assert!("lbfgs-backtracking".parse::<Solver>().is_err());
    }

    #[test]
    // Purpose
    // -------
    // Tolerances reject the all-None and non-positive configurations.
    fn tolerances_enforce_rules() {
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(Some(-1.0), None, None),
            Err(OptError::InvalidTolGrad { .. })
        ));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));
        assert!(Tolerances::default().validate().is_ok());
        assert!(matches!(
            MLEOptions::new(Tolerances::default(), Solver::NelderMead, Some(0), 0.1),
            Err(OptError::InvalidLBFGSMem { .. })
        ));
        assert!(matches!(
            MLEOptions::new(Tolerances::default(), Solver::NelderMead, None, 0.0),
            Err(OptError::InvalidStep { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Only genuine convergence sets `converged`; the iteration cap does not.
    fn outcome_converged_reflects_termination_reason() {
        let ok = OptimOutcome::new(
            Some(array![1.0]),
            -2.0,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            10,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
        )
        .unwrap();
        assert!(ok.converged);
        assert_eq!(ok.grad_norm, Some(5.0));

        let capped = OptimOutcome::new(
            Some(array![1.0]),
            -2.0,
            TerminationStatus::Terminated(TerminationReason::MaxItersReached),
            500,
            FnEvalMap::new(),
            None,
        )
        .unwrap();
        assert!(!capped.converged);

        assert!(matches!(
            OptimOutcome::new(
                None,
                0.0,
                TerminationStatus::NotTerminated,
                0,
                FnEvalMap::new(),
                None
            ),
            Err(OptError::MissingThetaHat)
        ));
    }
}

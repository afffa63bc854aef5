//! Greedy basis growth.
//!
//! [`GreedyStrategy`] drives a [`BasisModel`] through the loop
//!
//! 1. **seed** — best single function from three weighted log-linear fits,
//!    plus optional scaled seeds from an exponent table;
//! 2. **refine** — NNLS coefficients for the current exponents, then a
//!    bounded quasi-Newton pass over every parameter;
//! 3. **grow** — split exponents by a fixed factor into `K + 1` candidates;
//! 4. **select** — refine each candidate and keep the cheapest;
//! 5. **terminate** — error tolerance, maximum size, stagnation, time
//!    budget or a caller predicate.
//!
//! Accepted iterations never increase the cost: a grow step that does not
//! improve by more than [`StopCriteria::min_improvement`] ends the run with
//! the previous state.
//!
//! # Example
//!
//! ```
//! use densfit::greedy::{GreedySettings, GreedyStrategy, Termination};
//! use densfit::grid::{Grid, RadialGrid};
//! use densfit::model::GaussianDensity;
//!
//! let grid = RadialGrid::uniform(50, 0.0, 10.0, false).unwrap();
//! let density = grid.points().iter().map(|r| 2.0 * (-1.5 * r * r).exp()).collect();
//! let model = GaussianDensity::new(grid, density).unwrap();
//!
//! let mut settings = GreedySettings::default();
//! settings.stop.max_functions = 1;
//! let report = GreedyStrategy::new(model, settings).unwrap().fit().unwrap();
//!
//! assert_eq!(report.termination, Termination::MaxFunctions);
//! assert!((report.params.coefficients()[0] - 2.0).abs() < 1e-6);
//! assert!((report.params.exponents()[0] - 1.5).abs() < 1e-6);
//! ```

mod refine;
mod seed;
mod split;

#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::FitError;
use crate::model::{BasisModel, Diagnostics};
use crate::optim::{BoundedSettings, NnlsSettings};
use crate::params::Params;

/// How the grow step proposes `K + 1` exponent sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitPolicy {
    /// Split only the exponent whose function carries the largest
    /// `Σ c_k φ_k |f − g|`.
    #[default]
    LargestResidual,
    /// Split every exponent in turn, and also try extending the set below
    /// the smallest and above the largest exponent.
    All,
}

/// When to stop growing the basis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopCriteria {
    /// Largest basis size to reach.
    pub max_functions: usize,
    /// Stop once [`BasisModel::integrated_error`] is at or below this.
    pub error_tolerance: Option<f64>,
    /// A grow step must lower the cost by more than this to be accepted.
    pub min_improvement: f64,
    /// Wall-clock budget, checked between iterations.
    pub time_budget: Option<Duration>,
}

impl Default for StopCriteria {
    fn default() -> Self {
        Self {
            max_functions: 10,
            error_tolerance: None,
            min_improvement: 0.0,
            time_budget: None,
        }
    }
}

/// Settings for [`GreedyStrategy`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GreedySettings {
    /// Splitting factor: exponent `a` becomes `a / factor` and `a · factor`.
    pub factor: f64,
    pub split_policy: SplitPolicy,
    pub stop: StopCriteria,
    pub nnls: NnlsSettings<f64>,
    pub minimizer: BoundedSettings<f64>,
    /// Lower bound on exponents during refinement.
    pub min_exponent: f64,
    /// Relative exponent perturbation for the single retry after a solver
    /// failure.
    pub retry_perturbation: f64,
    /// Standard exponents to seed from, in addition to the analytic seed.
    pub exponent_table: Vec<f64>,
    /// Scales applied to each table exponent.
    pub table_scales: Vec<f64>,
}

impl Default for GreedySettings {
    fn default() -> Self {
        Self {
            factor: 2.0,
            split_policy: SplitPolicy::default(),
            stop: StopCriteria::default(),
            nnls: NnlsSettings::default(),
            minimizer: BoundedSettings::default(),
            min_exponent: 1e-8,
            retry_perturbation: 0.05,
            exponent_table: Vec::new(),
            table_scales: vec![1.25, 1.5, 1.75],
        }
    }
}

impl GreedySettings {
    fn validate(&self) -> Result<(), FitError> {
        if !self.factor.is_finite() || self.factor <= 1.0 {
            return Err(FitError::Validation(format!(
                "split factor must be greater than 1, got {}",
                self.factor
            )));
        }
        if self.stop.max_functions == 0 {
            return Err(FitError::Validation(
                "max_functions must be at least 1".into(),
            ));
        }
        if !self.min_exponent.is_finite() || self.min_exponent <= 0.0 {
            return Err(FitError::Validation(format!(
                "min_exponent must be positive, got {}",
                self.min_exponent
            )));
        }
        if !(0.0..1.0).contains(&self.retry_perturbation) {
            return Err(FitError::Validation(format!(
                "retry_perturbation must lie in [0, 1), got {}",
                self.retry_perturbation
            )));
        }
        if self.stop.min_improvement.is_nan() || self.stop.min_improvement < 0.0 {
            return Err(FitError::Validation(format!(
                "min_improvement must be non-negative, got {}",
                self.stop.min_improvement
            )));
        }
        let positive = |v: &f64| v.is_finite() && *v > 0.0;
        if !self.exponent_table.iter().all(positive) || !self.table_scales.iter().all(positive) {
            return Err(FitError::Validation(
                "exponent table and scales must be finite and positive".into(),
            ));
        }
        Ok(())
    }
}

/// Why a fit stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    /// The integrated error reached the tolerance.
    ErrorTolerance,
    /// The basis reached `max_functions`.
    MaxFunctions,
    /// A grow step did not improve the cost enough.
    Stagnated,
    /// The caller's predicate asked to stop.
    Predicate,
    /// The time budget ran out.
    TimeBudget,
}

/// One accepted greedy iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationRecord {
    pub num_functions: usize,
    pub params: Params,
    pub cost: f64,
    pub integrated_error: f64,
    pub diagnostics: Diagnostics,
    /// Number of candidates refined to reach this state.
    pub candidates: usize,
    pub elapsed: Duration,
}

/// Result of a greedy fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitReport {
    pub params: Params,
    pub cost: f64,
    pub integrated_error: f64,
    pub termination: Termination,
    /// Accepted iterations in order, one per basis size.
    pub history: Vec<IterationRecord>,
}

impl FitReport {
    pub fn num_functions(&self) -> usize {
        self.params.num_functions()
    }
}

/// A parameter vector with its cost.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fitted {
    pub params: Vec<f64>,
    pub cost: f64,
}

/// Greedy fitting driver over a [`BasisModel`].
#[derive(Debug, Clone)]
pub struct GreedyStrategy<M> {
    model: M,
    settings: GreedySettings,
}

impl<M: BasisModel> GreedyStrategy<M> {
    /// Fails with [`FitError::Validation`] on inconsistent settings.
    pub fn new(model: M, settings: GreedySettings) -> Result<Self, FitError> {
        settings.validate()?;
        Ok(Self { model, settings })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn settings(&self) -> &GreedySettings {
        &self.settings
    }

    /// Best single basis function.
    ///
    /// The analytic seed is compared against its own refinement and against
    /// the refined exponent-table seeds; the lowest cost wins.
    pub fn best_one_function(&self) -> Result<(Params, f64), FitError> {
        let analytic = seed::analytic_seed(&self.model)?;
        let mut seeds = vec![vec![analytic.params[1]]];
        seeds.extend(seed::table_exponents(&self.settings));
        let mut best = analytic;

        let mut refined_any = false;
        let mut first_err = None;
        for exps in &seeds {
            match self.refine_exponents(exps) {
                Ok(fitted) => {
                    debug!("seed a = {:.6e}: cost {:.6e}", exps[0], fitted.cost);
                    refined_any = true;
                    if fitted.cost < best.cost {
                        best = fitted;
                    }
                }
                Err(err @ FitError::ConvergenceFailure { .. }) => {
                    warn!("seed a = {:.6e} did not refine: {err}", exps[0]);
                    first_err.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        if let (false, Some(err)) = (refined_any, first_err) {
            return Err(err);
        }
        Ok((Params::new(best.params)?, best.cost))
    }

    /// Refine a full parameter vector: NNLS coefficients for its exponents,
    /// then bounded minimization over every parameter.
    ///
    /// The supplied coefficients are only used as a fallback: the result is
    /// never worse than `params` itself.
    pub fn refine(&self, params: &Params) -> Result<(Params, f64), FitError> {
        let start = self.model.cost_function(params.as_slice())?;
        let fitted = self.refine_exponents(params.exponents())?;
        if fitted.cost <= start {
            Ok((Params::new(fitted.params)?, fitted.cost))
        } else {
            Ok((params.clone(), start))
        }
    }

    /// Exponent sets of size `K + 1` grown from `params`.
    pub fn next_candidates(&self, params: &Params) -> Result<Vec<Vec<f64>>, FitError> {
        split::candidates(&self.model, &self.settings, params)
    }

    /// Fit until one of the configured stop criteria fires.
    pub fn fit(&self) -> Result<FitReport, FitError> {
        self.fit_until(|_| false)
    }

    /// Fit until a stop criterion fires or `stop` returns `true` for an
    /// accepted iteration.
    pub fn fit_until(
        &self,
        mut stop: impl FnMut(&IterationRecord) -> bool,
    ) -> Result<FitReport, FitError> {
        let started = Instant::now();

        let (seed, seed_cost) = self.best_one_function()?;
        let mut current = Fitted {
            params: seed.into_vec(),
            cost: seed_cost,
        };
        let mut history = vec![self.record(&current, 1, started)?];
        info!(
            "K = 1: cost {:.6e}, error {:.6e}",
            current.cost, history[0].integrated_error
        );

        let termination = loop {
            let last = &history[history.len() - 1];
            if let Some(why) = self.check_stop(last, started) {
                break why;
            }
            if stop(last) {
                break Termination::Predicate;
            }

            let params = Params::new(current.params.clone())?;
            let candidates = self.next_candidates(&params)?;
            let best = self.select(&candidates)?;

            let improvement = current.cost - best.cost;
            if improvement.is_nan() || improvement <= self.settings.stop.min_improvement {
                info!(
                    "K = {}: best candidate cost {:.6e} does not improve on {:.6e}",
                    best.params.len() / 2,
                    best.cost,
                    current.cost
                );
                break Termination::Stagnated;
            }

            current = best;
            let record = self.record(&current, candidates.len(), started)?;
            info!(
                "K = {}: cost {:.6e}, error {:.6e}, diffuse {:.3e}, integration {:.3e}",
                record.num_functions,
                record.cost,
                record.integrated_error,
                record.diagnostics.diffuse_error,
                record.diagnostics.integration_error
            );
            history.push(record);
        };

        info!(
            "stopped at K = {} ({termination:?}), cost {:.6e}",
            current.params.len() / 2,
            current.cost
        );
        let integrated_error = history
            .last()
            .map_or(f64::NAN, |record| record.integrated_error);
        Ok(FitReport {
            params: Params::new(current.params)?,
            cost: current.cost,
            integrated_error,
            termination,
            history,
        })
    }

    fn check_stop(&self, last: &IterationRecord, started: Instant) -> Option<Termination> {
        let stop = &self.settings.stop;
        if stop
            .error_tolerance
            .is_some_and(|tol| last.integrated_error <= tol)
        {
            return Some(Termination::ErrorTolerance);
        }
        if last.num_functions >= stop.max_functions {
            return Some(Termination::MaxFunctions);
        }
        if stop
            .time_budget
            .is_some_and(|budget| started.elapsed() >= budget)
        {
            return Some(Termination::TimeBudget);
        }
        None
    }

    /// Refine every candidate and keep the cheapest.
    ///
    /// Candidates that fail to converge are skipped; the error is returned
    /// only if none succeeds. Any other error aborts the step.
    fn select(&self, candidates: &[Vec<f64>]) -> Result<Fitted, FitError> {
        #[cfg(feature = "parallel")]
        let results: Vec<Result<Fitted, FitError>> = {
            use rayon::prelude::*;
            candidates
                .par_iter()
                .map(|exps| self.refine_exponents(exps))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<Fitted, FitError>> = candidates
            .iter()
            .map(|exps| self.refine_exponents(exps))
            .collect();

        let mut best: Option<Fitted> = None;
        let mut first_err = None;
        for (exps, result) in candidates.iter().zip(results) {
            match result {
                Ok(fitted) => {
                    debug!("candidate {exps:?}: cost {:.6e}", fitted.cost);
                    if best.as_ref().map_or(true, |b| fitted.cost < b.cost) {
                        best = Some(fitted);
                    }
                }
                Err(err @ FitError::ConvergenceFailure { .. }) => {
                    warn!("candidate {exps:?} failed: {err}");
                    first_err.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        match (best, first_err) {
            (Some(best), _) => Ok(best),
            (None, Some(err)) => Err(err),
            (None, None) => Err(FitError::Validation(
                "split produced no candidates".into(),
            )),
        }
    }

    fn refine_exponents(&self, exponents: &[f64]) -> Result<Fitted, FitError> {
        refine::refine(&self.model, &self.settings, exponents)
    }

    fn record(
        &self,
        fitted: &Fitted,
        candidates: usize,
        started: Instant,
    ) -> Result<IterationRecord, FitError> {
        let params = Params::new(fitted.params.clone())?;
        Ok(IterationRecord {
            num_functions: params.num_functions(),
            cost: fitted.cost,
            integrated_error: self.model.integrated_error(params.as_slice())?,
            diagnostics: self.model.diagnostics(params.as_slice())?,
            params,
            candidates,
            elapsed: started.elapsed(),
        })
    }
}

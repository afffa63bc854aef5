use log::{debug, warn};

use crate::error::FitError;
use crate::model::BasisModel;
use crate::numeric::all_finite;
use crate::optim::{minimize_bounded, nnls, Bounds, OptimError};

use super::{Fitted, GreedySettings};

/// Failure of one refinement attempt.
#[derive(Debug)]
enum AttemptError {
    /// A solver gave up; worth one retry from a perturbed start.
    Solver {
        stage: &'static str,
        params: Vec<f64>,
        source: OptimError,
    },
    /// Invalid input or model-domain error; retrying cannot help.
    Fatal(FitError),
}

impl From<FitError> for AttemptError {
    fn from(err: FitError) -> Self {
        AttemptError::Fatal(err)
    }
}

/// NNLS coefficients for `exponents`, then bounded minimization of the
/// model cost over every parameter.
///
/// A solver failure is retried once with each exponent moved by the
/// relative perturbation, alternately up and down. If the retry fails too
/// the error carries the warm start of the first attempt and its cost.
pub(crate) fn refine<M: BasisModel>(
    model: &M,
    settings: &GreedySettings,
    exponents: &[f64],
) -> Result<Fitted, FitError> {
    let (stage, params, source) = match attempt(model, settings, exponents) {
        Ok(fitted) => return Ok(fitted),
        Err(AttemptError::Fatal(err)) => return Err(err),
        Err(AttemptError::Solver {
            stage,
            params,
            source,
        }) => (stage, params, source),
    };
    warn!("{stage} failed for exponents {exponents:?} ({source}), retrying perturbed");

    let perturbed = perturb(exponents, settings.retry_perturbation);
    match attempt(model, settings, &perturbed) {
        Ok(fitted) => Ok(fitted),
        Err(AttemptError::Fatal(err)) => Err(err),
        Err(AttemptError::Solver { stage, source, .. }) => {
            let cost = model.cost_function(&params).unwrap_or(f64::NAN);
            Err(FitError::ConvergenceFailure {
                stage,
                params,
                cost,
                source,
            })
        }
    }
}

/// `a_k (1 ± δ)` with the sign alternating over `k`.
pub(crate) fn perturb(exponents: &[f64], delta: f64) -> Vec<f64> {
    exponents
        .iter()
        .enumerate()
        .map(|(k, &a)| {
            if k % 2 == 0 {
                a * (1.0 + delta)
            } else {
                a * (1.0 - delta)
            }
        })
        .collect()
}

fn attempt<M: BasisModel>(
    model: &M,
    settings: &GreedySettings,
    exponents: &[f64],
) -> Result<Fitted, AttemptError> {
    let k = exponents.len();
    let exponents: Vec<f64> = exponents
        .iter()
        .map(|&a| a.max(settings.min_exponent))
        .collect();

    let design = model.create_cofactor_matrix(&exponents)?;
    let zero_start = || [vec![0.0; k], exponents.clone()].concat();
    let linear = nnls(&design, model.density(), &settings.nnls).map_err(|source| {
        AttemptError::Solver {
            stage: "nnls",
            params: zero_start(),
            source,
        }
    })?;

    let x0 = [linear.x, exponents.clone()].concat();
    if !all_finite(&x0) {
        return Err(AttemptError::Solver {
            stage: "nnls",
            params: zero_start(),
            source: OptimError::NotFinite,
        });
    }

    let lower = [vec![0.0; k], vec![settings.min_exponent; k]].concat();
    let bounds = Bounds::new(lower, vec![f64::INFINITY; 2 * k]).map_err(|source| {
        AttemptError::Solver {
            stage: "minimize",
            params: x0.clone(),
            source,
        }
    })?;

    // Out-of-domain evaluations show up as NaN, which the line search
    // rejects like any failed decrease test.
    let result = minimize_bounded(
        |p: &[f64]| model.cost_function(p).unwrap_or(f64::NAN),
        |p: &[f64]| {
            model
                .cost_gradient(p)
                .unwrap_or_else(|_| vec![f64::NAN; p.len()])
        },
        &x0,
        &bounds,
        &settings.minimizer,
    )
    .map_err(|source| AttemptError::Solver {
        stage: "minimize",
        params: x0.clone(),
        source,
    })?;

    if !all_finite(&result.x) || !result.fx.is_finite() {
        return Err(AttemptError::Solver {
            stage: "minimize",
            params: x0,
            source: OptimError::NotFinite,
        });
    }
    debug!(
        "refined K = {k} in {} iterations: cost {:.6e}, |pg| {:.3e}",
        result.iterations, result.fx, result.grad_norm
    );
    Ok(Fitted {
        params: result.x,
        cost: result.fx,
    })
}

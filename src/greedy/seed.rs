use log::{debug, warn};

use crate::error::FitError;
use crate::linalg::solve_2x2;
use crate::model::BasisModel;

use super::{Fitted, GreedySettings};

/// Weights of the log-linearized least-squares problem.
///
/// Taking logarithms flattens the relative size of the residuals; weighting
/// by the density (or its square) restores emphasis on the points that
/// carry the mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Weighting {
    Uniform,
    Density,
    DensitySquared,
}

impl Weighting {
    pub(crate) const ALL: [Weighting; 3] = [
        Weighting::Uniform,
        Weighting::Density,
        Weighting::DensitySquared,
    ];

    fn weight(self, f: f64) -> f64 {
        match self {
            Weighting::Uniform => 1.0,
            Weighting::Density => f,
            Weighting::DensitySquared => f * f,
        }
    }
}

/// Closed-form weighted fit of `y ≈ α − a·x` over `(index, x, y)` samples.
///
/// Returns `(α, a)`. The 2×2 normal equations are singular when fewer than
/// two distinct abscissae carry weight; a non-positive slope `a` has no
/// Gaussian reading and is reported the same way.
pub(crate) fn log_linear_fit(
    samples: &[(usize, f64, f64)],
    density: &[f64],
    weighting: Weighting,
) -> Result<(f64, f64), FitError> {
    let (mut s0, mut s1, mut s2, mut t0, mut t1) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for &(i, x, y) in samples {
        let w = weighting.weight(density[i]);
        s0 += w;
        s1 += w * x;
        s2 += w * x * x;
        t0 += w * y;
        t1 += w * x * y;
    }

    let [alpha, beta] = solve_2x2([[s0, s1], [s1, s2]], [t0, t1]).map_err(|_| {
        FitError::NumericalSingularity(format!(
            "{weighting:?} log-linear system over {} points",
            samples.len()
        ))
    })?;
    let exponent = -beta;
    if !alpha.is_finite() || !exponent.is_finite() || exponent <= 0.0 {
        return Err(FitError::NumericalSingularity(format!(
            "{weighting:?} log-linear fit gave exponent {exponent}"
        )));
    }
    Ok((alpha, exponent))
}

/// Best single function among the three weighted log-linear fits.
///
/// A degenerate weighting falls through to the next one; the fit fails
/// only when all of them do.
pub(crate) fn analytic_seed<M: BasisModel>(model: &M) -> Result<Fitted, FitError> {
    let samples = model.linearize();
    let density = model.density();

    let mut best: Option<Fitted> = None;
    let mut last_err = None;
    for weighting in Weighting::ALL {
        let (alpha, exponent) = match log_linear_fit(&samples, density, weighting) {
            Ok(fit) => fit,
            Err(err) => {
                warn!("seed weighting skipped: {err}");
                last_err = Some(err);
                continue;
            }
        };
        let params = vec![
            model.coefficient_for_amplitude(alpha.exp(), exponent),
            exponent,
        ];
        let cost = model.cost_function(&params)?;
        debug!("{weighting:?} seed {params:?}: cost {cost:.6e}");
        if !cost.is_finite() || !params[0].is_finite() {
            continue;
        }
        if best.as_ref().map_or(true, |b| cost < b.cost) {
            best = Some(Fitted { params, cost });
        }
    }

    best.ok_or_else(|| {
        last_err.unwrap_or_else(|| {
            FitError::NumericalSingularity("no seed weighting gave a finite cost".into())
        })
    })
}

/// Scaled exponent-table seeds, one single-exponent set per entry and scale.
pub(crate) fn table_exponents(settings: &GreedySettings) -> Vec<Vec<f64>> {
    settings
        .exponent_table
        .iter()
        .flat_map(|&a| settings.table_scales.iter().map(move |&s| vec![a * s]))
        .collect()
}

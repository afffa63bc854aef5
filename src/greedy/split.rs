use crate::error::FitError;
use crate::model::BasisModel;
use crate::params::Params;

use super::{GreedySettings, SplitPolicy};

/// `exponents` with entry `k` replaced by `a_k / factor` and `a_k · factor`.
pub(crate) fn split_at(exponents: &[f64], k: usize, factor: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(exponents.len() + 1);
    out.extend_from_slice(&exponents[..k]);
    out.push(exponents[k] / factor);
    out.push(exponents[k] * factor);
    out.extend_from_slice(&exponents[k + 1..]);
    out
}

/// Index of the function with the largest `Σ_i c_k φ_k(r_i) |f_i − g_i|`.
///
/// Ties go to the lowest index.
pub(crate) fn largest_residual<M: BasisModel>(
    model: &M,
    params: &Params,
) -> Result<usize, FitError> {
    let model_values = model.create_model(params.as_slice())?;
    let abs_residual: Vec<f64> = model
        .density()
        .iter()
        .zip(&model_values)
        .map(|(f, g)| (f - g).abs())
        .collect();
    let design = model.create_cofactor_matrix(params.exponents())?;

    let mut best = (0, f64::NEG_INFINITY);
    for (k, &c) in params.coefficients().iter().enumerate() {
        let score: f64 = design
            .col(k)
            .iter()
            .zip(&abs_residual)
            .map(|(phi, r)| c * phi * r)
            .sum();
        if score > best.1 {
            best = (k, score);
        }
    }
    Ok(best.0)
}

/// Candidate exponent sets of size `K + 1` under the configured policy.
pub(crate) fn candidates<M: BasisModel>(
    model: &M,
    settings: &GreedySettings,
    params: &Params,
) -> Result<Vec<Vec<f64>>, FitError> {
    let exponents = params.exponents();
    let factor = settings.factor;
    match settings.split_policy {
        SplitPolicy::LargestResidual => {
            let k = largest_residual(model, params)?;
            Ok(vec![split_at(exponents, k, factor)])
        }
        SplitPolicy::All => {
            let mut out: Vec<Vec<f64>> = (0..exponents.len())
                .map(|k| split_at(exponents, k, factor))
                .collect();
            let smallest = exponents.iter().copied().fold(f64::INFINITY, f64::min);
            let largest = exponents.iter().copied().fold(0.0, f64::max);
            out.push([exponents, &[smallest / factor]].concat());
            out.push([exponents, &[largest * factor]].concat());
            Ok(out)
        }
    }
}

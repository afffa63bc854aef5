//! Error taxonomy shared by every fitting stage.

use thiserror::Error;

use crate::optim::OptimError;

/// Errors surfaced by grids, measures, density models and the greedy loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Malformed input: non-positive counts, unsorted points, negative
    /// densities where positivity is required, odd parameter lengths.
    #[error("invalid input: {0}")]
    Validation(String),

    /// An array does not line up with the grid it is evaluated on.
    #[error("shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// Every analytic seed weighting produced a degenerate system.
    #[error("numerical singularity: {0}")]
    NumericalSingularity(String),

    /// A solver exhausted its budget, also after the perturbed retry.
    ///
    /// Carries the last parameter vector known to be valid and its cost.
    #[error("{stage} did not converge (last cost {cost:e}): {source}")]
    ConvergenceFailure {
        stage: &'static str,
        params: Vec<f64>,
        cost: f64,
        #[source]
        source: OptimError,
    },

    /// The model density is negative where a KL-divergence needs `g >= 0`.
    #[error("model density is negative at point {index} ({value:e})")]
    ModelDomain { index: usize, value: f64 },
}

/// Check that `values` has exactly `expected` entries.
pub(crate) fn check_len(values: &[f64], expected: usize) -> Result<(), FitError> {
    if values.len() != expected {
        return Err(FitError::ShapeMismatch {
            expected,
            got: values.len(),
        });
    }
    Ok(())
}

//! Pointwise discrepancy between a target density and a model.
//!
//! A measure returns one value per grid point; integrating those values
//! into a scalar divergence is left to the caller's [`Grid`](crate::grid::Grid).
//!
//! - [`SquaredDifference`] — `(f − g)²`
//! - [`KlDivergence`] — `f · ln(f / g)`

mod kl;
mod squared;


pub use kl::KlDivergence;
pub use squared::SquaredDifference;

use crate::error::FitError;

/// A pointwise discrepancy with an analytic derivative in the model values.
pub trait Measure: Send + Sync {
    /// The target density `f`, one value per grid point.
    fn density(&self) -> &[f64];

    /// Pointwise measure between the target and `model`.
    fn evaluate(&self, model: &[f64]) -> Result<Vec<f64>, FitError> {
        self.evaluate_with_derivative(model).map(|(value, _)| value)
    }

    /// Pointwise measure and its derivative with respect to each model value.
    fn evaluate_with_derivative(&self, model: &[f64]) -> Result<(Vec<f64>, Vec<f64>), FitError>;
}

fn check_density(density: &[f64]) -> Result<(), FitError> {
    if density.is_empty() {
        return Err(FitError::Validation("density must not be empty".into()));
    }
    if density.iter().any(|v| !v.is_finite()) {
        return Err(FitError::Validation("density must be finite".into()));
    }
    Ok(())
}

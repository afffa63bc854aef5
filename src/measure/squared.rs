use crate::error::{check_len, FitError};

use super::{check_density, Measure};

/// Squared difference `(f − g)²`; its integral is the squared L² distance.
///
/// ```
/// use densfit::measure::{Measure, SquaredDifference};
///
/// let m = SquaredDifference::new(vec![1.0, 2.0]).unwrap();
/// let (value, deriv) = m.evaluate_with_derivative(&[0.5, 3.0]).unwrap();
/// assert_eq!(value, vec![0.25, 1.0]);
/// assert_eq!(deriv, vec![-1.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SquaredDifference {
    density: Vec<f64>,
}

impl SquaredDifference {
    pub fn new(density: Vec<f64>) -> Result<Self, FitError> {
        check_density(&density)?;
        Ok(Self { density })
    }
}

impl Measure for SquaredDifference {
    fn density(&self) -> &[f64] {
        &self.density
    }

    fn evaluate_with_derivative(&self, model: &[f64]) -> Result<(Vec<f64>, Vec<f64>), FitError> {
        check_len(model, self.density.len())?;
        Ok(self
            .density
            .iter()
            .zip(model)
            .map(|(f, g)| {
                let residual = f - g;
                (residual * residual, -2.0 * residual)
            })
            .unzip())
    }
}

//! The flat parameter vector shared by every optimization step.

use crate::error::FitError;

/// Coefficients and exponents of `K` Gaussians, stored flat as
/// `[c_1, …, c_K, a_1, …, a_K]`.
///
/// Construction checks the invariants every fitting stage relies on: an
/// even, non-zero length, finite values, coefficients `≥ 0` and exponents
/// `> 0`. Each step produces a new `Params` rather than mutating one.
///
/// ```
/// use densfit::Params;
///
/// let p = Params::from_parts(&[2.0, 0.5], &[1.5, 0.1]).unwrap();
/// assert_eq!(p.num_functions(), 2);
/// assert_eq!(p.as_slice(), &[2.0, 0.5, 1.5, 0.1]);
/// assert!(Params::new(vec![1.0, 2.0, 3.0]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params {
    values: Vec<f64>,
}

impl Params {
    /// Validate a flat parameter vector.
    pub fn new(values: Vec<f64>) -> Result<Self, FitError> {
        if values.is_empty() || values.len() % 2 != 0 {
            return Err(FitError::Validation(format!(
                "parameter vector needs an even, non-zero length, got {}",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FitError::Validation(
                "parameter vector contains NaN or infinity".into(),
            ));
        }
        let k = values.len() / 2;
        if let Some(c) = values[..k].iter().find(|&&c| c < 0.0) {
            return Err(FitError::Validation(format!(
                "coefficients must be non-negative, got {c}"
            )));
        }
        if let Some(a) = values[k..].iter().find(|&&a| a <= 0.0) {
            return Err(FitError::Validation(format!(
                "exponents must be positive, got {a}"
            )));
        }
        Ok(Self { values })
    }

    /// Build from separate coefficient and exponent slices.
    pub fn from_parts(coefficients: &[f64], exponents: &[f64]) -> Result<Self, FitError> {
        if coefficients.len() != exponents.len() {
            return Err(FitError::ShapeMismatch {
                expected: coefficients.len(),
                got: exponents.len(),
            });
        }
        let mut values = Vec::with_capacity(2 * coefficients.len());
        values.extend_from_slice(coefficients);
        values.extend_from_slice(exponents);
        Self::new(values)
    }

    /// Number of basis functions `K`.
    pub fn num_functions(&self) -> usize {
        self.values.len() / 2
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.values[..self.num_functions()]
    }

    pub fn exponents(&self) -> &[f64] {
        &self.values[self.num_functions()..]
    }

    /// `(coefficient, exponent)` pairs, one per basis function.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.coefficients()
            .iter()
            .copied()
            .zip(self.exponents().iter().copied())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

/// Split a raw flat vector into `(coefficients, exponents)`.
pub(crate) fn split(params: &[f64]) -> Result<(&[f64], &[f64]), FitError> {
    if params.is_empty() || params.len() % 2 != 0 {
        return Err(FitError::Validation(format!(
            "parameter vector needs an even, non-zero length, got {}",
            params.len()
        )));
    }
    Ok(params.split_at(params.len() / 2))
}

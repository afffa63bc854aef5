use crate::error::{check_len, FitError};
use crate::numeric::{masked_ratio, DEFAULT_MASK_VALUE};

use super::{check_density, Measure};

/// Kullback-Leibler integrand `f · ln(f / g)`.
///
/// [`Measure::evaluate`] does not divide by model values at or below
/// `mask_value`: the ratio is taken as 1 there, so those points add no
/// divergence and a derivative of `−1`. Points where the target vanishes
/// contribute zero (the `f ln f → 0` limit).
///
/// Fitting objectives use [`evaluate_generalized`](Self::evaluate_generalized),
/// which adds the mass terms and does not fill masked points.
///
/// ```
/// use densfit::measure::{KlDivergence, Measure};
///
/// let f = vec![0.5, 1.0, 2.0];
/// let kl = KlDivergence::new(f.clone()).unwrap();
/// assert_eq!(kl.evaluate(&f).unwrap(), vec![0.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KlDivergence {
    density: Vec<f64>,
    mask_value: f64,
}

impl KlDivergence {
    /// KL measure with the default mask value `1e-12`.
    ///
    /// Fails if any target value is negative.
    pub fn new(density: Vec<f64>) -> Result<Self, FitError> {
        Self::with_mask_value(density, DEFAULT_MASK_VALUE)
    }

    /// KL measure with an explicit floor for model values.
    pub fn with_mask_value(density: Vec<f64>, mask_value: f64) -> Result<Self, FitError> {
        check_density(&density)?;
        if let Some(i) = density.iter().position(|&v| v < 0.0) {
            return Err(FitError::Validation(format!(
                "density must be non-negative, got {} at point {i}",
                density[i]
            )));
        }
        if !mask_value.is_finite() || mask_value < 0.0 {
            return Err(FitError::Validation(format!(
                "mask_value must be a non-negative number, got {mask_value}"
            )));
        }
        Ok(Self {
            density,
            mask_value,
        })
    }

    /// Floor at or below which model values are masked.
    pub fn mask_value(&self) -> f64 {
        self.mask_value
    }

    /// Generalized divergence `f ln(f/g) + g − f` and its derivative `1 − f/g`.
    ///
    /// Above the floor the integrand is non-negative and vanishes only where
    /// `g = f`, so its integral is zero at a perfect fit and grows with any
    /// mass mismatch. At or below the floor `m = mask_value` it continues
    /// along its tangent at `m`, `f ln(f/m) + g (1 − f/m)`: finite and
    /// differentiable, and a model that misses the target is still pulled up
    /// towards it. There the value never drops below `−m / e`.
    ///
    /// ```
    /// use densfit::measure::KlDivergence;
    ///
    /// let kl = KlDivergence::new(vec![1.0, 2.0]).unwrap();
    /// let (value, _) = kl.evaluate_generalized(&[1.0, 2.0]).unwrap();
    /// assert_eq!(value, vec![0.0, 0.0]);
    /// let (missed, deriv) = kl.evaluate_generalized(&[0.0, 2.0]).unwrap();
    /// assert!(missed[0] > 20.0);
    /// assert!(deriv[0] < 0.0);
    /// ```
    pub fn evaluate_generalized(&self, model: &[f64]) -> Result<(Vec<f64>, Vec<f64>), FitError> {
        check_model(model, self.density.len())?;
        let floor = self.mask_value;
        Ok(self
            .density
            .iter()
            .zip(model)
            .map(|(&f, &g)| {
                if f == 0.0 {
                    (g, 1.0)
                } else if g > floor {
                    (f * (f / g).ln() + g - f, 1.0 - f / g)
                } else {
                    let slope = 1.0 - f / floor;
                    (f * (f / floor).ln() + g * slope, slope)
                }
            })
            .unzip())
    }
}

fn check_model(model: &[f64], len: usize) -> Result<(), FitError> {
    check_len(model, len)?;
    match model.iter().position(|&g| g < 0.0) {
        Some(index) => Err(FitError::ModelDomain {
            index,
            value: model[index],
        }),
        None => Ok(()),
    }
}

impl Measure for KlDivergence {
    fn density(&self) -> &[f64] {
        &self.density
    }

    fn evaluate_with_derivative(&self, model: &[f64]) -> Result<(Vec<f64>, Vec<f64>), FitError> {
        check_model(model, self.density.len())?;
        let ratio = masked_ratio(&self.density, model, self.mask_value);
        Ok(self
            .density
            .iter()
            .zip(ratio)
            .map(|(&f, r)| {
                let value = if f == 0.0 { 0.0 } else { f * r.ln() };
                (value, -r)
            })
            .unzip())
    }
}

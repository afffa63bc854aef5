//! Basis-set density models.
//!
//! The greedy strategy only talks to a model through [`BasisModel`], so new
//! basis families plug into the same algorithm. [`GaussianDensity`] is the
//! radial Gaussian family `Σ c_k P(r) exp(−a_k r²)`.

mod gaussian;


pub use gaussian::{CostKind, GaussianDensity, Shell};

use crate::error::FitError;
use crate::linalg::DynMatrix;
use crate::optim::finite_difference_gradient;

/// Read-only fit quality numbers for one parameter vector.
///
/// None of these feed back into candidate selection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostics {
    /// `∫ r² g(r) dr`: mass captured by the model (up to `4π`).
    pub model_mass: f64,
    /// `|∫ r² f dr − ∫ r² g dr|`: mass conservation error.
    pub integration_error: f64,
    /// `∫ r² |f − g| dr`: long-range fit quality.
    pub diffuse_error: f64,
    /// `∫ |f − g|` under the grid's integration rule.
    pub goodness_of_fit: f64,
}

/// Capabilities a basis family provides to the fitting algorithm.
///
/// Parameters are always the flat `[coefficients…, exponents…]` layout of
/// [`Params`](crate::Params).
pub trait BasisModel: Send + Sync {
    /// Target density, one value per grid point.
    fn density(&self) -> &[f64];

    /// Model density for `params` at every grid point.
    fn create_model(&self, params: &[f64]) -> Result<Vec<f64>, FitError>;

    /// Design matrix with one column per exponent, evaluated at unit
    /// coefficient. A pure function of `exponents`.
    fn create_cofactor_matrix(&self, exponents: &[f64]) -> Result<DynMatrix<f64>, FitError>;

    /// Scalar objective minimized by the nonlinear refinement.
    fn cost_function(&self, params: &[f64]) -> Result<f64, FitError>;

    /// Gradient of [`cost_function`](Self::cost_function).
    ///
    /// Defaults to forward finite differences; families with an analytic
    /// derivative should override it.
    fn cost_gradient(&self, params: &[f64]) -> Result<Vec<f64>, FitError> {
        self.cost_function(params)?;
        let grad = finite_difference_gradient(
            |p: &[f64]| self.cost_function(p).unwrap_or(f64::NAN),
            params,
        );
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(FitError::Validation(
                "finite-difference gradient left the model domain".into(),
            ));
        }
        Ok(grad)
    }

    /// Grid-integrated discrepancy between target and model, used as the
    /// error tolerance test.
    fn integrated_error(&self, params: &[f64]) -> Result<f64, FitError>;

    /// Diagnostic error metrics for `params`.
    fn diagnostics(&self, params: &[f64]) -> Result<Diagnostics, FitError>;

    /// Samples `(index, x, y)` of the log-linearized single-function problem
    /// `y ≈ ln A − a·x`, where `A` is the amplitude of one basis function.
    ///
    /// Points where the logarithm is undefined are left out.
    fn linearize(&self) -> Vec<(usize, f64, f64)>;

    /// Coefficient for a basis function of the given amplitude `A`.
    fn coefficient_for_amplitude(&self, amplitude: f64, _exponent: f64) -> f64 {
        amplitude
    }
}

use core::f64::consts::PI;

use crate::error::{check_len, FitError};
use crate::grid::Grid;
use crate::linalg::DynMatrix;
use crate::measure::{KlDivergence, Measure, SquaredDifference};
use crate::numeric::{masked_ln, DEFAULT_MASK_VALUE};
use crate::params::split;

use super::{BasisModel, Diagnostics};

/// Angular shell of the fitted functions.
///
/// Each shell multiplies the radial Gaussian by a fixed polynomial
/// prefactor `r^{2l}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shell {
    #[default]
    S,
    P,
    D,
}

impl Shell {
    /// Angular momentum quantum number `l`.
    pub fn angular_momentum(self) -> u32 {
        match self {
            Shell::S => 0,
            Shell::P => 1,
            Shell::D => 2,
        }
    }

    fn prefactor(self, r2: f64) -> f64 {
        match self {
            Shell::S => 1.0,
            Shell::P => r2,
            Shell::D => r2 * r2,
        }
    }

    /// Exponent power `p` in the normalization `N(a) = C · a^p`.
    fn norm_power(self) -> f64 {
        1.5 + self.angular_momentum() as f64
    }

    /// Constant `C` in the normalization `N(a) = C · a^p`, which makes
    /// `4π ∫ r² N(a) r^{2l} exp(−a r²) dr = 1`.
    fn norm_constant(self) -> f64 {
        let pi32 = PI * PI.sqrt();
        match self {
            Shell::S => 1.0 / pi32,
            Shell::P => 2.0 / (3.0 * pi32),
            Shell::D => 4.0 / (15.0 * pi32),
        }
    }

    fn normalization(self, exponent: f64) -> f64 {
        self.norm_constant() * exponent.powf(self.norm_power())
    }
}

/// Objective minimized by the nonlinear refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CostKind {
    /// `Σ_i (f_i − g_i)²` over the grid points.
    #[default]
    LeastSquares,
    /// Grid-integrated `f ln(f/g) + g − f`.
    ///
    /// The `g − f` terms integrate to the mass difference and pin the model
    /// mass to the target's, so the cost is zero only at a perfect fit and
    /// an empty or too heavy model is never cheap. Model values below the
    /// mask floor follow [`KlDivergence::evaluate_generalized`].
    KlDivergence,
}

#[derive(Debug, Clone)]
enum CostMeasure {
    LeastSquares(SquaredDifference),
    KlDivergence(KlDivergence),
}

impl CostMeasure {
    fn as_measure(&self) -> &dyn Measure {
        match self {
            CostMeasure::LeastSquares(m) => m,
            CostMeasure::KlDivergence(m) => m,
        }
    }
}

/// Radial Gaussian density model `g(r) = Σ_k c_k N_k P(r) exp(−a_k r²)`.
///
/// `P(r)` is the [`Shell`] prefactor and `N_k` is either one or, with
/// [`normalized`](Self::normalized), the factor that gives each function
/// unit mass so the coefficients read as electron counts.
///
/// ```
/// use densfit::grid::{Grid, RadialGrid};
/// use densfit::model::{BasisModel, GaussianDensity};
///
/// let grid = RadialGrid::uniform(50, 0.0, 10.0, false).unwrap();
/// let density: Vec<f64> = grid.points().iter().map(|r| 2.0 * (-1.5 * r * r).exp()).collect();
/// let model = GaussianDensity::new(grid, density).unwrap();
/// assert!(model.cost_function(&[2.0, 1.5]).unwrap() < 1e-24);
/// ```
#[derive(Debug, Clone)]
pub struct GaussianDensity<G> {
    grid: G,
    r2: Vec<f64>,
    shell: Shell,
    normalized: bool,
    cost: CostMeasure,
}

impl<G: Grid> GaussianDensity<G> {
    /// Unnormalized s-type model with a least-squares cost.
    ///
    /// `density` must hold one finite value per grid point.
    pub fn new(grid: G, density: Vec<f64>) -> Result<Self, FitError> {
        if grid.is_empty() {
            return Err(FitError::Validation("grid has no points".into()));
        }
        check_len(&density, grid.len())?;
        let r2 = grid.points().iter().map(|r| r * r).collect();
        Ok(Self {
            grid,
            r2,
            shell: Shell::S,
            normalized: false,
            cost: CostMeasure::LeastSquares(SquaredDifference::new(density)?),
        })
    }

    pub fn with_shell(mut self, shell: Shell) -> Self {
        self.shell = shell;
        self
    }

    /// Scale every basis function to unit mass.
    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Switch the objective. KL requires a non-negative target density.
    pub fn with_cost(self, kind: CostKind) -> Result<Self, FitError> {
        let density = self.cost.as_measure().density().to_vec();
        let cost = match kind {
            CostKind::LeastSquares => CostMeasure::LeastSquares(SquaredDifference::new(density)?),
            CostKind::KlDivergence => CostMeasure::KlDivergence(KlDivergence::new(density)?),
        };
        Ok(Self { cost, ..self })
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn shell(&self) -> Shell {
        self.shell
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn cost_kind(&self) -> CostKind {
        match self.cost {
            CostMeasure::LeastSquares(_) => CostKind::LeastSquares,
            CostMeasure::KlDivergence(_) => CostKind::KlDivergence,
        }
    }

    /// Value of a single unit-coefficient basis function at every point.
    fn basis(&self, exponent: f64) -> impl Iterator<Item = f64> + '_ {
        let norm = if self.normalized {
            self.shell.normalization(exponent)
        } else {
            1.0
        };
        self.r2
            .iter()
            .map(move |&r2| norm * self.shell.prefactor(r2) * (-exponent * r2).exp())
    }

    /// `d ln N / d a`; zero for unnormalized functions.
    fn log_norm_slope(&self, exponent: f64) -> f64 {
        if self.normalized {
            self.shell.norm_power() / exponent
        } else {
            0.0
        }
    }

    /// `f − g` at every grid point.
    pub fn residual(&self, params: &[f64]) -> Result<Vec<f64>, FitError> {
        let model = self.create_model(params)?;
        Ok(self
            .density()
            .iter()
            .zip(&model)
            .map(|(f, g)| f - g)
            .collect())
    }

    /// `∫ r² g dr`: the model's mass up to `4π`.
    pub fn integrate_model_trapz(&self, model: &[f64]) -> Result<f64, FitError> {
        self.grid.integrate_r2(model)
    }

    /// `∫ r² |true − approx| dr`.
    pub fn diffuse_error(&self, true_model: &[f64], approx: &[f64]) -> Result<f64, FitError> {
        check_len(approx, true_model.len())?;
        let diff: Vec<f64> = true_model
            .iter()
            .zip(approx)
            .map(|(t, a)| (t - a).abs())
            .collect();
        self.grid.integrate_r2(&diff)
    }

    /// `|∫ r² true dr − ∫ r² approx dr|`.
    pub fn integration_error(&self, true_model: &[f64], approx: &[f64]) -> Result<f64, FitError> {
        check_len(approx, true_model.len())?;
        let expected = self.grid.integrate_r2(true_model)?;
        let actual = self.grid.integrate_r2(approx)?;
        Ok((expected - actual).abs())
    }

    /// `∫ |true − approx|` under the grid's own rule.
    ///
    /// Along the radius for a plain radial grid, over volume for spherical
    /// and cubic grids.
    pub fn goodness_of_fit(&self, true_model: &[f64], approx: &[f64]) -> Result<f64, FitError> {
        check_len(approx, true_model.len())?;
        let diff: Vec<f64> = true_model
            .iter()
            .zip(approx)
            .map(|(t, a)| (t - a).abs())
            .collect();
        self.grid.integrate(&diff)
    }

    /// `∫ r² |true − approx| dr`, the absolute error on the squared-radius
    /// measure. Same quantity as [`diffuse_error`](Self::diffuse_error).
    pub fn goodness_of_fit_squared(
        &self,
        true_model: &[f64],
        approx: &[f64],
    ) -> Result<f64, FitError> {
        self.diffuse_error(true_model, approx)
    }

    /// Integrated pointwise measure of the model against the target.
    fn integrated_measure(&self, model: &[f64]) -> Result<f64, FitError> {
        match &self.cost {
            CostMeasure::LeastSquares(m) => Ok(m.evaluate(model)?.iter().sum()),
            CostMeasure::KlDivergence(m) => {
                let (values, _) = m.evaluate_generalized(model)?;
                self.grid.integrate(&values)
            }
        }
    }
}

fn check_exponents(exponents: &[f64]) -> Result<(), FitError> {
    if let Some(bad) = exponents.iter().find(|a| !a.is_finite() || **a <= 0.0) {
        return Err(FitError::Validation(format!(
            "exponents must be finite and positive, got {bad}"
        )));
    }
    Ok(())
}

impl<G: Grid> BasisModel for GaussianDensity<G> {
    fn density(&self) -> &[f64] {
        self.cost.as_measure().density()
    }

    fn create_model(&self, params: &[f64]) -> Result<Vec<f64>, FitError> {
        let (coeffs, exps) = split(params)?;
        check_exponents(exps)?;
        let mut model = vec![0.0; self.r2.len()];
        for (&c, &a) in coeffs.iter().zip(exps) {
            for (m, phi) in model.iter_mut().zip(self.basis(a)) {
                *m += c * phi;
            }
        }
        Ok(model)
    }

    fn create_cofactor_matrix(&self, exponents: &[f64]) -> Result<DynMatrix<f64>, FitError> {
        check_exponents(exponents)?;
        let mut matrix = DynMatrix::zeros(self.r2.len(), exponents.len());
        for (k, &a) in exponents.iter().enumerate() {
            for (dst, phi) in matrix.col_mut(k).iter_mut().zip(self.basis(a)) {
                *dst = phi;
            }
        }
        Ok(matrix)
    }

    fn cost_function(&self, params: &[f64]) -> Result<f64, FitError> {
        let model = self.create_model(params)?;
        self.integrated_measure(&model)
    }

    /// Analytic gradient.
    ///
    /// With `φ_k` the unit-coefficient basis function and `p` the
    /// normalization power (zero when unnormalized),
    /// `∂g/∂c_k = φ_k` and `∂g/∂a_k = c_k φ_k (p / a_k − r²)`.
    fn cost_gradient(&self, params: &[f64]) -> Result<Vec<f64>, FitError> {
        let (coeffs, exps) = split(params)?;
        let model = self.create_model(params)?;
        // weight applied to ∂g at each point before reduction
        let (_, weight) = match &self.cost {
            CostMeasure::LeastSquares(m) => m.evaluate_with_derivative(&model)?,
            CostMeasure::KlDivergence(m) => m.evaluate_generalized(&model)?,
        };

        let k = coeffs.len();
        let mut grad = vec![0.0; 2 * k];
        let mut dc = vec![0.0; self.r2.len()];
        let mut da = vec![0.0; self.r2.len()];
        for (j, (&c, &a)) in coeffs.iter().zip(exps).enumerate() {
            let slope = self.log_norm_slope(a);
            for (i, phi) in self.basis(a).enumerate() {
                dc[i] = weight[i] * phi;
                da[i] = weight[i] * c * phi * (slope - self.r2[i]);
            }
            match self.cost {
                CostMeasure::LeastSquares(_) => {
                    grad[j] = dc.iter().sum();
                    grad[k + j] = da.iter().sum();
                }
                CostMeasure::KlDivergence(_) => {
                    grad[j] = self.grid.integrate(&dc)?;
                    grad[k + j] = self.grid.integrate(&da)?;
                }
            }
        }
        Ok(grad)
    }

    /// Grid-integrated squared difference, or the same non-negative
    /// divergence the KL cost minimizes.
    fn integrated_error(&self, params: &[f64]) -> Result<f64, FitError> {
        let model = self.create_model(params)?;
        match &self.cost {
            CostMeasure::LeastSquares(m) => self.grid.integrate(&m.evaluate(&model)?),
            CostMeasure::KlDivergence(_) => self.integrated_measure(&model),
        }
    }

    fn diagnostics(&self, params: &[f64]) -> Result<Diagnostics, FitError> {
        let model = self.create_model(params)?;
        let density = self.density();
        Ok(Diagnostics {
            model_mass: self.integrate_model_trapz(&model)?,
            integration_error: self.integration_error(density, &model)?,
            diffuse_error: self.diffuse_error(density, &model)?,
            goodness_of_fit: self.goodness_of_fit(density, &model)?,
        })
    }

    /// `ln f − ln P(r)` against `r²`, skipping points where the density is at
    /// or below the mask floor or the prefactor vanishes.
    fn linearize(&self) -> Vec<(usize, f64, f64)> {
        self.density()
            .iter()
            .zip(&self.r2)
            .enumerate()
            .filter_map(|(i, (&f, &r2))| {
                let ln_f = masked_ln(f, DEFAULT_MASK_VALUE)?;
                let ln_p = masked_ln(self.shell.prefactor(r2), 0.0)?;
                Some((i, r2, ln_f - ln_p))
            })
            .collect()
    }

    fn coefficient_for_amplitude(&self, amplitude: f64, exponent: f64) -> f64 {
        if self.normalized {
            amplitude / self.shell.normalization(exponent)
        } else {
            amplitude
        }
    }
}

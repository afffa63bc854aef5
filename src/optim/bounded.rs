use crate::linalg::DynMatrix;
use crate::traits::FloatScalar;

use super::line_search::projected_armijo;
use super::{dot, norm2, norm_inf, Bounds, MinimizeResult, OptimError};

/// Settings for projected BFGS minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundedSettings<T> {
    /// Convergence tolerance on the projected gradient (infinity norm).
    pub grad_tol: T,
    /// Convergence tolerance on relative function change.
    pub f_tol: T,
    /// Convergence tolerance on relative step size.
    pub x_tol: T,
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Armijo condition parameter (sufficient decrease).
    pub armijo_c1: T,
    /// Backtracking contraction factor.
    pub armijo_rho: T,
    /// Maximum line search iterations.
    pub max_ls_iter: usize,
}

impl Default for BoundedSettings<f64> {
    fn default() -> Self {
        Self {
            grad_tol: 1e-10,
            f_tol: 1e-14,
            x_tol: 1e-14,
            max_iter: 2000,
            armijo_c1: 1e-4,
            armijo_rho: 0.5,
            max_ls_iter: 60,
        }
    }
}

impl Default for BoundedSettings<f32> {
    fn default() -> Self {
        Self {
            grad_tol: 1e-5,
            f_tol: 1e-7,
            x_tol: 1e-7,
            max_iter: 2000,
            armijo_c1: 1e-4,
            armijo_rho: 0.5,
            max_ls_iter: 40,
        }
    }
}

fn eye<T: FloatScalar>(n: usize) -> DynMatrix<T> {
    DynMatrix::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
}

/// Minimize `f` subject to box constraints using projected BFGS.
///
/// Variables sitting on a bound with the gradient pushing outward are held
/// fixed for the step; the remaining ones follow the quasi-Newton direction
/// `-H·∇f`, and the line search projects every trial point back into the
/// box. `H` is rescaled after the first step and reset to the identity
/// whenever it stops producing a descent direction.
///
/// # Arguments
///
/// * `f` — objective function `f: Rⁿ → R`
/// * `grad` — gradient `∇f: Rⁿ → Rⁿ`
/// * `x0` — initial guess, projected into the box before the first step
/// * `bounds` — per-variable lower/upper bounds
/// * `settings` — convergence tolerances and algorithm parameters
///
/// # Errors
///
/// Returns [`OptimError::MaxIterations`] if convergence is not achieved.
/// Returns [`OptimError::LineSearchFailed`] if no decrease can be found even
/// along the projected steepest-descent direction while the predicted
/// decrease is still significant.
/// Returns [`OptimError::NotFinite`] if `f` or `∇f` is NaN/∞ at an accepted point.
///
/// # Example
///
/// ```
/// use densfit::optim::{minimize_bounded, Bounds, BoundedSettings};
///
/// // minimize (x0 + 1)^2 + (x1 - 2)^2 with x >= 0: optimum at (0, 2)
/// let bounds = Bounds::lower(vec![0.0, 0.0]).unwrap();
/// let r = minimize_bounded(
///     |x: &[f64]| (x[0] + 1.0).powi(2) + (x[1] - 2.0).powi(2),
///     |x: &[f64]| vec![2.0 * (x[0] + 1.0), 2.0 * (x[1] - 2.0)],
///     &[1.0, 1.0],
///     &bounds,
///     &BoundedSettings::default(),
/// )
/// .unwrap();
/// assert!(r.x[0].abs() < 1e-10);
/// assert!((r.x[1] - 2.0).abs() < 1e-6);
/// ```
pub fn minimize_bounded<T: FloatScalar>(
    mut f: impl FnMut(&[T]) -> T,
    mut grad: impl FnMut(&[T]) -> Vec<T>,
    x0: &[T],
    bounds: &Bounds<T>,
    settings: &BoundedSettings<T>,
) -> Result<MinimizeResult<T>, OptimError> {
    let n = x0.len();
    if bounds.len() != n {
        return Err(OptimError::DimensionMismatch {
            expected: n,
            got: bounds.len(),
        });
    }

    let mut x = x0.to_vec();
    bounds.project(&mut x);
    let mut fx = f(&x);
    let mut g = grad(&x);
    let mut f_evals = 1usize;
    let mut grad_evals = 1usize;
    if !fx.is_finite() || g.iter().any(|v| !v.is_finite()) {
        return Err(OptimError::NotFinite);
    }
    if g.len() != n {
        return Err(OptimError::DimensionMismatch {
            expected: n,
            got: g.len(),
        });
    }

    let mut h: DynMatrix<T> = eye(n);
    let mut first_step = true;

    for iter in 0..settings.max_iter {
        let pg = bounds.projected_gradient(&x, &g);
        let pg_norm = norm_inf(&pg);

        if pg_norm <= settings.grad_tol {
            return Ok(MinimizeResult {
                x,
                fx,
                grad_norm: pg_norm,
                iterations: iter,
                f_evals,
                grad_evals,
            });
        }

        // Variables clamped by an active bound do not move this step.
        let active: Vec<bool> = pg
            .iter()
            .zip(&g)
            .map(|(&pgi, &gi)| pgi == T::zero() && gi != T::zero())
            .collect();

        let mut p: Vec<T> = h.matvec(&pg).into_iter().map(|v| -v).collect();
        for (pi, &a) in p.iter_mut().zip(&active) {
            if a {
                *pi = T::zero();
            }
        }

        let steepest: Vec<T> = pg.iter().map(|&v| -v).collect();
        let mut h_reset = false;
        if dot(&pg, &p) >= T::zero() {
            // Not a descent direction, reset H to identity
            h = eye(n);
            p = steepest.clone();
            h_reset = true;
        }

        let mut search = projected_armijo(
            fx,
            &g,
            &x,
            &p,
            bounds,
            &mut f,
            settings.armijo_c1,
            settings.armijo_rho,
            settings.max_ls_iter,
        );
        if search.is_err() && !h_reset {
            f_evals += settings.max_ls_iter;
            h = eye(n);
            search = projected_armijo(
                fx,
                &g,
                &x,
                &steepest,
                bounds,
                &mut f,
                settings.armijo_c1,
                settings.armijo_rho,
                settings.max_ls_iter,
            );
        }

        let (x_new, f_new, ls_evals) = match search {
            Ok(found) => found,
            Err(err) => {
                // The predicted decrease of a unit steepest-descent step is
                // ‖pg‖²; below the relative f tolerance the cost is already
                // resolved to working precision.
                let predicted = dot(&pg, &pg);
                if predicted <= settings.f_tol * fx.abs().max(T::min_positive_value()) {
                    return Ok(MinimizeResult {
                        x,
                        fx,
                        grad_norm: pg_norm,
                        iterations: iter,
                        f_evals: f_evals + settings.max_ls_iter,
                        grad_evals,
                    });
                }
                return Err(err);
            }
        };
        f_evals += ls_evals;

        let s: Vec<T> = x_new.iter().zip(&x).map(|(&a, &b)| a - b).collect();
        let g_new = grad(&x_new);
        grad_evals += 1;
        if g_new.iter().any(|v| !v.is_finite()) {
            return Err(OptimError::NotFinite);
        }
        let y: Vec<T> = g_new.iter().zip(&g).map(|(&a, &b)| a - b).collect();

        let f_change = (fx - f_new).abs();
        let f_scale = fx.abs().max(f_new.abs()).max(T::min_positive_value());
        let step_norm = norm2(&s);
        let x_scale = norm2(&x_new).max(T::one());

        x = x_new;
        fx = f_new;
        g = g_new;

        if f_change <= settings.f_tol * f_scale || step_norm <= settings.x_tol * x_scale {
            let grad_norm = norm_inf(&bounds.projected_gradient(&x, &g));
            return Ok(MinimizeResult {
                x,
                fx,
                grad_norm,
                iterations: iter + 1,
                f_evals,
                grad_evals,
            });
        }

        // BFGS inverse Hessian update, skipped when curvature is not positive
        let sy = dot(&s, &y);
        if sy > T::epsilon() * step_norm * norm2(&y) {
            if first_step {
                let scale = sy / dot(&y, &y);
                h = DynMatrix::from_fn(n, n, |i, j| if i == j { scale } else { T::zero() });
                first_step = false;
            }
            let rho = T::one() / sy;
            let hy = h.matvec(&y);
            let yhy = dot(&y, &hy);
            let coef = rho * rho * yhy + rho;
            for j in 0..n {
                for i in 0..n {
                    h[(i, j)] = h[(i, j)] + coef * s[i] * s[j] - rho * (hy[i] * s[j] + s[i] * hy[j]);
                }
            }
        }
    }

    Err(OptimError::MaxIterations)
}

use crate::traits::FloatScalar;

use super::{dot, Bounds, OptimError};

/// Backtracking Armijo line search along the projected path.
///
/// Starts with `alpha = 1` and contracts by factor `rho` until the projected
/// trial point `x(α) = P(x + α·p)` satisfies
/// `f(x(α)) ≤ f(x) + c1·∇f·(x(α) − x)`.
///
/// Non-finite trial values are treated as a failed Armijo test, so the step
/// shrinks back into the region where the objective is defined.
///
/// Returns `(x_new, f_new, evals)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn projected_armijo<T: FloatScalar>(
    f_at_x: T,
    grad: &[T],
    x: &[T],
    p: &[T],
    bounds: &Bounds<T>,
    f: &mut impl FnMut(&[T]) -> T,
    c1: T,
    rho: T,
    max_iter: usize,
) -> Result<(Vec<T>, T, usize), OptimError> {
    let mut alpha = T::one();
    let mut evals = 0;
    let mut step = vec![T::zero(); x.len()];

    for _ in 0..max_iter {
        let mut x_new: Vec<T> = x.iter().zip(p).map(|(&xi, &pi)| xi + alpha * pi).collect();
        bounds.project(&mut x_new);
        for ((s, &xn), &xi) in step.iter_mut().zip(&x_new).zip(x) {
            *s = xn - xi;
        }

        let decrease = dot(grad, &step);
        if decrease < T::zero() {
            let f_new = f(&x_new);
            evals += 1;
            if f_new.is_finite() && f_new <= f_at_x + c1 * decrease {
                return Ok((x_new, f_new, evals));
            }
        }

        alpha = alpha * rho;
    }

    Err(OptimError::LineSearchFailed)
}

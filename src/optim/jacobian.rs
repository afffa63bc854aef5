use crate::traits::FloatScalar;

/// Approximate the gradient of `f: Rⁿ → R` using forward finite differences.
///
/// Uses step size `h_j = sqrt(ε) * max(|x_j|, 1)` for each component,
/// requiring `n + 1` function evaluations.
///
/// # Example
///
/// ```
/// use densfit::optim::finite_difference_gradient;
///
/// // f(x) = x0^2 + 2*x1^2, grad = [2*x0, 4*x1]
/// let g = finite_difference_gradient(|x: &[f64]| x[0] * x[0] + 2.0 * x[1] * x[1], &[3.0, 4.0]);
/// assert!((g[0] - 6.0).abs() < 1e-5);
/// assert!((g[1] - 16.0).abs() < 1e-5);
/// ```
pub fn finite_difference_gradient<T: FloatScalar>(mut f: impl FnMut(&[T]) -> T, x: &[T]) -> Vec<T> {
    let sqrt_eps = T::epsilon().sqrt();
    let f0 = f(x);
    let mut x_pert = x.to_vec();

    (0..x.len())
        .map(|j| {
            let h = sqrt_eps * x[j].abs().max(T::one());
            x_pert[j] = x[j] + h;
            let g = (f(&x_pert) - f0) / h;
            x_pert[j] = x[j];
            g
        })
        .collect()
}

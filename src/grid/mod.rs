//! Sample points and integration rules.
//!
//! - [`RadialGrid`] — sorted radii with trapezoidal integration, optionally
//!   weighted by the spherical volume element `4πr²`
//! - [`CubicGrid`] — uniform 3-D lattice integrated by a Riemann sum
//!
//! Both implement [`Grid`], the only view of a grid the density models need.

mod cubic;
mod radial;

#[cfg(test)]
mod tests;

pub use cubic::CubicGrid;
pub use radial::RadialGrid;

use crate::error::{check_len, FitError};

/// Points plus an integration rule over them.
pub trait Grid: Send + Sync {
    /// Radial coordinate of every sample point.
    fn points(&self) -> &[f64];

    /// Number of sample points.
    fn len(&self) -> usize {
        self.points().len()
    }

    /// `true` if the grid has no points.
    fn is_empty(&self) -> bool {
        self.points().is_empty()
    }

    /// Integrate values sampled on the grid with the grid's own rule.
    ///
    /// Fails with [`FitError::ShapeMismatch`] if `values.len() != self.len()`.
    fn integrate(&self, values: &[f64]) -> Result<f64, FitError>;

    /// Radial moment `∫ r² v(r) dr` over `[0, ∞)`.
    ///
    /// Used by the mass diagnostics, which compare total electron counts up
    /// to the constant `4π`.
    fn integrate_r2(&self, values: &[f64]) -> Result<f64, FitError>;
}

/// Trapezoidal rule `∫ y dx` over sorted abscissae.
///
/// ```
/// use densfit::grid::trapz;
///
/// let x = [0.0, 0.5, 1.0];
/// assert_eq!(trapz(&x, &[1.0, 1.0, 1.0]).unwrap(), 1.0);
/// assert_eq!(trapz(&x, &[0.0, 0.5, 1.0]).unwrap(), 0.5);
/// ```
pub fn trapz(x: &[f64], y: &[f64]) -> Result<f64, FitError> {
    check_len(y, x.len())?;
    Ok(x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum())
}

//! Dense linear algebra on heap matrices with runtime dimensions.
//!
//! Only what the fitting stages need: a column-major [`DynMatrix`], a
//! Householder least-squares solve used by NNLS for the passive-set
//! sub-problems, and a direct 2×2 solve for the analytic seed.

mod matrix;
pub(crate) mod qr;


pub use matrix::DynMatrix;
pub use qr::lstsq;

use thiserror::Error;

use crate::traits::FloatScalar;

/// Errors from linear algebra operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinalgError {
    /// Matrix is singular or numerically rank deficient.
    #[error("matrix is singular")]
    Singular,
    /// Least-squares systems need at least as many rows as columns.
    #[error("matrix is underdetermined: {rows} rows for {cols} columns")]
    Underdetermined { rows: usize, cols: usize },
}

/// Solve the 2×2 system `a · x = b` by Cramer's rule.
///
/// The determinant is compared against the magnitude of its two products,
/// so a system is rejected as [`LinalgError::Singular`] when cancellation
/// leaves no significant digits, independent of the overall scale.
///
/// ```
/// use densfit::linalg::solve_2x2;
///
/// let x = solve_2x2([[2.0_f64, 1.0], [1.0, 3.0]], [3.0, 5.0]).unwrap();
/// assert!((x[0] - 0.8).abs() < 1e-14);
/// assert!((x[1] - 1.4).abs() < 1e-14);
/// ```
pub fn solve_2x2<T: FloatScalar>(a: [[T; 2]; 2], b: [T; 2]) -> Result<[T; 2], LinalgError> {
    let p = a[0][0] * a[1][1];
    let q = a[0][1] * a[1][0];
    let det = p - q;
    let scale = p.abs() + q.abs();
    if !det.is_finite() || det.abs() <= T::lit(64.0) * T::epsilon() * scale || det == T::zero() {
        return Err(LinalgError::Singular);
    }
    let x0 = (b[0] * a[1][1] - a[0][1] * b[1]) / det;
    let x1 = (a[0][0] * b[1] - b[0] * a[1][0]) / det;
    Ok([x0, x1])
}

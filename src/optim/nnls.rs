use crate::linalg::{lstsq, DynMatrix};
use crate::traits::FloatScalar;

use super::{norm2, NnlsResult, OptimError};

/// Settings for Lawson–Hanson NNLS.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NnlsSettings<T> {
    /// Maximum number of active-set iterations, as a multiple of the number
    /// of columns.
    pub max_iter_factor: usize,
    /// Dual feasibility tolerance. `None` uses `10·ε·‖A‖₁·max(m, n)`.
    pub tol: Option<T>,
}

impl<T> Default for NnlsSettings<T> {
    fn default() -> Self {
        Self {
            max_iter_factor: 5,
            tol: None,
        }
    }
}

fn residual<T: FloatScalar>(a: &DynMatrix<T>, x: &[T], b: &[T]) -> Vec<T> {
    a.matvec(x).iter().zip(b).map(|(&ax, &bi)| bi - ax).collect()
}

/// Solve `min ‖A·x − b‖₂` subject to `x ≥ 0` (Lawson–Hanson active set).
///
/// Columns move from the active (zero) set to the passive set one at a time,
/// in order of the largest dual value `w = Aᵀ(b − A·x)`. Each passive-set
/// sub-problem is an unconstrained least-squares solve; when it would make
/// a passive variable non-positive, the iterate is moved back along the
/// segment to the first variable that hits zero, which then returns to the
/// active set.
///
/// # Errors
///
/// Returns [`OptimError::DimensionMismatch`] if `b.len() != A.nrows()`.
/// Returns [`OptimError::MaxIterations`] if the active set has not settled
/// within `max_iter_factor · n` iterations.
/// Returns [`OptimError::Singular`] if a passive-set sub-problem is rank
/// deficient.
///
/// # Example
///
/// ```
/// use densfit::linalg::DynMatrix;
/// use densfit::optim::{nnls, NnlsSettings};
///
/// // unconstrained solution is (2, -1); the constrained one clamps x1 to 0
/// let a = DynMatrix::from_rows(3, 2, &[1.0_f64, 0.0, 0.0, 1.0, 1.0, 1.0]);
/// let r = nnls(&a, &[2.0, -1.0, 1.0], &NnlsSettings::default()).unwrap();
/// assert!((r.x[0] - 1.5).abs() < 1e-12);
/// assert_eq!(r.x[1], 0.0);
/// ```
pub fn nnls<T: FloatScalar>(
    a: &DynMatrix<T>,
    b: &[T],
    settings: &NnlsSettings<T>,
) -> Result<NnlsResult<T>, OptimError> {
    let m = a.nrows();
    let n = a.ncols();
    if b.len() != m {
        return Err(OptimError::DimensionMismatch {
            expected: m,
            got: b.len(),
        });
    }
    if (0..n).any(|j| a.col(j).iter().any(|v| !v.is_finite())) || b.iter().any(|v| !v.is_finite()) {
        return Err(OptimError::NotFinite);
    }

    let tol = settings.tol.unwrap_or_else(|| {
        T::lit(10.0) * T::epsilon() * a.norm_one() * T::from_usize(m.max(n)).unwrap_or_else(T::one)
    });
    let max_iter = settings.max_iter_factor.max(1) * n.max(1);

    let mut x = vec![T::zero(); n];
    let mut passive = vec![false; n];
    // columns whose sub-problem rejected them at zero step; retried once x moves
    let mut stalled = vec![false; n];
    let mut w = a.tr_matvec(b);
    let mut iterations = 0;

    loop {
        // pick the most promising active column
        let candidate = (0..n)
            .filter(|&j| !passive[j] && !stalled[j] && w[j] > tol)
            .fold(None, |best: Option<usize>, j| match best {
                Some(k) if w[k] >= w[j] => Some(k),
                _ => Some(j),
            });
        let Some(t) = candidate else {
            break;
        };
        passive[t] = true;

        loop {
            iterations += 1;
            if iterations > max_iter {
                return Err(OptimError::MaxIterations);
            }

            let cols: Vec<usize> = (0..n).filter(|&j| passive[j]).collect();
            let z_p = lstsq(&a.select_columns(&cols), b)?;
            let mut z = vec![T::zero(); n];
            for (&j, &v) in cols.iter().zip(&z_p) {
                z[j] = v;
            }

            if cols.iter().all(|&j| z[j] > T::zero()) {
                x = z;
                stalled.iter_mut().for_each(|s| *s = false);
                break;
            }

            // step back towards x until the first passive variable reaches zero
            let mut blocking: Option<(usize, T)> = None;
            for &j in &cols {
                if z[j] <= T::zero() {
                    let alpha_j = x[j] / (x[j] - z[j]);
                    if blocking.map_or(true, |(_, alpha)| alpha_j < alpha) {
                        blocking = Some((j, alpha_j));
                    }
                }
            }
            let Some((k, alpha)) = blocking else {
                break;
            };
            for j in 0..n {
                x[j] = x[j] + alpha * (z[j] - x[j]);
            }

            let x_scale = x.iter().fold(T::zero(), |acc, &v| acc.max(v.abs()));
            x[k] = T::zero();
            passive[k] = false;
            for &j in &cols {
                if x[j] <= T::epsilon() * x_scale {
                    x[j] = T::zero();
                    passive[j] = false;
                }
            }
            if k == t && alpha == T::zero() {
                stalled[t] = true;
            }
            if !passive.iter().any(|&p| p) {
                break;
            }
        }

        w = a.tr_matvec(&residual(a, &x, b));
        if passive.iter().all(|&p| p) {
            break;
        }
    }

    let residual_norm = norm2(&residual(a, &x, b));
    Ok(NnlsResult {
        x,
        residual_norm,
        iterations,
    })
}

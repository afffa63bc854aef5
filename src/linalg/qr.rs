use crate::traits::FloatScalar;

use super::{DynMatrix, LinalgError};

/// Householder QR factorization in place.
///
/// On return, the upper triangle of `a` (including the diagonal) holds R
/// and the strict lower triangle holds the Householder vectors, scaled so
/// their leading entry is an implicit 1. `tau` receives the reflector
/// scalars.
///
/// A column whose remaining norm falls below `rank_tol` relative to the
/// largest diagonal of R seen so far is reported as
/// [`LinalgError::Singular`].
pub(crate) fn qr_in_place<T: FloatScalar>(
    a: &mut DynMatrix<T>,
    tau: &mut [T],
    rank_tol: T,
) -> Result<(), LinalgError> {
    let m = a.nrows();
    let n = a.ncols();
    debug_assert!(m >= n);
    debug_assert_eq!(tau.len(), n);

    let mut r_max = T::zero();

    for col in 0..n {
        let mut norm_sq = T::zero();
        for i in col..m {
            let v = a[(i, col)];
            norm_sq = norm_sq + v * v;
        }
        let norm = norm_sq.sqrt();
        r_max = r_max.max(norm);

        if norm == T::zero() || norm <= rank_tol * r_max {
            return Err(LinalgError::Singular);
        }

        // sigma carries the sign of the pivot so v0 = a + sigma never cancels
        let a_cc = a[(col, col)];
        let sigma = if a_cc < T::zero() { -norm } else { norm };
        let v0 = a_cc + sigma;
        let tau_val = v0 / sigma;
        tau[col] = tau_val;

        for i in (col + 1)..m {
            a[(i, col)] = a[(i, col)] / v0;
        }

        for j in (col + 1)..n {
            let mut dot = a[(col, j)];
            for i in (col + 1)..m {
                dot = dot + a[(i, col)] * a[(i, j)];
            }
            dot = dot * tau_val;

            a[(col, j)] = a[(col, j)] - dot;
            for i in (col + 1)..m {
                a[(i, j)] = a[(i, j)] - dot * a[(i, col)];
            }
        }

        a[(col, col)] = -sigma;
    }

    Ok(())
}

/// Apply `Qᵀ` from a packed factorization to `b` in place.
fn apply_qt<T: FloatScalar>(qr: &DynMatrix<T>, tau: &[T], b: &mut [T]) {
    let m = qr.nrows();
    for (col, &tau_val) in tau.iter().enumerate() {
        let mut dot = b[col];
        for i in (col + 1)..m {
            dot = dot + qr[(i, col)] * b[i];
        }
        dot = dot * tau_val;
        b[col] = b[col] - dot;
        for i in (col + 1)..m {
            b[i] = b[i] - dot * qr[(i, col)];
        }
    }
}

/// Least-squares solution of `min ‖A·x − b‖₂` via Householder QR.
///
/// Requires `A` to have at least as many rows as columns and full column
/// rank (to a relative tolerance of `1e3 · ε · max(m, n)`).
///
/// ```
/// use densfit::linalg::{lstsq, DynMatrix};
///
/// // y = c0 + c1*x through (0,1), (1,2), (2,4)
/// let a = DynMatrix::from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let x = lstsq(&a, &[1.0, 2.0, 4.0]).unwrap();
/// assert!((x[0] - 5.0 / 6.0).abs() < 1e-12);
/// assert!((x[1] - 1.5).abs() < 1e-12);
/// ```
pub fn lstsq<T: FloatScalar>(a: &DynMatrix<T>, b: &[T]) -> Result<Vec<T>, LinalgError> {
    let m = a.nrows();
    let n = a.ncols();
    if m < n {
        return Err(LinalgError::Underdetermined { rows: m, cols: n });
    }
    debug_assert_eq!(b.len(), m);

    let rank_tol = T::lit(1e3) * T::epsilon() * T::from_usize(m.max(n)).unwrap_or_else(T::one);
    let mut qr = a.clone();
    let mut tau = vec![T::zero(); n];
    qr_in_place(&mut qr, &mut tau, rank_tol)?;

    let mut qtb = b.to_vec();
    apply_qt(&qr, &tau, &mut qtb);

    // back substitution R x = (Qᵀ b)[..n]
    let mut x = vec![T::zero(); n];
    for i in (0..n).rev() {
        let mut sum = qtb[i];
        for j in (i + 1)..n {
            sum = sum - qr[(i, j)] * x[j];
        }
        x[i] = sum / qr[(i, i)];
    }
    Ok(x)
}

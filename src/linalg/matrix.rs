use core::ops::{Index, IndexMut};

use crate::traits::FloatScalar;

/// Dynamically-sized heap-allocated matrix.
///
/// Column-major `Vec<T>` storage: column `j` is the contiguous slice
/// `data[j * nrows..(j + 1) * nrows]`. The design matrices built by the
/// density models have one column per basis function, so column access is
/// the hot path.
///
/// ```
/// use densfit::linalg::DynMatrix;
///
/// let a = DynMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// assert_eq!(a[(0, 1)], 2.0);
/// assert_eq!(a.col(1), &[2.0, 4.0]);
/// assert_eq!(a.matvec(&[1.0, 1.0]), vec![3.0, 7.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DynMatrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

impl<T: FloatScalar> DynMatrix<T> {
    /// Create an `nrows x ncols` matrix of zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![T::zero(); nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create a matrix by evaluating `f(i, j)` for every entry.
    pub fn from_fn(nrows: usize, ncols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Create a matrix from a flat slice in row-major order.
    ///
    /// Panics if `row_major.len() != nrows * ncols`.
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        Self::from_fn(nrows, ncols, |i, j| row_major[i * ncols + j])
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Column `j` as a contiguous slice.
    #[inline]
    pub fn col(&self, j: usize) -> &[T] {
        &self.data[j * self.nrows..(j + 1) * self.nrows]
    }

    /// Mutable column `j`.
    #[inline]
    pub fn col_mut(&mut self, j: usize) -> &mut [T] {
        let n = self.nrows;
        &mut self.data[j * n..(j + 1) * n]
    }

    /// Matrix-vector product `A · x`.
    pub fn matvec(&self, x: &[T]) -> Vec<T> {
        debug_assert_eq!(x.len(), self.ncols);
        let mut out = vec![T::zero(); self.nrows];
        for (j, &xj) in x.iter().enumerate() {
            if xj == T::zero() {
                continue;
            }
            for (o, &a) in out.iter_mut().zip(self.col(j)) {
                *o = *o + a * xj;
            }
        }
        out
    }

    /// Transposed product `Aᵀ · y`.
    pub fn tr_matvec(&self, y: &[T]) -> Vec<T> {
        debug_assert_eq!(y.len(), self.nrows);
        (0..self.ncols)
            .map(|j| {
                self.col(j)
                    .iter()
                    .zip(y)
                    .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
            })
            .collect()
    }

    /// New matrix made of the listed columns, in the given order.
    pub fn select_columns(&self, cols: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.nrows * cols.len());
        for &j in cols {
            data.extend_from_slice(self.col(j));
        }
        Self {
            data,
            nrows: self.nrows,
            ncols: cols.len(),
        }
    }

    /// Maximum absolute column sum, `‖A‖₁`.
    pub fn norm_one(&self) -> T {
        (0..self.ncols)
            .map(|j| self.col(j).iter().fold(T::zero(), |acc, &a| acc + a.abs()))
            .fold(T::zero(), T::max)
    }
}

impl<T> Index<(usize, usize)> for DynMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[j * self.nrows + i]
    }
}

impl<T> IndexMut<(usize, usize)> for DynMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.data[j * self.nrows + i]
    }
}

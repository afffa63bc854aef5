//! Solvers behind the refine step: NNLS and bound-constrained minimization.
//!
//! Both work on heap vectors with runtime length, since the number of basis
//! functions grows during a fit. Requires [`FloatScalar`] (real-valued only).
//!
//! # Linear sub-problem
//!
//! - [`nnls`] — Lawson–Hanson active-set non-negative least squares
//!
//! # Bound-constrained minimization
//!
//! - [`minimize_bounded`] — projected BFGS with a projected Armijo line search
//!
//! # Finite differences
//!
//! - [`finite_difference_gradient`] — forward-difference gradient approximation

mod bounded;
mod jacobian;
pub(crate) mod line_search;
mod nnls;


pub use bounded::{minimize_bounded, BoundedSettings};
pub use jacobian::finite_difference_gradient;
pub use nnls::{nnls, NnlsSettings};

use thiserror::Error;

use crate::linalg::LinalgError;
use crate::traits::FloatScalar;

/// Errors from optimization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OptimError {
    /// Maximum number of iterations exceeded.
    #[error("maximum iterations exceeded")]
    MaxIterations,
    /// Encountered a singular or near-singular matrix.
    #[error("singular or near-singular matrix")]
    Singular,
    /// A computed value was NaN or infinity.
    #[error("computed value is NaN or infinity")]
    NotFinite,
    /// Line search failed to find a sufficient decrease.
    #[error("line search failed")]
    LineSearchFailed,
    /// Input lengths disagree.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// A lower bound exceeds its upper bound.
    #[error("infeasible bounds")]
    InfeasibleBounds,
}

impl From<LinalgError> for OptimError {
    fn from(_: LinalgError) -> Self {
        OptimError::Singular
    }
}

/// Box constraints `lower[i] <= x[i] <= upper[i]`.
///
/// Use `T::infinity()` for an unbounded side.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds<T> {
    lower: Vec<T>,
    upper: Vec<T>,
}

impl<T: FloatScalar> Bounds<T> {
    /// Build bounds from explicit lower and upper vectors.
    pub fn new(lower: Vec<T>, upper: Vec<T>) -> Result<Self, OptimError> {
        if lower.len() != upper.len() {
            return Err(OptimError::DimensionMismatch {
                expected: lower.len(),
                got: upper.len(),
            });
        }
        if lower.iter().zip(&upper).any(|(&l, &u)| l.is_nan() || u.is_nan() || l > u) {
            return Err(OptimError::InfeasibleBounds);
        }
        Ok(Self { lower, upper })
    }

    /// Lower bounds only; every upper bound is `+∞`.
    pub fn lower(lower: Vec<T>) -> Result<Self, OptimError> {
        let upper = vec![T::infinity(); lower.len()];
        Self::new(lower, upper)
    }

    /// Number of bounded variables.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// `true` if there are no variables.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Clamp `x` into the box in place.
    pub fn project(&self, x: &mut [T]) {
        for ((xi, &l), &u) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *xi = xi.max(l).min(u);
        }
    }

    /// Projected gradient: components that push `x` out of the box through
    /// an active bound are zeroed.
    pub fn projected_gradient(&self, x: &[T], g: &[T]) -> Vec<T> {
        x.iter()
            .zip(g)
            .zip(self.lower.iter().zip(&self.upper))
            .map(|((&xi, &gi), (&l, &u))| {
                if (xi <= l && gi > T::zero()) || (xi >= u && gi < T::zero()) {
                    T::zero()
                } else {
                    gi
                }
            })
            .collect()
    }
}

/// Result of a bound-constrained minimization.
#[derive(Debug, Clone)]
pub struct MinimizeResult<T> {
    /// Approximate minimizer.
    pub x: Vec<T>,
    /// Function value at the minimizer: `f(x)`.
    pub fx: T,
    /// Infinity norm of the projected gradient at the minimizer.
    pub grad_norm: T,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of function evaluations.
    pub f_evals: usize,
    /// Number of gradient evaluations.
    pub grad_evals: usize,
}

/// Result of a non-negative least-squares solve.
#[derive(Debug, Clone)]
pub struct NnlsResult<T> {
    /// Non-negative solution.
    pub x: Vec<T>,
    /// Residual norm `‖A·x − b‖₂`.
    pub residual_norm: T,
    /// Number of active-set iterations performed.
    pub iterations: usize,
}

pub(crate) fn norm_inf<T: FloatScalar>(v: &[T]) -> T {
    v.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()))
}

pub(crate) fn norm2<T: FloatScalar>(v: &[T]) -> T {
    v.iter().fold(T::zero(), |acc, &x| acc + x * x).sqrt()
}

pub(crate) fn dot<T: FloatScalar>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

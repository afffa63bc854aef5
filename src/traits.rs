use core::fmt::Debug;
use num_traits::{Float, FromPrimitive};

/// Trait for floating-point elements accepted by the solvers.
///
/// Blanket-implemented for `f32` and `f64`. The `Send + Sync` bounds let
/// candidate refinements run on worker threads.
pub trait FloatScalar: Float + FromPrimitive + Debug + Send + Sync + 'static {
    /// Convert an `f64` literal into `Self`.
    ///
    /// Every literal used by the solvers is representable in both `f32` and
    /// `f64`, so the fallback is never taken in practice.
    #[inline]
    fn lit(v: f64) -> Self {
        Self::from_f64(v).unwrap_or_else(Self::nan)
    }
}

impl<T: Float + FromPrimitive + Debug + Send + Sync + 'static> FloatScalar for T {}

use core::f64::consts::PI;

use crate::error::{check_len, FitError};

use super::Grid;

/// Uniform 3-D lattice integrated by a Riemann sum.
///
/// The lattice repeats the same one-dimensional axis
/// `smallest, smallest + step, …, largest` along x, y and z; points are
/// ordered with x varying slowest and z fastest. [`Grid::points`] returns
/// the distance of each lattice point from the origin, which is where a
/// radial density model is evaluated; unlike a radial grid these are not
/// sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicGrid {
    points: Vec<[f64; 3]>,
    radii: Vec<f64>,
    step: f64,
}

impl CubicGrid {
    /// Build the lattice. `step` must be positive and `largest > smallest`.
    pub fn new(smallest: f64, largest: f64, step: f64) -> Result<Self, FitError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(FitError::Validation(format!(
                "step should be a positive number, got {step}"
            )));
        }
        if !smallest.is_finite() || !largest.is_finite() || largest <= smallest {
            return Err(FitError::Validation(format!(
                "largest ({largest}) should be greater than smallest ({smallest})"
            )));
        }

        // tolerate round-off in (largest - smallest) / step
        let n = ((largest - smallest) / step + 1e-9).floor() as usize + 1;
        let axis: Vec<f64> = (0..n).map(|i| smallest + step * i as f64).collect();

        let mut points = Vec::with_capacity(n * n * n);
        for &x in &axis {
            for &y in &axis {
                for &z in &axis {
                    points.push([x, y, z]);
                }
            }
        }
        let radii = points
            .iter()
            .map(|p| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt())
            .collect();

        Ok(Self {
            points,
            radii,
            step,
        })
    }

    /// Cartesian coordinates of every lattice point.
    pub fn coordinates(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Spacing between neighbouring points on every axis.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Riemann sum of the elementwise product of several sampled arrays.
    ///
    /// ```
    /// use densfit::grid::CubicGrid;
    ///
    /// let g = CubicGrid::new(0.0, 1.0, 0.5).unwrap(); // 27 points
    /// let a = vec![2.0; 27];
    /// let b = vec![0.5; 27];
    /// assert!((g.integrate_product(&[&a, &b]).unwrap() - 27.0 * 0.125).abs() < 1e-12);
    /// ```
    pub fn integrate_product(&self, arrays: &[&[f64]]) -> Result<f64, FitError> {
        let n = self.points.len();
        let mut total = vec![1.0; n];
        for arr in arrays {
            check_len(arr, n)?;
            for (t, v) in total.iter_mut().zip(arr.iter()) {
                *t *= v;
            }
        }
        Ok(self.step.powi(3) * total.iter().sum::<f64>())
    }
}

impl Grid for CubicGrid {
    fn points(&self) -> &[f64] {
        &self.radii
    }

    fn integrate(&self, values: &[f64]) -> Result<f64, FitError> {
        self.integrate_product(&[values])
    }

    fn integrate_r2(&self, values: &[f64]) -> Result<f64, FitError> {
        // a 3-D integral of a radial function is 4π ∫ r² f dr
        Ok(self.integrate(values)? / (4.0 * PI))
    }
}

use core::f64::consts::PI;

use crate::error::{check_len, FitError};

use super::{trapz, Grid};

/// Sorted one-dimensional radial grid with a trapezoidal integration rule.
///
/// When `spherical` is set, [`Grid::integrate`] computes
/// `4π ∫ r² f(r) dr`, the integral of a spherically symmetric function over
/// all of space; otherwise it computes the plain `∫ f(r) dr`.
///
/// ```
/// use densfit::grid::{Grid, RadialGrid};
///
/// let g = RadialGrid::uniform(101, 0.0, 1.0, false).unwrap();
/// let ones = vec![1.0; g.len()];
/// assert!((g.integrate(&ones).unwrap() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadialGrid {
    points: Vec<f64>,
    spherical: bool,
}

impl RadialGrid {
    /// Grid over an explicit list of radii.
    ///
    /// The radii must be finite, non-negative, strictly increasing and at
    /// least two in number.
    pub fn new(points: Vec<f64>, spherical: bool) -> Result<Self, FitError> {
        if points.len() < 2 {
            return Err(FitError::Validation(format!(
                "a radial grid needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(bad) = points.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(FitError::Validation(format!(
                "radial points must be finite and non-negative, got {bad}"
            )));
        }
        if let Some(i) = points.windows(2).position(|w| w[1] <= w[0]) {
            return Err(FitError::Validation(format!(
                "radial points must be strictly increasing (index {} -> {})",
                i,
                i + 1
            )));
        }
        Ok(Self { points, spherical })
    }

    /// `num_pts` equally spaced radii covering `[min_radius, max_radius]`.
    pub fn uniform(
        num_pts: usize,
        min_radius: f64,
        max_radius: f64,
        spherical: bool,
    ) -> Result<Self, FitError> {
        if num_pts < 2 {
            return Err(FitError::Validation(format!(
                "num_pts should be at least 2, got {num_pts}"
            )));
        }
        if !min_radius.is_finite() || !max_radius.is_finite() || max_radius <= min_radius {
            return Err(FitError::Validation(format!(
                "max_radius ({max_radius}) should be greater than min_radius ({min_radius})"
            )));
        }
        let step = (max_radius - min_radius) / (num_pts - 1) as f64;
        let mut points: Vec<f64> = (0..num_pts).map(|i| min_radius + step * i as f64).collect();
        // land exactly on the upper end
        points[num_pts - 1] = max_radius;
        Self::new(points, spherical)
    }

    /// Clenshaw-Curtis style grid dense near the nucleus.
    ///
    /// Core points follow `(1 − cos(πp / 2N)) / 2Z` and diffuse points
    /// `25 (1 − cos(πp / 2N))` for `p = 0..N`. The origin appears in both
    /// sets and is kept once; `extra` radii (typically far from the nucleus)
    /// are appended before sorting.
    pub fn clenshaw(
        atomic_number: u32,
        num_core: usize,
        num_diffuse: usize,
        extra: &[f64],
        spherical: bool,
    ) -> Result<Self, FitError> {
        if atomic_number == 0 {
            return Err(FitError::Validation(
                "atomic_number should be a positive integer".into(),
            ));
        }
        let z = atomic_number as f64;
        let mut points = clenshaw_points(num_core, 0.5 / z);
        points.extend(clenshaw_points(num_diffuse, 25.0).into_iter().skip(1));
        points.extend_from_slice(extra);
        points.sort_by(f64::total_cmp);
        Self::new(points, spherical)
    }

    /// Whether integration applies the `4πr²` volume element.
    pub fn spherical(&self) -> bool {
        self.spherical
    }
}

fn clenshaw_points(num_pts: usize, scale: f64) -> Vec<f64> {
    (0..num_pts)
        .map(|p| scale * (1.0 - (0.5 * PI * p as f64 / num_pts as f64).cos()))
        .collect()
}

impl Grid for RadialGrid {
    fn points(&self) -> &[f64] {
        &self.points
    }

    fn integrate(&self, values: &[f64]) -> Result<f64, FitError> {
        check_len(values, self.points.len())?;
        if self.spherical {
            Ok(4.0 * PI * self.integrate_r2(values)?)
        } else {
            trapz(&self.points, values)
        }
    }

    fn integrate_r2(&self, values: &[f64]) -> Result<f64, FitError> {
        check_len(values, self.points.len())?;
        let weighted: Vec<f64> = self
            .points
            .iter()
            .zip(values)
            .map(|(r, v)| r * r * v)
            .collect();
        trapz(&self.points, &weighted)
    }
}

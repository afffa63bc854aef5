//! Clamp-then-fill policy for divisions and logarithms.
//!
//! Every place that divides by a model value or takes a logarithm of a
//! density goes through these helpers: a denominator at or below the floor
//! is not divided by, and the caller-chosen fill value is used instead.

/// Default floor for model values used as denominators.
pub const DEFAULT_MASK_VALUE: f64 = 1e-12;

/// `num / den`, or `fill` when `den <= floor`.
#[inline]
pub fn masked_div(num: f64, den: f64, floor: f64, fill: f64) -> f64 {
    if den <= floor {
        fill
    } else {
        num / den
    }
}

/// `ln(x)`, or `None` when `x <= floor`.
#[inline]
pub fn masked_ln(x: f64, floor: f64) -> Option<f64> {
    if x <= floor {
        None
    } else {
        Some(x.ln())
    }
}

/// Elementwise `num / den` with ratio `1` wherever `den <= floor`.
///
/// A ratio of one makes `ln(ratio)` vanish, so masked points add nothing to
/// a log-ratio integrand.
pub fn masked_ratio(num: &[f64], den: &[f64], floor: f64) -> Vec<f64> {
    num.iter()
        .zip(den)
        .map(|(&n, &d)| masked_div(n, d, floor, 1.0))
        .collect()
}

/// `true` if every element is finite.
#[inline]
pub fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_div_fills_below_floor() {
        assert_eq!(masked_div(2.0, 4.0, 1e-12, 1.0), 0.5);
        assert_eq!(masked_div(2.0, 1e-13, 1e-12, 1.0), 1.0);
        assert_eq!(masked_div(2.0, 1e-12, 1e-12, 7.0), 7.0);
        assert_eq!(masked_div(2.0, -3.0, 1e-12, 0.0), 0.0);
    }

    #[test]
    fn masked_ratio_log_is_zero_on_masked_points() {
        let r = masked_ratio(&[1.0, 3.0, 5.0], &[2.0, 0.0, 1e-20], DEFAULT_MASK_VALUE);
        assert_eq!(r, vec![0.5, 1.0, 1.0]);
        assert_eq!(r[1].ln(), 0.0);
    }

    #[test]
    fn masked_ln_rejects_non_positive() {
        assert_eq!(masked_ln(0.0, 0.0), None);
        assert_eq!(masked_ln(-1.0, 0.0), None);
        assert!((masked_ln(core::f64::consts::E, 0.0).unwrap() - 1.0).abs() < 1e-15);
    }
}

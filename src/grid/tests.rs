use super::*;
use crate::error::FitError;

use approx::assert_relative_eq;

fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
    assert!(
        (a - b).abs() < tol,
        "{}: {} vs {} (diff {})",
        msg,
        a,
        b,
        (a - b).abs()
    );
}

// ── Radial grids ─────────────────────────────────────────────────────

#[test]
fn uniform_constant_integrates_to_length() {
    for &(n, a, b) in &[(2usize, 0.0, 1.0), (50, 0.0, 10.0), (333, 1.5, 7.25)] {
        let g = RadialGrid::uniform(n, a, b, false).unwrap();
        let c = 3.5;
        let vals = vec![c; g.len()];
        assert_near(g.integrate(&vals).unwrap(), c * (b - a), 1e-10, "constant integral");
    }
}

#[test]
fn uniform_endpoints_and_spacing() {
    let g = RadialGrid::uniform(50, 0.0, 10.0, true).unwrap();
    let p = g.points();
    assert_eq!(p.len(), 50);
    assert_eq!(p[0], 0.0);
    assert_eq!(p[49], 10.0);
    assert_near(p[1] - p[0], 10.0 / 49.0, 1e-14, "spacing");
    assert!(g.spherical());
}

#[test]
fn spherical_integral_of_normalized_gaussian() {
    // (a/π)^{3/2} exp(-a r²) integrates to 1 over all space
    let a: f64 = 1.3;
    let g = RadialGrid::uniform(4000, 0.0, 12.0, true).unwrap();
    let norm = (a / core::f64::consts::PI).powf(1.5);
    let vals: Vec<f64> = g.points().iter().map(|r| norm * (-a * r * r).exp()).collect();
    assert_relative_eq!(g.integrate(&vals).unwrap(), 1.0, max_relative = 1e-5);
}

#[test]
fn integrate_shape_mismatch() {
    let g = RadialGrid::uniform(10, 0.0, 1.0, false).unwrap();
    assert_eq!(
        g.integrate(&[1.0; 9]).unwrap_err(),
        FitError::ShapeMismatch { expected: 10, got: 9 }
    );
    assert!(g.integrate_r2(&[1.0; 11]).is_err());
}

#[test]
fn radial_validation() {
    assert!(matches!(RadialGrid::uniform(1, 0.0, 1.0, false), Err(FitError::Validation(_))));
    assert!(matches!(RadialGrid::uniform(10, 1.0, 1.0, false), Err(FitError::Validation(_))));
    assert!(matches!(RadialGrid::uniform(10, 2.0, 1.0, false), Err(FitError::Validation(_))));
    assert!(matches!(RadialGrid::new(vec![0.0, 2.0, 1.0], false), Err(FitError::Validation(_))));
    assert!(matches!(RadialGrid::new(vec![0.0, 1.0, 1.0], false), Err(FitError::Validation(_))));
    assert!(matches!(RadialGrid::new(vec![-1.0, 1.0], false), Err(FitError::Validation(_))));
    assert!(matches!(RadialGrid::new(vec![0.0, f64::NAN], false), Err(FitError::Validation(_))));
}

#[test]
fn clenshaw_points() {
    let g = RadialGrid::clenshaw(4, 10, 20, &[50.0, 75.0], true).unwrap();
    // origin once, 9 more core points, 19 more diffuse points, 2 extra
    assert_eq!(g.len(), 10 + 19 + 2);
    assert_eq!(g.points()[0], 0.0);
    assert_eq!(*g.points().last().unwrap(), 75.0);
    // the first core point after the origin
    let expected = (1.0 - (0.5 * core::f64::consts::PI / 10.0).cos()) / 8.0;
    assert_near(g.points()[1], expected, 1e-15, "first core point");
    assert!(g.points().windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn clenshaw_validation() {
    assert!(RadialGrid::clenshaw(0, 10, 10, &[], true).is_err());
    // only the origin survives
    assert!(RadialGrid::clenshaw(1, 1, 1, &[], true).is_err());
    // duplicate extra point
    assert!(RadialGrid::clenshaw(1, 5, 5, &[30.0, 30.0], true).is_err());
}

#[test]
fn trapz_linear_is_exact() {
    let x = [0.0, 0.1, 0.4, 1.0];
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    assert_near(trapz(&x, &y).unwrap(), 2.0, 1e-15, "linear trapz");
}

// ── Cubic grids ──────────────────────────────────────────────────────

#[test]
fn cubic_lattice_layout() {
    let g = CubicGrid::new(-1.0, 1.0, 0.5).unwrap();
    assert_eq!(g.len(), 125);
    let c = g.coordinates();
    assert_eq!(c[0], [-1.0, -1.0, -1.0]);
    assert_eq!(c[1], [-1.0, -1.0, -0.5]);
    assert_eq!(c[5], [-1.0, -0.5, -1.0]);
    assert_eq!(c[124], [1.0, 1.0, 1.0]);
    assert_near(g.points()[62], 0.0, 1e-15, "centre radius");
    assert_eq!(g.step(), 0.5);
}

#[test]
fn cubic_riemann_sum() {
    let g = CubicGrid::new(0.0, 0.9, 0.1).unwrap();
    assert_eq!(g.len(), 1000);
    let vals = vec![1.0; g.len()];
    assert_near(g.integrate(&vals).unwrap(), 1.0, 1e-12, "unit cube volume");
}

#[test]
fn cubic_gaussian_volume() {
    // ∫ exp(-r²) d³r = π^{3/2}
    let g = CubicGrid::new(-6.0, 6.0, 0.2).unwrap();
    let vals: Vec<f64> = g.points().iter().map(|r| (-r * r).exp()).collect();
    assert_relative_eq!(
        g.integrate(&vals).unwrap(),
        core::f64::consts::PI.powf(1.5),
        max_relative = 1e-6
    );
    assert_relative_eq!(
        g.integrate_r2(&vals).unwrap(),
        core::f64::consts::PI.sqrt() / 4.0,
        max_relative = 1e-6
    );
}

#[test]
fn cubic_validation() {
    assert!(CubicGrid::new(0.0, 1.0, 0.0).is_err());
    assert!(CubicGrid::new(0.0, 1.0, -0.1).is_err());
    assert!(CubicGrid::new(1.0, 1.0, 0.1).is_err());
    let g = CubicGrid::new(0.0, 1.0, 0.5).unwrap();
    assert!(g.integrate_product(&[&[1.0; 27], &[1.0; 26]]).is_err());
}

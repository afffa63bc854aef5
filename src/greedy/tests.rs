use std::time::{Duration, Instant};

use super::refine::perturb;
use super::seed::{analytic_seed, log_linear_fit, table_exponents, Weighting};
use super::split::{candidates, largest_residual, split_at};
use super::*;
use crate::grid::{Grid, RadialGrid};
use crate::model::{CostKind, GaussianDensity};
use crate::optim::OptimError;

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

fn density_model(
    num_pts: usize,
    max_radius: f64,
    terms: &[(f64, f64)],
) -> GaussianDensity<RadialGrid> {
    let grid = RadialGrid::uniform(num_pts, 0.0, max_radius, false).unwrap();
    let density = grid
        .points()
        .iter()
        .map(|r| terms.iter().map(|(c, a)| c * (-a * r * r).exp()).sum())
        .collect();
    GaussianDensity::new(grid, density).unwrap()
}

fn settings_with_max(max_functions: usize) -> GreedySettings {
    let mut settings = GreedySettings::default();
    settings.stop.max_functions = max_functions;
    settings
}

// ═══════════════════════════════════════════════════════════════
// Seed
// ═══════════════════════════════════════════════════════════════

#[test]
fn log_linear_fit_exact_for_every_weighting() {
    let model = density_model(40, 3.0, &[(3.0, 0.7)]);
    let samples = model.linearize();
    for weighting in Weighting::ALL {
        let (alpha, a) = log_linear_fit(&samples, model.density(), weighting).unwrap();
        assert_near(alpha, 3.0_f64.ln(), 1e-10, &format!("{weighting:?} ln c"));
        assert_near(a, 0.7, 1e-10, &format!("{weighting:?} exponent"));
    }
}

#[test]
fn log_linear_fit_rejects_single_point() {
    let samples = vec![(0, 1.0, 0.5)];
    let err = log_linear_fit(&samples, &[1.0], Weighting::Uniform).unwrap_err();
    assert!(matches!(err, FitError::NumericalSingularity(_)));
}

#[test]
fn analytic_seed_recovers_single_gaussian() {
    let model = density_model(50, 10.0, &[(2.0, 1.5)]);
    let seed = analytic_seed(&model).unwrap();
    assert_near(seed.params[0], 2.0, 1e-6 * 2.0, "coefficient");
    assert_near(seed.params[1], 1.5, 1e-6 * 1.5, "exponent");
    assert!(seed.cost < 1e-12);
}

#[test]
fn analytic_seed_keeps_cheapest_weighting() {
    let model = density_model(100, 5.0, &[(1.0, 1.0), (1.0, 4.0)]);
    let seed = analytic_seed(&model).unwrap();
    let samples = model.linearize();
    for weighting in Weighting::ALL {
        let (alpha, a) = log_linear_fit(&samples, model.density(), weighting).unwrap();
        let cost = model.cost_function(&[alpha.exp(), a]).unwrap();
        assert!(seed.cost <= cost, "{weighting:?}: {} > {}", seed.cost, cost);
    }
}

#[test]
fn constant_density_is_singular() {
    let grid = RadialGrid::uniform(20, 0.0, 2.0, false).unwrap();
    let model = GaussianDensity::new(grid, vec![1.0; 20]).unwrap();
    assert!(matches!(
        analytic_seed(&model),
        Err(FitError::NumericalSingularity(_))
    ));
    let strategy = GreedyStrategy::new(model, GreedySettings::default()).unwrap();
    assert!(matches!(
        strategy.fit(),
        Err(FitError::NumericalSingularity(_))
    ));
}

#[test]
fn table_exponents_scale_each_entry() {
    let mut settings = GreedySettings::default();
    settings.exponent_table = vec![1.0, 10.0];
    let seeds = table_exponents(&settings);
    assert_eq!(
        seeds,
        vec![
            vec![1.25],
            vec![1.5],
            vec![1.75],
            vec![12.5],
            vec![15.0],
            vec![17.5]
        ]
    );
}

#[test]
fn table_seeds_never_worsen_best_one_function() {
    let model = density_model(120, 6.0, &[(1.0, 0.5), (2.0, 6.0)]);
    let plain = GreedyStrategy::new(model.clone(), GreedySettings::default()).unwrap();
    let (_, plain_cost) = plain.best_one_function().unwrap();

    let mut settings = GreedySettings::default();
    settings.exponent_table = vec![0.3, 2.0, 8.0];
    let tabled = GreedyStrategy::new(model, settings).unwrap();
    let (params, cost) = tabled.best_one_function().unwrap();
    assert_eq!(params.num_functions(), 1);
    assert!(cost <= plain_cost + 1e-15, "{cost} > {plain_cost}");
}

// ═══════════════════════════════════════════════════════════════
// Refine
// ═══════════════════════════════════════════════════════════════

#[test]
fn refine_never_increases_cost() {
    let model = density_model(100, 5.0, &[(1.0, 1.0), (1.0, 4.0)]);
    let strategy = GreedyStrategy::new(model, GreedySettings::default()).unwrap();
    let start = Params::new(vec![0.5, 0.5, 0.8, 5.0]).unwrap();
    let start_cost = strategy.model().cost_function(start.as_slice()).unwrap();
    let (refined, cost) = strategy.refine(&start).unwrap();
    assert!(cost <= start_cost);
    assert!(refined.coefficients().iter().all(|&c| c >= 0.0));
    assert!(refined.exponents().iter().all(|&a| a > 0.0));
    assert!(cost < 1e-10, "cost {cost}");
}

#[test]
fn perturb_alternates_sign() {
    let p = perturb(&[1.0, 2.0, 4.0], 0.1);
    assert_near(p[0], 1.1, 1e-15, "k = 0");
    assert_near(p[1], 1.8, 1e-15, "k = 1");
    assert_near(p[2], 4.4, 1e-15, "k = 2");
}

#[test]
fn solver_failure_surfaces_after_retry() {
    let model = density_model(50, 5.0, &[(1.0, 1.0), (1.0, 4.0)]);
    let mut settings = GreedySettings::default();
    settings.minimizer.max_iter = 0;
    let strategy = GreedyStrategy::new(model, settings).unwrap();
    match strategy.fit() {
        Err(FitError::ConvergenceFailure {
            stage,
            params,
            cost,
            source,
        }) => {
            assert_eq!(stage, "minimize");
            assert_eq!(source, OptimError::MaxIterations);
            assert_eq!(params.len(), 2);
            assert!(params.iter().all(|v| v.is_finite()));
            assert!(cost.is_finite());
        }
        other => panic!("expected a convergence failure, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════
// Grow
// ═══════════════════════════════════════════════════════════════

#[test]
fn split_at_replaces_one_exponent() {
    assert_eq!(split_at(&[1.0, 4.0, 16.0], 1, 2.0), vec![1.0, 2.0, 8.0, 16.0]);
    assert_eq!(split_at(&[3.0], 0, 3.0), vec![1.0, 9.0]);
}

#[test]
fn all_policy_adds_bracket_candidates() {
    let model = density_model(50, 5.0, &[(1.0, 1.0)]);
    let mut settings = GreedySettings::default();
    settings.split_policy = SplitPolicy::All;
    let params = Params::new(vec![1.0, 1.0, 1.0, 4.0]).unwrap();
    let out = candidates(&model, &settings, &params).unwrap();
    assert_eq!(
        out,
        vec![
            vec![0.5, 2.0, 4.0],
            vec![1.0, 2.0, 8.0],
            vec![1.0, 4.0, 0.5],
            vec![1.0, 4.0, 8.0],
        ]
    );
    assert!(out.iter().all(|c| c.len() == 3));
}

#[test]
fn largest_residual_picks_the_poorly_fitted_function() {
    // the tight function underestimates a sharp core peak
    let model = density_model(200, 5.0, &[(0.1, 0.2), (5.0, 8.0)]);
    let params = Params::new(vec![0.1, 3.0, 0.2, 3.0]).unwrap();
    assert_eq!(largest_residual(&model, &params).unwrap(), 1);

    let settings = GreedySettings::default();
    let out = candidates(&model, &settings, &params).unwrap();
    assert_eq!(out, vec![vec![0.2, 1.5, 6.0]]);
}

// ═══════════════════════════════════════════════════════════════
// Loop and termination
// ═══════════════════════════════════════════════════════════════

#[test]
fn max_functions_one_returns_seed() {
    let model = density_model(50, 10.0, &[(2.0, 1.5)]);
    let report = GreedyStrategy::new(model, settings_with_max(1))
        .unwrap()
        .fit()
        .unwrap();
    assert_eq!(report.termination, Termination::MaxFunctions);
    assert_eq!(report.num_functions(), 1);
    assert_eq!(report.history.len(), 1);
    assert!(report.cost < 1e-8);
}

#[test]
fn cost_is_monotone_over_iterations() {
    let terms = [(0.5, 0.3), (1.2, 2.0), (3.0, 12.0)];
    let model = density_model(300, 8.0, &terms);
    let mut settings = settings_with_max(3);
    settings.split_policy = SplitPolicy::All;
    let report = GreedyStrategy::new(model, settings).unwrap().fit().unwrap();

    for pair in report.history.windows(2) {
        assert!(
            pair[1].cost <= pair[0].cost,
            "K = {}: {} > {}",
            pair[1].num_functions,
            pair[1].cost,
            pair[0].cost
        );
        assert_eq!(pair[1].num_functions, pair[0].num_functions + 1);
    }
    assert_eq!(report.cost, report.history.last().unwrap().cost);
    assert!(report.params.as_slice().iter().all(|v| v.is_finite()));
}

#[test]
fn error_tolerance_stops_early() {
    let model = density_model(50, 10.0, &[(2.0, 1.5)]);
    let mut settings = settings_with_max(5);
    settings.stop.error_tolerance = Some(1e-8);
    let report = GreedyStrategy::new(model, settings).unwrap().fit().unwrap();
    assert_eq!(report.termination, Termination::ErrorTolerance);
    assert_eq!(report.num_functions(), 1);
    assert!(report.integrated_error <= 1e-8);
}

#[test]
fn stagnation_keeps_previous_state() {
    let model = density_model(100, 5.0, &[(1.0, 1.0), (1.0, 4.0)]);
    let mut settings = settings_with_max(5);
    settings.stop.min_improvement = 1e9;
    let report = GreedyStrategy::new(model, settings).unwrap().fit().unwrap();
    assert_eq!(report.termination, Termination::Stagnated);
    assert_eq!(report.num_functions(), 1);
    assert_eq!(report.history.len(), 1);
    assert_eq!(report.params, report.history[0].params);
}

#[test]
fn predicate_stops_the_loop() {
    let model = density_model(150, 6.0, &[(0.5, 0.3), (1.2, 2.0), (3.0, 12.0)]);
    let strategy = GreedyStrategy::new(model, settings_with_max(6)).unwrap();
    let mut seen = Vec::new();
    let report = strategy
        .fit_until(|record| {
            seen.push(record.num_functions);
            record.num_functions >= 2
        })
        .unwrap();
    assert_eq!(report.termination, Termination::Predicate);
    assert_eq!(report.num_functions(), 2);
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn zero_time_budget_stops_after_seed() {
    let model = density_model(100, 5.0, &[(1.0, 1.0), (1.0, 4.0)]);
    let mut settings = settings_with_max(5);
    settings.stop.time_budget = Some(Duration::ZERO);
    let report = GreedyStrategy::new(model, settings).unwrap().fit().unwrap();
    assert_eq!(report.termination, Termination::TimeBudget);
    assert_eq!(report.num_functions(), 1);
}

#[test]
fn kl_cost_recovers_single_gaussian() {
    let model = density_model(200, 8.0, &[(2.0, 1.5)])
        .with_cost(CostKind::KlDivergence)
        .unwrap();
    let report = GreedyStrategy::new(model, settings_with_max(1))
        .unwrap()
        .fit()
        .unwrap();
    assert_near(report.params.coefficients()[0], 2.0, 1e-5, "coefficient");
    assert_near(report.params.exponents()[0], 1.5, 1e-5, "exponent");
}

#[test]
fn kl_error_tolerance_rejects_heavy_model() {
    let model = density_model(200, 6.0, &[(1.0, 1.0)])
        .with_cost(CostKind::KlDivergence)
        .unwrap();
    let mut settings = settings_with_max(5);
    settings.stop.error_tolerance = Some(0.1);
    let strategy = GreedyStrategy::new(model, settings).unwrap();
    let started = Instant::now();

    for params in [vec![3.0, 1.0], vec![0.0, 1.0]] {
        let cost = strategy.model().cost_function(&params).unwrap();
        let record = strategy.record(&Fitted { params, cost }, 1, started).unwrap();
        assert!(record.integrated_error > 0.1, "{record:?}");
        assert_eq!(strategy.check_stop(&record, started), None);
    }

    let report = strategy.fit().unwrap();
    assert_eq!(report.termination, Termination::ErrorTolerance);
    assert_near(report.params.exponents()[0], 1.0, 1e-4, "exponent");
}

#[test]
fn history_reports_diagnostics() {
    let model = density_model(200, 6.0, &[(1.0, 1.0), (1.0, 4.0)]);
    let report = GreedyStrategy::new(model, settings_with_max(2))
        .unwrap()
        .fit()
        .unwrap();
    assert_eq!(report.history.len(), 2);
    let first = &report.history[0];
    let last = &report.history[1];
    assert_eq!(first.candidates, 1);
    assert!(last.diagnostics.integration_error < first.diagnostics.integration_error + 1e-12);
    assert!(last.diagnostics.diffuse_error < 1e-4);
}

// ═══════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════

#[test]
fn settings_validation() {
    let model = density_model(10, 2.0, &[(1.0, 1.0)]);
    let bad = [
        GreedySettings {
            factor: 1.0,
            ..GreedySettings::default()
        },
        GreedySettings {
            min_exponent: 0.0,
            ..GreedySettings::default()
        },
        GreedySettings {
            retry_perturbation: 1.0,
            ..GreedySettings::default()
        },
        GreedySettings {
            exponent_table: vec![-1.0],
            ..GreedySettings::default()
        },
        settings_with_max(0),
    ];
    for settings in bad {
        assert!(matches!(
            GreedyStrategy::new(model.clone(), settings),
            Err(FitError::Validation(_))
        ));
    }
}

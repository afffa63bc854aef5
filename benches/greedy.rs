use criterion::{criterion_group, criterion_main, Criterion};
use densfit::linalg::DynMatrix;
use densfit::optim::{nnls, NnlsSettings};
use densfit::{BasisModel, GaussianDensity, GreedySettings, GreedyStrategy, Grid, RadialGrid};

// ---------------------------------------------------------------------------
// Helpers: target densities built from known Gaussian sums
// ---------------------------------------------------------------------------

fn two_gaussian_model(num_pts: usize) -> GaussianDensity<RadialGrid> {
    let grid = RadialGrid::uniform(num_pts, 0.0, 6.0, false).unwrap();
    let density = grid
        .points()
        .iter()
        .map(|r| (-r * r).exp() + (-4.0 * r * r).exp())
        .collect();
    GaussianDensity::new(grid, density).unwrap()
}

fn even_tempered(k: usize) -> Vec<f64> {
    (0..k).map(|i| 0.1 * 2.5_f64.powi(i as i32)).collect()
}

// ---------------------------------------------------------------------------
// NNLS on a Gaussian design matrix
// ---------------------------------------------------------------------------

fn nnls_design(c: &mut Criterion) {
    let mut g = c.benchmark_group("nnls_design");

    for k in [4, 6, 8] {
        let model = two_gaussian_model(400);
        let a: DynMatrix<f64> = model.create_cofactor_matrix(&even_tempered(k)).unwrap();
        let b = model.density().to_vec();
        g.bench_function(format!("400x{k}"), |bench| {
            bench.iter(|| {
                nnls(
                    std::hint::black_box(&a),
                    std::hint::black_box(&b),
                    &NnlsSettings::default(),
                )
                .unwrap()
            })
        });
    }

    g.finish();
}

// ---------------------------------------------------------------------------
// Cost and gradient evaluation
// ---------------------------------------------------------------------------

fn cost_gradient(c: &mut Criterion) {
    let mut g = c.benchmark_group("cost_gradient");
    let model = two_gaussian_model(400);
    let mut params = vec![0.3; 6];
    params.extend(even_tempered(6));

    g.bench_function("cost_k6", |b| {
        b.iter(|| model.cost_function(std::hint::black_box(&params)).unwrap())
    });
    g.bench_function("gradient_k6", |b| {
        b.iter(|| model.cost_gradient(std::hint::black_box(&params)).unwrap())
    });

    g.finish();
}

// ---------------------------------------------------------------------------
// Full greedy fit
// ---------------------------------------------------------------------------

fn greedy_fit(c: &mut Criterion) {
    let mut g = c.benchmark_group("greedy_fit");
    g.sample_size(20);

    g.bench_function("two_gaussians_k2", |b| {
        let mut settings = GreedySettings::default();
        settings.stop.max_functions = 2;
        let strategy = GreedyStrategy::new(two_gaussian_model(200), settings).unwrap();
        b.iter(|| strategy.fit().unwrap())
    });

    g.finish();
}

criterion_group!(benches, nnls_design, cost_gradient, greedy_fit);
criterion_main!(benches);

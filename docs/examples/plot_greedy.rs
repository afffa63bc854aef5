// Greedy fit of a three-term density on a Clenshaw-Curtis grid.
// Prints JSON with the target, the model after each accepted iteration and
// the cost trajectory:
//   {"r":[...], "target":[...], "models":[[...], ...],
//    "k":[...], "cost":[...], "diffuse":[...], "integration":[...]}

use densfit::{BasisModel, GaussianDensity, GreedySettings, GreedyStrategy, Grid, RadialGrid};

fn fmt_arr(v: &[f64]) -> String {
    let inner: Vec<String> = v.iter().map(|x| format!("{x:.6e}")).collect();
    format!("[{}]", inner.join(","))
}

fn main() {
    let grid = RadialGrid::clenshaw(3, 80, 80, &[], true).unwrap();
    let target: Vec<f64> = grid
        .points()
        .iter()
        .map(|r| {
            let r2 = r * r;
            0.05 * (-0.2 * r2).exp() + 0.8 * (-2.5 * r2).exp() + 12.0 * (-30.0 * r2).exp()
        })
        .collect();
    let model = GaussianDensity::new(grid.clone(), target.clone()).unwrap();

    let mut settings = GreedySettings::default();
    settings.stop.max_functions = 5;
    let strategy = GreedyStrategy::new(model, settings).unwrap();
    let report = strategy.fit().unwrap();

    let models: Vec<String> = report
        .history
        .iter()
        .map(|record| fmt_arr(&strategy.model().create_model(record.params.as_slice()).unwrap()))
        .collect();
    let k: Vec<f64> = report.history.iter().map(|r| r.num_functions as f64).collect();
    let cost: Vec<f64> = report.history.iter().map(|r| r.cost).collect();
    let diffuse: Vec<f64> = report
        .history
        .iter()
        .map(|r| r.diagnostics.diffuse_error)
        .collect();
    let integration: Vec<f64> = report
        .history
        .iter()
        .map(|r| r.diagnostics.integration_error)
        .collect();

    println!(
        "{{\"r\":{},\"target\":{},\"models\":[{}],\"k\":{},\"cost\":{},\"diffuse\":{},\"integration\":{}}}",
        fmt_arr(grid.points()),
        fmt_arr(&target),
        models.join(","),
        fmt_arr(&k),
        fmt_arr(&cost),
        fmt_arr(&diffuse),
        fmt_arr(&integration)
    );
}

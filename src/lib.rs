//! # densfit
//!
//! Greedy fitting of non-negative radial Gaussian basis sets to a sampled
//! radial density. The model `Σ c_k exp(−a_k r²)` grows one function at a
//! time: every round splits an exponent into two candidates, re-optimizes
//! all coefficients and exponents, and keeps the cheapest candidate.
//!
//! ## Quick start
//!
//! ```
//! use densfit::{GaussianDensity, GreedySettings, GreedyStrategy, Grid, RadialGrid};
//!
//! let grid = RadialGrid::uniform(200, 0.0, 5.0, false).unwrap();
//! let density = grid
//!     .points()
//!     .iter()
//!     .map(|r| (-r * r).exp() + (-4.0 * r * r).exp())
//!     .collect();
//! let model = GaussianDensity::new(grid, density).unwrap();
//!
//! let mut settings = GreedySettings::default();
//! settings.stop.max_functions = 2;
//! let report = GreedyStrategy::new(model, settings).unwrap().fit().unwrap();
//! assert_eq!(report.num_functions(), 2);
//! assert!(report.cost < 1e-10);
//! ```
//!
//! ## Modules
//!
//! - [`grid`] — [`Grid`] trait; [`RadialGrid`] (uniform, Clenshaw-Curtis or
//!   explicit radii, trapezoidal rule with optional `4πr²` weight) and
//!   [`CubicGrid`] (3-D lattice, Riemann sum).
//!
//! - [`measure`] — pointwise discrepancies with analytic derivatives:
//!   [`SquaredDifference`](measure::SquaredDifference) and
//!   [`KlDivergence`](measure::KlDivergence).
//!
//! - [`model`] — the [`BasisModel`] capability trait and the
//!   [`GaussianDensity`] family (s/p/d shells, optional normalization,
//!   least-squares or KL cost).
//!
//! - [`greedy`] — [`GreedyStrategy`]: seed, refine, grow, select, terminate.
//!
//! - [`optim`] — Lawson–Hanson [`nnls`](optim::nnls) and projected BFGS
//!   [`minimize_bounded`](optim::minimize_bounded).
//!
//! - [`linalg`] — column-major [`DynMatrix`](linalg::DynMatrix), Householder
//!   least squares, 2×2 solve.
//!
//! - [`numeric`] — the clamp-then-fill policy for divisions and logarithms.
//!
//! ## Logging
//!
//! Progress goes through the [`log`] facade: `info!` per accepted
//! iteration, `debug!` per candidate, `warn!` on retries and skipped seed
//! weightings. Install any logger to see it.
//!
//! ## Cargo features
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `serde`    | no      | `Serialize`/`Deserialize` on settings, parameters and reports |
//! | `parallel` | no      | Refine split candidates on the `rayon` thread pool |

pub mod error;
pub mod greedy;
pub mod grid;
pub mod linalg;
pub mod measure;
pub mod model;
pub mod numeric;
pub mod optim;
mod params;
pub mod traits;

pub use error::FitError;
pub use greedy::{
    FitReport, GreedySettings, GreedyStrategy, IterationRecord, SplitPolicy, StopCriteria,
    Termination,
};
pub use grid::{CubicGrid, Grid, RadialGrid};
pub use model::{BasisModel, CostKind, Diagnostics, GaussianDensity, Shell};
pub use params::Params;
pub use traits::FloatScalar;

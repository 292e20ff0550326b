use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::filter::FilteredView;
use super::model::{AUDIO_FEATURES, POPULARITY};
use crate::config::ModelConfig;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Test-partition quality of one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub mse: f64,
    pub r2: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Result of one modeling run. Too few rows is an expected condition for
/// narrow filters, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    Fitted(ModelMetrics),
    InsufficientData { rows: usize, required: usize },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Fit popularity on the audio features and score it on a held-out split.
///
/// The view must hold more than `config.min_rows` rows. The split is driven
/// by `config.seed`, so identical input always yields identical metrics.
pub fn evaluate_model(view: &FilteredView<'_>, config: &ModelConfig) -> Result<ModelOutcome> {
    let n = view.len();
    if n <= config.min_rows {
        warn!(
            "Not enough data to train a model: {n} rows, need more than {}",
            config.min_rows
        );
        return Ok(ModelOutcome::InsufficientData {
            rows: n,
            required: config.min_rows + 1,
        });
    }

    let features = AUDIO_FEATURES
        .iter()
        .map(|name| view.numeric(name))
        .collect::<Result<Vec<_>>>()?;
    let target = view.numeric(POPULARITY)?;

    let (train, test) = split_indices(n, config.test_fraction, config.seed);
    let model = LinearModel::fit(&features, &target, &train);

    let actual: Vec<f64> = test.iter().map(|&i| target[i]).collect();
    let predicted: Vec<f64> = test.iter().map(|&i| model.predict(&features, i)).collect();

    let metrics = ModelMetrics {
        mse: mean_squared_error(&actual, &predicted),
        r2: r2_score(&actual, &predicted),
        train_rows: train.len(),
        test_rows: test.len(),
    };
    debug!(
        "Model fitted on {} rows: mse={:.3} r2={:.3}",
        metrics.train_rows, metrics.mse, metrics.r2
    );
    Ok(ModelOutcome::Fitted(metrics))
}

/// Shuffle `0..n` with a seeded RNG and cut it into (train, test).
///
/// The test partition takes the first `ceil(test_fraction * n)` shuffled
/// positions, bounded so both partitions are non-empty when `n >= 2`.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n.saturating_sub(1).max(1));
    let train = order.split_off(n_test.min(n));
    (train, order)
}

// ---------------------------------------------------------------------------
// Ordinary least squares
// ---------------------------------------------------------------------------

/// `y ≈ intercept + Σ coefficients[j] · x_j`. Lives only for one
/// evaluation; coefficients are not reported.
#[derive(Debug, Clone)]
struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearModel {
    /// Least-squares fit over `rows` of the given feature columns.
    ///
    /// Solves the centered normal equations with a Cholesky factorisation.
    /// A feature that is (numerically) a linear combination of the features
    /// before it is left out and gets a zero coefficient.
    fn fit(features: &[Vec<f64>], target: &[f64], rows: &[usize]) -> Self {
        let p = features.len();
        let n = rows.len().max(1) as f64;

        let x_mean: Vec<f64> = features
            .iter()
            .map(|col| rows.iter().map(|&i| col[i]).sum::<f64>() / n)
            .collect();
        let y_mean = rows.iter().map(|&i| target[i]).sum::<f64>() / n;

        // Gram matrix and right-hand side of the centered system.
        let mut gram = vec![vec![0.0; p]; p];
        let mut rhs = vec![0.0; p];
        for &i in rows {
            let xc: Vec<f64> = (0..p).map(|j| features[j][i] - x_mean[j]).collect();
            let yc = target[i] - y_mean;
            for a in 0..p {
                rhs[a] += xc[a] * yc;
                for b in a..p {
                    gram[a][b] += xc[a] * xc[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                gram[a][b] = gram[b][a];
            }
        }

        let mut coefficients = vec![0.0; p];
        let (kept, chol) = cholesky_skipping_dependent(&gram);
        let b: Vec<f64> = kept.iter().map(|&j| rhs[j]).collect();
        for (slot, value) in kept.iter().zip(cholesky_solve(&chol, &b)) {
            coefficients[*slot] = value;
        }

        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(c, m)| c * m)
                .sum::<f64>();
        LinearModel {
            intercept,
            coefficients,
        }
    }

    fn predict(&self, features: &[Vec<f64>], row: usize) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, col)| c * col[row])
                .sum::<f64>()
    }
}

/// Relative size below which a pivot counts as zero.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Incremental Cholesky of the symmetric PSD matrix `a`, adding columns in
/// order and skipping any whose remaining pivot is negligible. Returns the
/// kept column indices and the lower-triangular factor over them.
fn cholesky_skipping_dependent(a: &[Vec<f64>]) -> (Vec<usize>, Vec<Vec<f64>>) {
    let mut kept: Vec<usize> = Vec::new();
    let mut l: Vec<Vec<f64>> = Vec::new();

    for j in 0..a.len() {
        let diag = a[j][j];
        if !(diag.is_finite() && diag > 0.0) {
            continue;
        }
        // Forward-substitute L · v = a[kept, j].
        let mut v: Vec<f64> = Vec::with_capacity(kept.len() + 1);
        for (r, &k) in kept.iter().enumerate() {
            let s: f64 = (0..r).map(|c| l[r][c] * v[c]).sum();
            v.push((a[k][j] - s) / l[r][r]);
        }
        let d = diag - v.iter().map(|x| x * x).sum::<f64>();
        if d <= PIVOT_TOLERANCE * diag {
            continue;
        }
        v.push(d.sqrt());
        kept.push(j);
        l.push(v);
    }
    (kept, l)
}

/// Solve `L · Lᵀ · x = b` for a lower-triangular `l` stored row by row.
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let m = l.len();
    let mut z = vec![0.0; m];
    for r in 0..m {
        let s: f64 = (0..r).map(|c| l[r][c] * z[c]).sum();
        z[r] = (b[r] - s) / l[r][r];
    }
    let mut x = vec![0.0; m];
    for r in (0..m).rev() {
        let s: f64 = ((r + 1)..m).map(|c| l[c][r] * x[c]).sum();
        x[r] = (z[r] - s) / l[r][r];
    }
    x
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Average squared residual.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Coefficient of determination, `1 - SS_res / SS_tot`. Negative when the
/// model does worse than predicting the mean. A constant target scores 1.0
/// if predicted exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

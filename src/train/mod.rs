//! Elastic-net regression trainer.
//!
//! Coordinate descent over standardized features, written as plain
//! numeric kernels over `&[f64]` slices. Everything is deterministic:
//! the only randomness is the seeded train/test split, so a fixed
//! `TrainConfig` always reproduces the same model and metrics.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::{Error, Result};

/// Fraction of rows held out for evaluation by [`train_and_evaluate`].
pub const DEFAULT_TEST_FRACTION: f64 = 0.25;

/// Elastic-net hyperparameters.
///
/// `alpha` is the overall regularization strength, `l1_ratio` the mix
/// between lasso (`1.0`) and ridge (`0.0`) penalties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Regularization strength (>= 0)
    pub alpha: f64,
    /// L1/L2 mix in `[0, 1]`
    pub l1_ratio: f64,
    /// Coordinate descent iteration cap
    pub max_iter: usize,
    /// Convergence threshold on the max coefficient update
    pub tol: f64,
    /// Seed for the train/test split
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
            seed: 42,
        }
    }
}

/// A fitted elastic-net model.
///
/// Weights live in standardized feature space; the per-feature mean and
/// scale are carried along so `predict` accepts raw rows. The whole
/// struct is serde round-trippable, which is what makes it a loggable
/// run artifact and a deployable image payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    feature_names: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
    means: Vec<f64>,
    scales: Vec<f64>,
    config: TrainConfig,
}

impl FittedModel {
    /// Feature names the model was fitted on, in order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Coefficients in standardized feature space.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Model intercept (mean of the training target).
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Hyperparameters the model was fitted with.
    #[must_use]
    pub const fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Predict a single raw feature row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scoring`] when the row arity does not match the
    /// fitted feature set.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.weights.len() {
            return Err(Error::Scoring(format!(
                "expected {} features, got {}",
                self.weights.len(),
                row.len()
            )));
        }
        let mut y = self.intercept;
        for ((&x, &w), (&mean, &scale)) in row
            .iter()
            .zip(&self.weights)
            .zip(self.means.iter().zip(&self.scales))
        {
            y += w * (x - mean) / scale;
        }
        Ok(y)
    }

    /// Predict a batch of raw feature rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scoring`] when any row has the wrong arity.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Serialize the model to a JSON artifact blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on serialization failure.
    pub fn to_artifact_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize a model from a JSON artifact blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] when the blob is not a serialized model.
    pub fn from_artifact_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The three evaluation scalars: error magnitude, absolute error, and
/// goodness-of-fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
}

impl Metrics {
    /// True when all three values are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.rmse.is_finite() && self.mae.is_finite() && self.r2.is_finite()
    }
}

/// Fit an elastic-net model on the full dataset.
///
/// # Errors
///
/// Returns [`Error::Dataset`] when the dataset has no feature columns.
pub fn fit(dataset: &Dataset, config: &TrainConfig) -> Result<FittedModel> {
    let n_rows = dataset.n_rows();
    let n_features = dataset.n_features();
    if n_features == 0 {
        return Err(Error::Dataset("dataset has no feature columns".to_string()));
    }

    // Standardize columns; constant columns get scale 1 and end up with
    // zero weight.
    let (means, scales) = column_stats(dataset.features(), n_features);
    let x = standardize(dataset.features(), &means, &scales);

    #[allow(clippy::cast_precision_loss)]
    let n = n_rows as f64;
    let y_mean = mean(dataset.target());
    let y_centered: Vec<f64> = dataset.target().iter().map(|&v| v - y_mean).collect();

    let l1_penalty = config.alpha * config.l1_ratio;
    let l2_penalty = config.alpha * (1.0 - config.l1_ratio);

    let mut weights = vec![0.0; n_features];
    let mut residual = y_centered;

    for iteration in 0..config.max_iter {
        let mut max_delta: f64 = 0.0;
        for j in 0..n_features {
            let old = weights[j];
            // Partial residual correlation for coordinate j; columns are
            // standardized so the column norm term is 1.
            let mut rho = 0.0;
            for (row, r) in x.iter().zip(&residual) {
                rho += row[j] * (r + row[j] * old);
            }
            rho /= n;

            let new = soft_threshold(rho, l1_penalty) / (1.0 + l2_penalty);
            if (new - old).abs() > f64::EPSILON {
                for (row, r) in x.iter().zip(residual.iter_mut()) {
                    *r -= row[j] * (new - old);
                }
            }
            weights[j] = new;
            max_delta = max_delta.max((new - old).abs());
        }
        if max_delta < config.tol {
            tracing::debug!(iteration, max_delta, "coordinate descent converged");
            break;
        }
    }

    Ok(FittedModel {
        feature_names: dataset.feature_names().to_vec(),
        weights,
        intercept: y_mean,
        means,
        scales,
        config: *config,
    })
}

/// Evaluate a fitted model against a dataset.
///
/// # Errors
///
/// Returns [`Error::Scoring`] when the dataset arity does not match the
/// model.
pub fn evaluate(model: &FittedModel, dataset: &Dataset) -> Result<Metrics> {
    let predictions = model.predict(dataset.features())?;
    let truth = dataset.target();

    #[allow(clippy::cast_precision_loss)]
    let n = truth.len() as f64;
    let mut sq_err = 0.0;
    let mut abs_err = 0.0;
    for (&p, &t) in predictions.iter().zip(truth) {
        sq_err += (p - t) * (p - t);
        abs_err += (p - t).abs();
    }

    let y_mean = mean(truth);
    let ss_tot: f64 = truth.iter().map(|&t| (t - y_mean) * (t - y_mean)).sum();
    let r2 = if ss_tot > f64::EPSILON {
        1.0 - sq_err / ss_tot
    } else {
        0.0
    };

    Ok(Metrics {
        rmse: (sq_err / n).sqrt(),
        mae: abs_err / n,
        r2,
    })
}

/// Split, fit, evaluate: the whole trainer in one call.
///
/// Uses `config.seed` for the split, so the returned metrics are a pure
/// function of `(dataset, config)`.
///
/// # Errors
///
/// Returns [`Error::Dataset`] when the dataset is too small to split,
/// and propagates [`fit`] and [`evaluate`] errors.
pub fn train_and_evaluate(dataset: &Dataset, config: &TrainConfig) -> Result<(FittedModel, Metrics)> {
    let (train, test) = dataset.train_test_split(DEFAULT_TEST_FRACTION, config.seed)?;
    let model = fit(&train, config)?;
    let metrics = evaluate(&model, &test)?;
    tracing::info!(
        alpha = config.alpha,
        l1_ratio = config.l1_ratio,
        rmse = metrics.rmse,
        mae = metrics.mae,
        r2 = metrics.r2,
        "trained elastic-net model"
    );
    Ok((model, metrics))
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

fn column_stats(rows: &[Vec<f64>], n_features: usize) -> (Vec<f64>, Vec<f64>) {
    #[allow(clippy::cast_precision_loss)]
    let n = rows.len() as f64;
    let mut means = vec![0.0; n_features];
    for row in rows {
        for (m, &x) in means.iter_mut().zip(row) {
            *m += x;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut scales = vec![0.0; n_features];
    for row in rows {
        for ((s, &x), &m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (x - m) * (x - m);
        }
    }
    for s in &mut scales {
        *s = (*s / n).sqrt();
        if *s < f64::EPSILON {
            *s = 1.0;
        }
    }
    (means, scales)
}

fn standardize(rows: &[Vec<f64>], means: &[f64], scales: &[f64]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .zip(means.iter().zip(scales))
                .map(|(&x, (&m, &s))| (x - m) / s)
                .collect()
        })
        .collect()
}

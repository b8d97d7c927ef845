//! Binary logistic regression over sparse features.
//!
//! Fitted with full-batch gradient descent on the mean log loss plus an L2
//! penalty of `1 / (2 * C * n)`, the per-sample equivalent of the usual
//! `||w||^2 / 2C + sum(loss)` objective.

use super::tfidf::SparseVector;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Probability at or above which a sample is assigned the positive class.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Errors for logistic regression.
#[derive(Error, Debug, PartialEq)]
pub enum LogisticRegressionError {
    #[error("model has not been fitted yet")]
    NotFitted,

    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("got {samples} samples but {labels} labels")]
    LengthMismatch { samples: usize, labels: usize },
}

/// Hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength.
    pub c: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Stop when the loss improves by less than this.
    pub tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            learning_rate: 1.0,
            max_iter: 1000,
            tolerance: 1e-7,
        }
    }
}

/// Logistic regression classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticParams,
    weights: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticParams::default())
    }
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            weights: None,
            intercept: 0.0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    /// Number of learned feature weights, `None` before fitting.
    pub fn n_weights(&self) -> Option<usize> {
        self.weights.as_ref().map(Array1::len)
    }

    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let exp_z = z.exp();
            exp_z / (1.0 + exp_z)
        }
    }

    fn linear(weights: &Array1<f64>, bias: f64, x: &SparseVector) -> f64 {
        x.iter()
            .filter(|(idx, _)| *idx < weights.len())
            .map(|&(idx, v)| weights[idx] * v)
            .sum::<f64>()
            + bias
    }

    /// Fit on `rows` with `n_features` columns and boolean labels.
    pub fn fit(
        &mut self,
        rows: &[SparseVector],
        labels: &[bool],
        n_features: usize,
    ) -> Result<(), LogisticRegressionError> {
        if rows.is_empty() {
            return Err(LogisticRegressionError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(LogisticRegressionError::LengthMismatch {
                samples: rows.len(),
                labels: labels.len(),
            });
        }

        let n = rows.len() as f64;
        let alpha = 1.0 / (self.params.c * n);
        let lr = self.params.learning_rate;
        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;
        let mut prev_loss = f64::INFINITY;

        for iter in 0..self.params.max_iter {
            let mut grad = Array1::<f64>::zeros(n_features);
            let mut grad_bias = 0.0;
            let mut loss = 0.0;

            for (x, &y) in rows.iter().zip(labels) {
                let p = Self::sigmoid(Self::linear(&weights, bias, x));
                let y = if y { 1.0 } else { 0.0 };
                let err = p - y;
                for &(idx, v) in x {
                    grad[idx] += err * v;
                }
                grad_bias += err;

                let p = p.clamp(1e-15, 1.0 - 1e-15);
                loss -= y * p.ln() + (1.0 - y) * (1.0 - p).ln();
            }

            grad /= n;
            grad.scaled_add(alpha, &weights);
            grad_bias /= n;
            loss = loss / n + 0.5 * alpha * weights.dot(&weights);

            weights.scaled_add(-lr, &grad);
            bias -= lr * grad_bias;

            if (prev_loss - loss).abs() < self.params.tolerance {
                debug!(iter, loss, "Logistic regression converged");
                break;
            }
            prev_loss = loss;
        }

        self.weights = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, x: &SparseVector) -> Result<f64, LogisticRegressionError> {
        let weights = self
            .weights
            .as_ref()
            .ok_or(LogisticRegressionError::NotFitted)?;
        Ok(Self::sigmoid(Self::linear(weights, self.intercept, x)))
    }

    /// Positive class iff the probability reaches [`DECISION_THRESHOLD`].
    pub fn predict(&self, x: &SparseVector) -> Result<bool, LogisticRegressionError> {
        Ok(self.predict_proba(x)? >= DECISION_THRESHOLD)
    }
}

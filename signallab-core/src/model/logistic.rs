//! L2-regularized logistic regression on z-scored features.
//!
//! Minimizes `0.5·‖w‖² + C·Σ logloss(yᵢ, σ(b + w·xᵢ))` with Newton steps (IRLS).
//! The intercept `b` is not penalized.

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRow, FEATURE_COUNT};
use crate::model::{check_training_set, ModelError, Predictor, StandardScaler};

/// Intercept followed by one weight per feature.
const DIM: usize = FEATURE_COUNT + 1;

const PIVOT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest Newton step component falls below this.
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 500,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Fitted {
    scaler: StandardScaler,
    intercept: f64,
    weights: [f64; FEATURE_COUNT],
    iterations: usize,
}

/// Serializable so a fitted model can be stored beside a run's artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    fitted: Option<Fitted>,
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn config(&self) -> &LogisticConfig {
        &self.config
    }

    /// `(intercept, weights)` in scaled feature space, once fitted.
    pub fn coefficients(&self) -> Option<(f64, [f64; FEATURE_COUNT])> {
        self.fitted.as_ref().map(|f| (f.intercept, f.weights))
    }

    /// Newton iterations used by the last fit.
    pub fn iterations(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.iterations)
    }
}

impl Predictor for LogisticRegression {
    fn fit(&mut self, features: &[FeatureRow], labels: &[bool]) -> Result<(), ModelError> {
        check_training_set(features, labels)?;
        let ups = labels.iter().filter(|&&y| y).count();
        if ups == 0 || ups == labels.len() {
            return Err(ModelError::SingleClass);
        }

        let scaler = StandardScaler::fit(features);
        let design: Vec<[f64; DIM]> = features
            .iter()
            .map(|row| with_bias(&scaler.transform(row)))
            .collect();
        let c = self.config.c;

        let mut beta = [0.0; DIM];
        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.config.max_iter {
            iterations += 1;

            let mut grad = [0.0; DIM];
            let mut hess = [[0.0; DIM]; DIM];
            for (x, &y) in design.iter().zip(labels) {
                let p = sigmoid(dot(&beta, x));
                let residual = p - if y { 1.0 } else { 0.0 };
                let w = p * (1.0 - p);
                for i in 0..DIM {
                    grad[i] += c * residual * x[i];
                    for j in 0..=i {
                        hess[i][j] += c * w * x[i] * x[j];
                    }
                }
            }
            for i in 1..DIM {
                grad[i] += beta[i];
                hess[i][i] += 1.0;
            }
            for i in 0..DIM {
                for j in (i + 1)..DIM {
                    hess[i][j] = hess[j][i];
                }
            }

            let step = solve(hess, grad).ok_or(ModelError::Singular(iterations))?;
            for (b, s) in beta.iter_mut().zip(step) {
                *b -= s;
            }
            if !beta.iter().all(|b| b.is_finite()) {
                return Err(ModelError::NonFinite("coefficients"));
            }
            if step.iter().all(|s| s.abs() < self.config.tolerance) {
                converged = true;
                break;
            }
        }

        if converged {
            log::debug!("logistic regression converged in {iterations} iterations");
        } else {
            log::warn!(
                "logistic regression did not converge in {} iterations",
                self.config.max_iter
            );
        }

        let mut weights = [0.0; FEATURE_COUNT];
        weights.copy_from_slice(&beta[1..]);
        self.fitted = Some(Fitted {
            scaler,
            intercept: beta[0],
            weights,
            iterations,
        });
        Ok(())
    }

    fn predict_probability(&self, features: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        if !features.iter().all(FeatureRow::is_finite) {
            return Err(ModelError::NonFinite("prediction features"));
        }
        let beta = with_bias_weights(fitted.intercept, &fitted.weights);
        Ok(features
            .iter()
            .map(|row| sigmoid(dot(&beta, &with_bias(&fitted.scaler.transform(row)))))
            .collect())
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn dot(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn with_bias(x: &[f64; FEATURE_COUNT]) -> [f64; DIM] {
    let mut out = [1.0; DIM];
    out[1..].copy_from_slice(x);
    out
}

fn with_bias_weights(intercept: f64, weights: &[f64; FEATURE_COUNT]) -> [f64; DIM] {
    let mut out = [intercept; DIM];
    out[1..].copy_from_slice(weights);
    out
}

/// Solve `a · x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: [[f64; DIM]; DIM], mut b: [f64; DIM]) -> Option<[f64; DIM]> {
    for col in 0..DIM {
        let pivot = (col..DIM).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPS {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..DIM {
            let factor = a[row][col] / a[col][col];
            for k in col..DIM {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0; DIM];
    for row in (0..DIM).rev() {
        let tail: f64 = ((row + 1)..DIM).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

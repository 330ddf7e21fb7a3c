//! L2-regularized logistic regression, fitted by batch gradient descent with
//! a decaying learning rate. Features are standardized on the training set;
//! the means and deviations travel with the model.

use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::error::MlError;

#[derive(Debug, Clone, Copy)]
pub struct LogisticParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl LogisticModel {
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        let mut z = self.bias;
        for (i, w) in self.weights.iter().enumerate() {
            let v = x.get(i).copied().unwrap_or(0.0);
            z += w * (v - self.means[i]) / self.stds[i];
        }
        sigmoid(z)
    }
}

pub struct Logistic {
    params: LogisticParams,
    model: Option<LogisticModel>,
}

impl Logistic {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    pub fn into_model(self) -> Option<LogisticModel> {
        self.model
    }
}

impl Classifier for Logistic {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), MlError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(MlError::TrainingFailure {
                kind: "logistic".into(),
                category: String::new(),
                reason: format!("bad training shape: {} samples, {} targets", x.len(), y.len()),
            });
        }
        let positives = y.iter().filter(|&&v| v > 0.5).count();
        if positives == 0 || positives == y.len() {
            // A separating hyperplane does not exist in any useful sense;
            // the tree kinds cover the constant case.
            return Err(MlError::TrainingFailure {
                kind: "logistic".into(),
                category: String::new(),
                reason: "single-class training data".into(),
            });
        }

        let n = x.len() as f64;
        let n_features = x[0].len();

        let mut means = vec![0.0; n_features];
        for row in x {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }
        let mut stds = vec![0.0; n_features];
        for row in x {
            for (s, (v, m)) in stds.iter_mut().zip(row.iter().zip(&means)) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt().max(1e-9);
        }

        let scaled: Vec<Vec<f64>> = x
            .iter()
            .map(|row| {
                row.iter()
                    .zip(means.iter().zip(&stds))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect();

        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;
        for epoch in 0..self.params.epochs.max(1) {
            let lr = self.params.learning_rate / (1.0 + 0.01 * epoch as f64);
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;
            for (row, target) in scaled.iter().zip(y) {
                let mut z = bias;
                for (w, v) in weights.iter().zip(row) {
                    z += w * v;
                }
                let err = sigmoid(z) - target;
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_b += err;
            }
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= lr * (g / n + self.params.l2 * *w);
            }
            bias -= lr * grad_b / n;
            if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
                return Err(MlError::TrainingFailure {
                    kind: "logistic".into(),
                    category: String::new(),
                    reason: "diverged".into(),
                });
            }
        }

        self.model = Some(LogisticModel {
            weights,
            bias,
            means,
            stds,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        self.model.as_ref().map_or(0.5, |m| m.predict_proba(x))
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        None
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

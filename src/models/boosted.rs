//! Gradient boosting over shallow regression trees, logistic loss.
//!
//! Each round fits a depth-limited tree to the pseudo-residuals
//! `y − sigmoid(F)` and adds it with a shrinkage factor. The prior is the
//! base-rate log-odds, so an all-one-class fit degenerates to a constant
//! model instead of failing.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::tree::{Tree, TreeParams};
use super::Classifier;
use crate::error::MlError;

#[derive(Debug, Clone, Copy)]
pub struct BoostParams {
    pub n_rounds: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostModel {
    /// Base-rate log-odds prior.
    pub base_score: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
    /// Split-gain importance, normalized to sum 1.
    pub importance: Vec<f64>,
}

impl BoostModel {
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        let mut score = self.base_score;
        for tree in &self.trees {
            score += self.learning_rate * tree.predict(x);
        }
        sigmoid(score)
    }
}

pub struct GradientBoost {
    params: BoostParams,
    model: Option<BoostModel>,
}

impl GradientBoost {
    pub fn new(params: BoostParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    pub fn into_model(self) -> Option<BoostModel> {
        self.model
    }
}

impl Classifier for GradientBoost {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), MlError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(MlError::TrainingFailure {
                kind: "gradient_boost".into(),
                category: String::new(),
                reason: format!("bad training shape: {} samples, {} targets", x.len(), y.len()),
            });
        }

        let n = x.len();
        let n_features = x[0].len();
        let positives = y.iter().filter(|&&v| v > 0.5).count() as f64;
        let base_rate = (positives / n as f64).clamp(1e-4, 1.0 - 1e-4);
        let base_score = (base_rate / (1.0 - base_rate)).ln();

        let idx: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(29);
        let mut importance = vec![0.0; n_features];
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_leaf: self.params.min_samples_leaf,
            feature_subsample: None,
        };

        let mut scores = vec![base_score; n];
        let mut trees = Vec::with_capacity(self.params.n_rounds);
        for _ in 0..self.params.n_rounds {
            let residuals: Vec<f64> = y
                .iter()
                .zip(&scores)
                .map(|(target, score)| target - sigmoid(*score))
                .collect();

            let tree = Tree::grow(x, &residuals, &idx, tree_params, &mut rng, &mut importance);

            // Stop once the residual signal is flat (pure-leaf / no-split tree)
            let mut moved = false;
            for (i, row) in x.iter().enumerate() {
                let step = tree.predict(row);
                if step.abs() > 1e-12 {
                    moved = true;
                }
                scores[i] += self.params.learning_rate * step;
            }
            trees.push(tree);
            if !moved {
                break;
            }
        }

        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in &mut importance {
                *v /= total;
            }
        }

        self.model = Some(BoostModel {
            base_score,
            learning_rate: self.params.learning_rate,
            trees,
            importance,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        self.model.as_ref().map_or(0.5, |m| m.predict_proba(x))
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        self.model.as_ref().map(|m| m.importance.clone())
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

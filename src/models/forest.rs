//! Bagged random forest (tree ensemble, equal-weight voting inside).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{Tree, TreeParams};
use super::Classifier;
use crate::error::MlError;

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

/// Fitted forest state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    pub trees: Vec<Tree>,
    /// Gini-style importance, normalized to sum 1 (all zeros if no splits).
    pub importance: Vec<f64>,
}

impl ForestModel {
    /// Positive-class probability = mean leaf fraction over the trees.
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }
}

pub struct RandomForest {
    params: ForestParams,
    model: Option<ForestModel>,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    pub fn into_model(self) -> Option<ForestModel> {
        self.model
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), MlError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(MlError::TrainingFailure {
                kind: "random_forest".into(),
                category: String::new(),
                reason: format!("bad training shape: {} samples, {} targets", x.len(), y.len()),
            });
        }

        let n = x.len();
        let n_features = x[0].len();
        // sqrt feature subsampling, the usual forest default
        let subsample = ((n_features as f64).sqrt().round() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut importance = vec![0.0; n_features];
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_leaf: self.params.min_samples_leaf,
            feature_subsample: Some(subsample),
        };

        let mut trees = Vec::with_capacity(self.params.n_trees);
        for _ in 0..self.params.n_trees {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(Tree::grow(
                x,
                y,
                &bootstrap,
                tree_params,
                &mut rng,
                &mut importance,
            ));
        }

        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in &mut importance {
                *v /= total;
            }
        }

        self.model = Some(ForestModel { trees, importance });
        Ok(())
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        self.model.as_ref().map_or(0.5, |m| m.predict_proba(x))
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        self.model.as_ref().map(|m| m.importance.clone())
    }
}

//! Classifier kinds, hyperparameter table and serialized artifacts.
//!
//! Three interchangeable classifier kinds sit behind the [`Classifier`]
//! trait: two tree ensembles with differing hyperparameters and one linear
//! model. Which kinds vote, with which hyperparameters and which ensemble
//! weight, is driven entirely by the [`ensemble_config`] configuration table,
//! the rest of the engine never hard-codes a kind.
//!
//! All models are binary: the target is the meta-label "did the recommended
//! bet land" (1) or not (0).

pub mod boosted;
pub mod forest;
pub mod logistic;
pub mod registry;
pub mod tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::BetCategory;
use crate::error::MlError;

pub use boosted::{BoostModel, BoostParams};
pub use forest::{ForestModel, ForestParams};
pub use logistic::{LogisticModel, LogisticParams};
pub use registry::ModelRegistry;

/// The three classifier kinds of the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    RandomForest,
    GradientBoost,
    Logistic,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 3] = [
        ClassifierKind::RandomForest,
        ClassifierKind::GradientBoost,
        ClassifierKind::Logistic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::RandomForest => "random_forest",
            ClassifierKind::GradientBoost => "gradient_boost",
            ClassifierKind::Logistic => "logistic",
        }
    }

    pub fn model_type(&self) -> &'static str {
        match self {
            ClassifierKind::RandomForest | ClassifierKind::GradientBoost => "tree_ensemble",
            ClassifierKind::Logistic => "linear",
        }
    }

    /// Tree-based kinds expose ranked feature importances; the linear kind
    /// does not.
    pub fn has_feature_importance(&self) -> bool {
        self.model_type() == "tree_ensemble"
    }
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the ensemble configuration table.
#[derive(Debug, Clone)]
pub struct EnsembleMember {
    pub kind: ClassifierKind,
    /// Fixed combination weight in the weighted-probability average.
    pub weight: f64,
    pub params: HyperParams,
}

#[derive(Debug, Clone)]
pub enum HyperParams {
    Forest(ForestParams),
    Boost(BoostParams),
    Logistic(LogisticParams),
}

/// The ensemble configuration. The gradient-boosted kind carries the highest
/// weight, historically the most accurate of the three.
pub fn ensemble_config() -> [EnsembleMember; 3] {
    [
        EnsembleMember {
            kind: ClassifierKind::RandomForest,
            weight: 1.0,
            params: HyperParams::Forest(ForestParams {
                n_trees: 60,
                max_depth: 6,
                min_samples_leaf: 3,
                seed: 17,
            }),
        },
        EnsembleMember {
            kind: ClassifierKind::GradientBoost,
            weight: 1.2,
            params: HyperParams::Boost(BoostParams {
                n_rounds: 80,
                max_depth: 3,
                learning_rate: 0.1,
                min_samples_leaf: 5,
            }),
        },
        EnsembleMember {
            kind: ClassifierKind::Logistic,
            weight: 0.8,
            params: HyperParams::Logistic(LogisticParams {
                epochs: 300,
                learning_rate: 0.1,
                l2: 1e-3,
            }),
        },
    ]
}

pub fn member_weight(kind: ClassifierKind) -> f64 {
    ensemble_config()
        .iter()
        .find(|m| m.kind == kind)
        .map(|m| m.weight)
        .unwrap_or(1.0)
}

/// Common interface over the three classifier kinds.
pub trait Classifier {
    /// Fit on row-major samples and binary 0/1 targets.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), MlError>;

    /// Probability of the positive class.
    fn predict_proba(&self, x: &[f64]) -> f64;

    /// Predicted class, argmax over {0, 1}.
    fn predict(&self, x: &[f64]) -> usize {
        usize::from(self.predict_proba(x) >= 0.5)
    }

    /// Per-feature importance in schema order; `None` for kinds without one.
    fn feature_importance(&self) -> Option<Vec<f64>>;
}

/// Fitted model state, serializable to the artifact file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FittedModel {
    Forest(ForestModel),
    Boost(BoostModel),
    Logistic(LogisticModel),
}

impl FittedModel {
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        match self {
            FittedModel::Forest(m) => m.predict_proba(x),
            FittedModel::Boost(m) => m.predict_proba(x),
            FittedModel::Logistic(m) => m.predict_proba(x),
        }
    }

    pub fn predict(&self, x: &[f64]) -> usize {
        usize::from(self.predict_proba(x) >= 0.5)
    }

    pub fn feature_importance(&self) -> Option<Vec<f64>> {
        match self {
            FittedModel::Forest(m) => Some(m.importance.clone()),
            FittedModel::Boost(m) => Some(m.importance.clone()),
            FittedModel::Logistic(_) => None,
        }
    }
}

/// A persisted, immutable model artifact. Superseded by retraining, never
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: ClassifierKind,
    pub category: BetCategory,
    /// Feature order the model was trained with; must equal the live schema.
    pub feature_order: Vec<String>,
    pub samples_count: usize,
    pub trained_at: DateTime<Utc>,
    pub model: FittedModel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn config_table_carries_the_fixed_weights() {
        assert_relative_eq!(member_weight(ClassifierKind::RandomForest), 1.0);
        assert_relative_eq!(member_weight(ClassifierKind::GradientBoost), 1.2);
        assert_relative_eq!(member_weight(ClassifierKind::Logistic), 0.8);
    }

    #[test]
    fn only_tree_kinds_expose_importance() {
        assert!(ClassifierKind::RandomForest.has_feature_importance());
        assert!(ClassifierKind::GradientBoost.has_feature_importance());
        assert!(!ClassifierKind::Logistic.has_feature_importance());
    }

    #[test]
    fn config_covers_every_kind_once() {
        let table = ensemble_config();
        for kind in ClassifierKind::ALL {
            assert_eq!(table.iter().filter(|m| m.kind == kind).count(), 1);
        }
    }
}

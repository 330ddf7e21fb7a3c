//! Training orchestration: turn verified outcomes into published models.
//!
//! Per category, all verified training examples are split 80/20 with a
//! fixed seed and the three classifier kinds are trained independently. One
//! kind failing to fit does not block the others; whatever trains gets
//! evaluated, serialized, published to the registry and recorded in
//! `ensemble_models`. Retraining overwrites the artifact for that
//! (kind, category) pair; there is no versioned history.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::db::models::{BetCategory, ModelRecord};
use crate::db::Database;
use crate::error::MlError;
use crate::features::FIELD_NAMES;
use crate::models::boosted::GradientBoost;
use crate::models::forest::RandomForest;
use crate::models::logistic::Logistic;
use crate::models::{
    ensemble_config, Classifier, ClassifierKind, FittedModel, HyperParams, ModelArtifact,
    ModelRegistry,
};

/// Fewest verified examples a category needs before training is attempted.
pub const DEFAULT_MIN_SAMPLES: usize = 50;

/// Seed for the train/test shuffle; fixed so a rerun on the same data
/// reproduces the same split and the same metrics.
const SPLIT_SEED: u64 = 42;

/// Category labels the periodic retrain job iterates. Known defect carried
/// forward from the legacy job: the totals and both-teams-score labels here
/// never matched the labels predictions are persisted under, so those
/// categories are only ever retrained on demand, not on schedule.
pub const SCHEDULED_RETRAIN_CATEGORIES: &[&str] = &[
    "home_win",
    "away_win",
    "draw",
    "over_2_5",
    "under_2_5",
    "btts",
    "double_chance",
    "handicap",
];

/// Evaluation metrics for one trained classifier.
#[derive(Debug, Clone)]
pub struct ClassifierMetrics {
    pub kind: ClassifierKind,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

/// Outcome of one `train_category` call.
#[derive(Debug)]
pub struct TrainingReport {
    pub category: BetCategory,
    pub total_samples: usize,
    pub trained: Vec<ClassifierMetrics>,
    /// Kinds whose fit failed, with the failure. Isolated; the rest of the
    /// ensemble still published.
    pub failed: Vec<(ClassifierKind, MlError)>,
}

pub struct Trainer {
    db: Database,
    registry: Arc<ModelRegistry>,
    min_samples: usize,
    in_progress: Mutex<HashSet<BetCategory>>,
}

impl Trainer {
    pub fn new(db: Database, registry: Arc<ModelRegistry>, min_samples: usize) -> Self {
        Trainer {
            db,
            registry,
            min_samples,
            in_progress: Mutex::new(HashSet::new()),
        }
    }

    /// Train and publish all classifier kinds for one category.
    pub fn train_category(&self, category: BetCategory) -> Result<TrainingReport, MlError> {
        let _guard = self.claim(category)?;

        let examples = self
            .db
            .load_verified_examples(category)
            .map_err(|e| MlError::Persistence(e.to_string()))?;
        if examples.len() < self.min_samples {
            return Err(MlError::DataUnavailable {
                category: category.as_str().to_string(),
                available: examples.len(),
                required: self.min_samples,
            });
        }
        let total_samples = examples.len();

        let mut rows: Vec<(Vec<f64>, f64)> = examples
            .iter()
            .map(|ex| {
                let target = ex.target.unwrap_or(0) as f64;
                (ex.features.to_vec(), target)
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
        rows.shuffle(&mut rng);

        let split = (rows.len() * 4) / 5;
        let (train, test) = rows.split_at(split);
        let (train_x, train_y): (Vec<_>, Vec<_>) = train.iter().cloned().unzip();

        let mut report = TrainingReport {
            category,
            total_samples,
            trained: Vec::new(),
            failed: Vec::new(),
        };

        for member in ensemble_config() {
            match self.train_one(category, member.kind, &member.params, &train_x, &train_y, test)
            {
                Ok(metrics) => report.trained.push(metrics),
                Err(e) => {
                    warn!(kind = %member.kind, %category, error = %e, "classifier training failed, continuing");
                    report.failed.push((member.kind, e));
                }
            }
        }

        if let Err(e) = self.db.log_event(
            "model_retrained",
            &format!(
                "{category}: {}/{} classifiers published on {total_samples} samples",
                report.trained.len(),
                report.trained.len() + report.failed.len()
            ),
            None,
        ) {
            warn!(%category, error = %e, "failed to write retrain log entry");
        }
        Ok(report)
    }

    fn train_one(
        &self,
        category: BetCategory,
        kind: ClassifierKind,
        params: &HyperParams,
        train_x: &[Vec<f64>],
        train_y: &[f64],
        test: &[(Vec<f64>, f64)],
    ) -> Result<ClassifierMetrics, MlError> {
        let (model, importance): (FittedModel, Option<Vec<f64>>) = match params {
            HyperParams::Forest(p) => {
                let mut c = RandomForest::new(*p);
                c.fit(train_x, train_y)?;
                let importance = c.feature_importance();
                (
                    FittedModel::Forest(c.into_model().ok_or_else(|| unfitted(kind, category))?),
                    importance,
                )
            }
            HyperParams::Boost(p) => {
                let mut c = GradientBoost::new(*p);
                c.fit(train_x, train_y)?;
                let importance = c.feature_importance();
                (
                    FittedModel::Boost(c.into_model().ok_or_else(|| unfitted(kind, category))?),
                    importance,
                )
            }
            HyperParams::Logistic(p) => {
                let mut c = Logistic::new(*p);
                c.fit(train_x, train_y)?;
                (
                    FittedModel::Logistic(
                        c.into_model().ok_or_else(|| unfitted(kind, category))?,
                    ),
                    None,
                )
            }
        };

        let metrics = evaluate(kind, &model, train_x.len(), test);
        let importance_json = importance.map(|imp| top_importance_json(&imp, 10));
        let model_path = format!("{}_{}.json", kind.as_str(), category.as_str());

        self.registry.publish(ModelArtifact {
            kind,
            category,
            feature_order: FIELD_NAMES.iter().map(|s| s.to_string()).collect(),
            samples_count: train_x.len() + test.len(),
            trained_at: Utc::now(),
            model,
        })?;
        self.db
            .upsert_model_record(&ModelRecord {
                id: None,
                model_name: kind.as_str().to_string(),
                model_type: kind.model_type().to_string(),
                category,
                accuracy: metrics.accuracy,
                precision: metrics.precision,
                recall: metrics.recall,
                f1: metrics.f1,
                samples_count: (train_x.len() + test.len()) as i64,
                feature_importance_json: importance_json,
                model_path,
                trained_at: Utc::now(),
            })
            .map_err(|e| MlError::Persistence(e.to_string()))?;

        info!(%kind, %category, accuracy = metrics.accuracy, f1 = metrics.f1, "published classifier");
        Ok(metrics)
    }

    fn claim(&self, category: BetCategory) -> Result<TrainGuard<'_>, MlError> {
        let mut set = self
            .in_progress
            .lock()
            .map_err(|_| MlError::Persistence("trainer lock poisoned".into()))?;
        if !set.insert(category) {
            return Err(MlError::TrainingFailure {
                kind: "ensemble".to_string(),
                category: category.as_str().to_string(),
                reason: "retrain already in progress".to_string(),
            });
        }
        Ok(TrainGuard {
            trainer: self,
            category,
        })
    }
}

/// Releases the per-category in-progress claim on drop.
struct TrainGuard<'a> {
    trainer: &'a Trainer,
    category: BetCategory,
}

impl Drop for TrainGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.trainer.in_progress.lock() {
            set.remove(&self.category);
        }
    }
}

fn unfitted(kind: ClassifierKind, category: BetCategory) -> MlError {
    MlError::TrainingFailure {
        kind: kind.as_str().to_string(),
        category: category.as_str().to_string(),
        reason: "fit produced no model".to_string(),
    }
}

/// Binary classification metrics on the held-out split, with zero-division
/// guards. An empty test split yields all-zero metrics rather than NaN.
fn evaluate(
    kind: ClassifierKind,
    model: &FittedModel,
    train_samples: usize,
    test: &[(Vec<f64>, f64)],
) -> ClassifierMetrics {
    let (mut tp, mut fp, mut tn, mut fneg) = (0usize, 0usize, 0usize, 0usize);
    for (x, y) in test {
        let predicted = model.predict(x);
        let actual = usize::from(*y > 0.5);
        match (predicted, actual) {
            (1, 1) => tp += 1,
            (1, 0) => fp += 1,
            (0, 0) => tn += 1,
            _ => fneg += 1,
        }
    }
    let total = test.len();
    let accuracy = if total > 0 {
        (tp + tn) as f64 / total as f64
    } else {
        0.0
    };
    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };
    let recall = if tp + fneg > 0 {
        tp as f64 / (tp + fneg) as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassifierMetrics {
        kind,
        accuracy,
        precision,
        recall,
        f1,
        train_samples,
        test_samples: total,
    }
}

/// Top-N feature importances as a JSON array of {feature, importance}.
fn top_importance_json(importance: &[f64], n: usize) -> String {
    let mut ranked: Vec<(usize, f64)> = importance
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| *v > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let entries: Vec<serde_json::Value> = ranked
        .into_iter()
        .take(n)
        .map(|(i, v)| {
            serde_json::json!({
                "feature": FIELD_NAMES.get(i).copied().unwrap_or("unknown"),
                "importance": v,
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::features::MatchFeatures;

    fn trainer(dir: &std::path::Path) -> Trainer {
        Trainer::new(
            Database::open_in_memory().unwrap(),
            Arc::new(ModelRegistry::new(dir).unwrap()),
            DEFAULT_MIN_SAMPLES,
        )
    }

    /// Seed `n` verified examples where strong home form wins the bet.
    fn seed_verified(database: &Database, category: BetCategory, n: usize) {
        for i in 0..n {
            let mut f = MatchFeatures::default();
            f.home_win_rate = (i % 100) as f64;
            f.home_form_points = f.home_win_rate / 33.0;
            let id = format!("{}-{i}", category.as_str());
            database
                .insert_training_example(&id, category, &f, 1)
                .unwrap();
            let target = i64::from(f.home_win_rate > 50.0);
            database
                .transaction(|conn| db::mark_verified(conn, &id, target))
                .unwrap();
        }
    }

    #[test]
    fn below_threshold_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        seed_verified(&t.db, BetCategory::HomeWin, 49);

        let err = t.train_category(BetCategory::HomeWin).unwrap_err();
        assert!(err.is_data_unavailable(), "got {err}");
    }

    #[test]
    fn at_threshold_training_proceeds_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        seed_verified(&t.db, BetCategory::HomeWin, 50);

        let report = t.train_category(BetCategory::HomeWin).unwrap();
        assert_eq!(report.total_samples, 50);
        assert_eq!(report.trained.len() + report.failed.len(), 3);
        assert!(
            report.trained.iter().any(|m| m.kind == ClassifierKind::RandomForest),
            "forest should train on separable data"
        );

        // published artifacts are retrievable and metadata rows exist
        for m in &report.trained {
            assert!(t.registry.get(m.kind, BetCategory::HomeWin).is_some());
            let rec = t
                .db
                .get_model_record(m.kind.as_str(), BetCategory::HomeWin)
                .unwrap()
                .expect("metadata row");
            assert_eq!(rec.samples_count, 50);
        }
    }

    #[test]
    fn tree_kinds_record_ranked_importance() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        seed_verified(&t.db, BetCategory::AwayWin, 80);
        t.train_category(BetCategory::AwayWin).unwrap();

        let rec = t
            .db
            .get_model_record("random_forest", BetCategory::AwayWin)
            .unwrap()
            .unwrap();
        let json = rec.feature_importance_json.expect("tree kinds rank features");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert!(!parsed.is_empty());
        assert!(parsed.len() <= 10);
        assert!(parsed[0]["feature"].is_string());

        let logistic = t
            .db
            .get_model_record("logistic", BetCategory::AwayWin)
            .unwrap();
        if let Some(rec) = logistic {
            assert!(rec.feature_importance_json.is_none());
        }
    }

    #[test]
    fn split_is_eighty_twenty() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        seed_verified(&t.db, BetCategory::Draw, 100);
        let report = t.train_category(BetCategory::Draw).unwrap();
        let m = &report.trained[0];
        assert_eq!(m.train_samples, 80);
        assert_eq!(m.test_samples, 20);
    }

    #[test]
    fn metrics_survive_a_degenerate_test_split() {
        // all-negative test outcomes: precision/recall guards must hold
        let model = FittedModel::Logistic(crate::models::LogisticModel {
            weights: vec![0.0],
            bias: -2.0,
            means: vec![0.0],
            stds: vec![1.0],
        });
        let test = vec![(vec![0.0], 0.0), (vec![1.0], 0.0)];
        let m = evaluate(ClassifierKind::Logistic, &model, 8, &test);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn scheduled_category_labels_have_drifted() {
        // The legacy schedule list does not line up with the labels
        // predictions persist under; the drifted entries never parse, so
        // those categories are skipped by the periodic job.
        let unknown: Vec<&&str> = SCHEDULED_RETRAIN_CATEGORIES
            .iter()
            .filter(|s| BetCategory::parse(s).is_none())
            .collect();
        assert!(
            !unknown.is_empty(),
            "drifted labels are expected to stay drifted"
        );

        let scheduled: HashSet<&str> = SCHEDULED_RETRAIN_CATEGORIES.iter().copied().collect();
        let persisted: HashSet<&str> = BetCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_ne!(scheduled, persisted);
        // some categories are unreachable on the schedule
        assert!(persisted.difference(&scheduled).next().is_some());
    }

    #[test]
    fn concurrent_claim_on_one_category_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(dir.path());
        let guard = t.claim(BetCategory::HomeWin).unwrap();
        assert!(t.claim(BetCategory::HomeWin).is_err());
        // other categories are unaffected
        assert!(t.claim(BetCategory::Draw).is_ok());
        drop(guard);
        assert!(t.claim(BetCategory::HomeWin).is_ok());
    }
}

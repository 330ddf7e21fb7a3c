//! In-process model registry backed by JSON artifact files on disk.
//!
//! Keyed by (classifier kind, bet category). Lookups hit an in-memory cache
//! first and fall back to a lazy disk load, so a restarted process serves
//! the last published models without retraining. Publishing writes the
//! artifact to a temp file and renames it into place, then swaps the cache
//! entry; readers holding an `Arc` to the old artifact keep a consistent
//! snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use super::{ClassifierKind, ModelArtifact};
use crate::db::models::BetCategory;
use crate::error::MlError;

pub struct ModelRegistry {
    model_dir: PathBuf,
    cache: RwLock<HashMap<(ClassifierKind, BetCategory), Arc<ModelArtifact>>>,
}

impl ModelRegistry {
    pub fn new(model_dir: impl Into<PathBuf>) -> Result<Self, MlError> {
        let model_dir = model_dir.into();
        fs::create_dir_all(&model_dir)
            .map_err(|e| MlError::Persistence(format!("create model dir: {e}")))?;
        Ok(Self {
            model_dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn artifact_path(&self, kind: ClassifierKind, category: BetCategory) -> PathBuf {
        self.model_dir
            .join(format!("{}_{}.json", kind.as_str(), category.as_str()))
    }

    /// Current artifact for the pair, loading from disk on a cache miss.
    pub fn get(
        &self,
        kind: ClassifierKind,
        category: BetCategory,
    ) -> Option<Arc<ModelArtifact>> {
        if let Ok(cache) = self.cache.read() {
            if let Some(artifact) = cache.get(&(kind, category)) {
                return Some(Arc::clone(artifact));
            }
        }

        let path = self.artifact_path(kind, category);
        let artifact = match load_artifact(&path) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return None,
            Err(e) => {
                warn!(%kind, category = %category, error = %e, "discarding unreadable model artifact");
                return None;
            }
        };
        if artifact.kind != kind || artifact.category != category {
            warn!(%kind, category = %category, path = %path.display(), "artifact file does not match its name");
            return None;
        }

        let artifact = Arc::new(artifact);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert((kind, category), Arc::clone(&artifact));
        }
        debug!(%kind, category = %category, samples = artifact.samples_count, "loaded model artifact from disk");
        Some(artifact)
    }

    /// Atomically persist a freshly trained artifact and make it current.
    pub fn publish(&self, artifact: ModelArtifact) -> Result<(), MlError> {
        let path = self.artifact_path(artifact.kind, artifact.category);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_vec(&artifact)
            .map_err(|e| MlError::Persistence(format!("serialize artifact: {e}")))?;
        fs::write(&tmp, json)
            .map_err(|e| MlError::Persistence(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| MlError::Persistence(format!("rename {}: {e}", path.display())))?;

        let key = (artifact.kind, artifact.category);
        info!(kind = %artifact.kind, category = %artifact.category,
              samples = artifact.samples_count, "published model artifact");
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, Arc::new(artifact));
        }
        Ok(())
    }

    /// Drop the cached entry so the next `get` re-reads the disk artifact.
    pub fn invalidate(&self, kind: ClassifierKind, category: BetCategory) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(&(kind, category));
        }
    }
}

fn load_artifact(path: &Path) -> Result<Option<ModelArtifact>, MlError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MlError::Persistence(format!("read {}: {e}", path.display()))),
    };
    let artifact = serde_json::from_slice(&bytes)
        .map_err(|e| MlError::Persistence(format!("parse {}: {e}", path.display())))?;
    Ok(Some(artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FittedModel, LogisticModel};
    use chrono::Utc;

    fn artifact(kind: ClassifierKind, category: BetCategory, samples: usize) -> ModelArtifact {
        ModelArtifact {
            kind,
            category,
            feature_order: vec!["home_win_rate".into()],
            samples_count: samples,
            trained_at: Utc::now(),
            model: FittedModel::Logistic(LogisticModel {
                weights: vec![0.4],
                bias: -0.1,
                means: vec![50.0],
                stds: vec![10.0],
            }),
        }
    }

    #[test]
    fn publish_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();

        registry
            .publish(artifact(ClassifierKind::Logistic, BetCategory::HomeWin, 120))
            .unwrap();
        let got = registry
            .get(ClassifierKind::Logistic, BetCategory::HomeWin)
            .expect("published artifact should be retrievable");
        assert_eq!(got.samples_count, 120);
    }

    #[test]
    fn get_survives_a_cold_cache() {
        let dir = tempfile::tempdir().unwrap();
        {
            let registry = ModelRegistry::new(dir.path()).unwrap();
            registry
                .publish(artifact(ClassifierKind::Logistic, BetCategory::Draw, 75))
                .unwrap();
        }
        // Fresh registry, empty cache: must lazy-load from disk.
        let registry = ModelRegistry::new(dir.path()).unwrap();
        let got = registry
            .get(ClassifierKind::Logistic, BetCategory::Draw)
            .expect("artifact should load from disk");
        assert_eq!(got.samples_count, 75);
    }

    #[test]
    fn missing_pair_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        assert!(registry
            .get(ClassifierKind::RandomForest, BetCategory::OverTotal)
            .is_none());
    }

    #[test]
    fn publish_supersedes_the_cached_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();

        registry
            .publish(artifact(ClassifierKind::Logistic, BetCategory::HomeWin, 60))
            .unwrap();
        registry
            .publish(artifact(ClassifierKind::Logistic, BetCategory::HomeWin, 90))
            .unwrap();
        let got = registry
            .get(ClassifierKind::Logistic, BetCategory::HomeWin)
            .unwrap();
        assert_eq!(got.samples_count, 90);
    }

    #[test]
    fn invalidate_forces_a_disk_reload() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        registry
            .publish(artifact(ClassifierKind::Logistic, BetCategory::HomeWin, 60))
            .unwrap();
        registry.invalidate(ClassifierKind::Logistic, BetCategory::HomeWin);
        let got = registry
            .get(ClassifierKind::Logistic, BetCategory::HomeWin)
            .expect("disk artifact still present after invalidate");
        assert_eq!(got.samples_count, 60);
    }

    #[test]
    fn corrupt_artifact_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        let path = dir.path().join("logistic_home_win.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(registry
            .get(ClassifierKind::Logistic, BetCategory::HomeWin)
            .is_none());
    }
}

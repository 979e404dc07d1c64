use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::artifacts::contract::FeatureContract;
use crate::artifacts::model::ClassifierModel;
use crate::artifacts::transform::PreprocessingTransform;
use crate::artifacts::{ArtifactDigest, ArtifactKind, ArtifactSet};
use crate::category::SmellCategory;
use crate::error::{PipelineError, Result};

/// Read-through cache of artifact sets, one per smell category.
///
/// Layout on disk is `<base_dir>/<category>/{preprocessing_pipeline,
/// selected_features,final_model}.json`. Each category is loaded at most
/// once concurrently: first loads serialize on a per-category lock, cached
/// reads only take the shared read lock. Failed loads are not cached.
#[derive(Debug)]
pub struct ArtifactStore {
    base_dir: PathBuf,
    cache: RwLock<HashMap<SmellCategory, Arc<ArtifactSet>>>,
    loading: Mutex<HashMap<SmellCategory, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn category_dir(&self, category: &SmellCategory) -> PathBuf {
        self.base_dir.join(category.as_str())
    }

    /// Returns the cached set for `category`, if already loaded.
    pub fn cached(&self, category: &SmellCategory) -> Option<Arc<ArtifactSet>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
            .cloned()
    }

    /// Registers an already-built set, replacing any cached one.
    pub fn insert(&self, set: ArtifactSet) -> Arc<ArtifactSet> {
        let set = Arc::new(set);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(set.category.clone(), Arc::clone(&set));
        set
    }

    /// Loads the artifact triple for `category`, from cache when possible.
    pub fn load(&self, category: &SmellCategory) -> Result<Arc<ArtifactSet>> {
        if let Some(set) = self.cached(category) {
            return Ok(set);
        }

        let key_lock = Arc::clone(
            self.loading
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(category.clone())
                .or_default(),
        );
        let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished loading while we waited.
        if let Some(set) = self.cached(category) {
            return Ok(set);
        }

        let set = load_from_dir(category, &self.category_dir(category))?;
        info!(
            category = %category,
            model = set.model.kind(),
            features = set.contract.len(),
            "loaded artifacts"
        );
        Ok(self.insert(set))
    }
}

struct RawArtifact {
    text: String,
    digest: ArtifactDigest,
}

fn read_artifact(category: &SmellCategory, kind: ArtifactKind, dir: &Path) -> Result<RawArtifact> {
    let path = dir.join(kind.file_name());
    let missing = |reason: String| PipelineError::ArtifactMissing {
        category: category.to_string(),
        artifact: kind,
        path: path.clone(),
        reason,
    };

    let bytes = fs::read(&path).map_err(|e| missing(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = ArtifactDigest {
        artifact: kind,
        algorithm: "sha256".to_string(),
        value: hex::encode(hasher.finalize()),
    };

    let text = String::from_utf8(bytes).map_err(|e| missing(format!("not UTF-8: {e}")))?;
    debug!(path = %path.display(), digest = %digest.value, "read artifact");
    Ok(RawArtifact { text, digest })
}

/// Loads and cross-validates the three artifacts in `dir`.
pub fn load_from_dir(category: &SmellCategory, dir: &Path) -> Result<ArtifactSet> {
    let invalid = |kind: ArtifactKind, reason: String| PipelineError::ArtifactMissing {
        category: category.to_string(),
        artifact: kind,
        path: dir.join(kind.file_name()),
        reason,
    };

    let features = read_artifact(category, ArtifactKind::SelectedFeatures, dir)?;
    let contract = FeatureContract::from_json(&features.text)
        .map_err(|e| invalid(ArtifactKind::SelectedFeatures, e))?;

    let pipeline = read_artifact(category, ArtifactKind::PreprocessingPipeline, dir)?;
    let transform = PreprocessingTransform::from_json(&pipeline.text)
        .map_err(|e| invalid(ArtifactKind::PreprocessingPipeline, e))?;
    transform
        .validate(&contract)
        .map_err(|e| invalid(ArtifactKind::PreprocessingPipeline, e))?;

    let final_model = read_artifact(category, ArtifactKind::FinalModel, dir)?;
    let model = ClassifierModel::from_json(&final_model.text)
        .map_err(|e| invalid(ArtifactKind::FinalModel, e))?;
    model
        .validate(contract.len())
        .map_err(|e| invalid(ArtifactKind::FinalModel, e))?;

    Ok(ArtifactSet {
        category: category.clone(),
        transform,
        contract,
        model: Arc::new(model),
        digests: vec![pipeline.digest, features.digest, final_model.digest],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FEATURES: &str = r#"["wmc", "cbo"]"#;
    const PIPELINE: &str = r#"{"steps": [{"kind": "standard_scaler", "mean": [10.0, 2.0], "scale": [5.0, 1.0]}]}"#;
    const MODEL: &str = r#"{"kind": "logistic_regression", "coef": [1.0, 1.0], "intercept": 0.0}"#;

    fn category(id: &str) -> SmellCategory {
        SmellCategory::new(id).unwrap()
    }

    fn write_set(root: &Path, id: &str, files: &[(ArtifactKind, &str)]) {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        for (kind, contents) in files {
            fs::write(dir.join(kind.file_name()), contents).unwrap();
        }
    }

    fn full_set(root: &Path, id: &str) {
        write_set(
            root,
            id,
            &[
                (ArtifactKind::SelectedFeatures, FEATURES),
                (ArtifactKind::PreprocessingPipeline, PIPELINE),
                (ArtifactKind::FinalModel, MODEL),
            ],
        );
    }

    #[test]
    fn loads_triple_with_digests() {
        let root = TempDir::new().unwrap();
        full_set(root.path(), "god-class");

        let store = ArtifactStore::new(root.path());
        let set = store.load(&category("god-class")).expect("artifacts load");

        assert_eq!(set.contract.features(), &["wmc", "cbo"]);
        assert_eq!(set.model.kind(), "logistic_regression");
        assert_eq!(set.digests.len(), 3);
        assert!(set.digests.iter().all(|d| d.value.len() == 64));
    }

    #[test]
    fn second_load_is_served_from_cache() {
        let root = TempDir::new().unwrap();
        full_set(root.path(), "god-class");
        let store = ArtifactStore::new(root.path());

        let first = store.load(&category("god-class")).unwrap();
        // Removing the files must not matter once cached.
        fs::remove_dir_all(root.path().join("god-class")).unwrap();
        let second = store.load(&category("god-class")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_file_names_the_artifact() {
        let root = TempDir::new().unwrap();
        write_set(
            root.path(),
            "god-class",
            &[
                (ArtifactKind::SelectedFeatures, FEATURES),
                (ArtifactKind::PreprocessingPipeline, PIPELINE),
            ],
        );

        let err = ArtifactStore::new(root.path())
            .load(&category("god-class"))
            .unwrap_err();
        match err {
            PipelineError::ArtifactMissing { artifact, path, .. } => {
                assert_eq!(artifact, ArtifactKind::FinalModel);
                assert!(path.ends_with("god-class/final_model.json"));
            }
            other => panic!("expected ArtifactMissing, got {other:?}"),
        }
    }

    #[test]
    fn undeserializable_file_is_artifact_missing() {
        let root = TempDir::new().unwrap();
        write_set(
            root.path(),
            "god-class",
            &[
                (ArtifactKind::SelectedFeatures, "not json"),
                (ArtifactKind::PreprocessingPipeline, PIPELINE),
                (ArtifactKind::FinalModel, MODEL),
            ],
        );
        let err = ArtifactStore::new(root.path())
            .load(&category("god-class"))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ArtifactMissing {
                artifact: ArtifactKind::SelectedFeatures,
                ..
            }
        ));
    }

    #[test]
    fn model_width_must_match_contract() {
        let root = TempDir::new().unwrap();
        write_set(
            root.path(),
            "god-class",
            &[
                (ArtifactKind::SelectedFeatures, r#"["wmc", "cbo", "loc"]"#),
                (
                    ArtifactKind::PreprocessingPipeline,
                    r#"{"columns": "numeric", "steps": []}"#,
                ),
                (ArtifactKind::FinalModel, MODEL),
            ],
        );
        let err = ArtifactStore::new(root.path())
            .load(&category("god-class"))
            .unwrap_err();
        assert!(err.to_string().contains("coefficients"), "{err}");
    }

    #[test]
    fn failure_for_one_category_does_not_affect_another() {
        let root = TempDir::new().unwrap();
        full_set(root.path(), "long-method");
        let store = ArtifactStore::new(root.path());

        assert!(store.load(&category("god-class")).is_err());
        assert!(store.load(&category("long-method")).is_ok());
        assert!(store.cached(&category("god-class")).is_none());
    }

    #[test]
    fn failed_loads_are_retried() {
        let root = TempDir::new().unwrap();
        let store = ArtifactStore::new(root.path());
        assert!(store.load(&category("god-class")).is_err());

        full_set(root.path(), "god-class");
        assert!(store.load(&category("god-class")).is_ok());
    }

    #[test]
    fn concurrent_first_loads_share_one_set() {
        let root = TempDir::new().unwrap();
        full_set(root.path(), "god-class");
        let store = ArtifactStore::new(root.path());
        let cat = category("god-class");

        let sets: Vec<Arc<ArtifactSet>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| store.load(&cat).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(sets.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}

//! Model artifact loader with a load-once cache

use crate::config::ArtifactConfig;
use crate::error::ArtifactLoadError;
use crate::models::artifact::{Classifier, ModelArtifact};
use crate::models::forest::{ForestSpec, RandomForest};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// On-disk layout of the artifact bundle
#[derive(Debug, Deserialize)]
struct ArtifactFile {
    model: ModelSpec,
    features: Vec<String>,
    classes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelSpec {
    RandomForest(ForestSpec),
    Onnx {
        /// Relative to the artifact file's directory
        path: PathBuf,
        #[serde(default)]
        feature_importances: Option<Vec<f64>>,
    },
}

/// Reads and validates artifact files
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Read an artifact file and build the bundle it describes
    pub fn load_artifact<P: AsRef<Path>>(&self, path: P) -> Result<ModelArtifact, ArtifactLoadError> {
        let path = path.as_ref();

        info!(path = %path.display(), "Loading model artifact");

        let bytes = std::fs::read(path).map_err(|source| ArtifactLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ArtifactFile =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactLoadError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let model = self.build_model(file.model, base_dir, file.classes.len())?;
        let kind = model.kind();
        let artifact = ModelArtifact::new(model, file.features, file.classes)?;

        info!(
            model = kind,
            features = artifact.features().len(),
            classes = ?artifact.classes(),
            "Model artifact loaded"
        );

        Ok(artifact)
    }

    fn build_model(
        &self,
        spec: ModelSpec,
        base_dir: &Path,
        n_classes: usize,
    ) -> Result<Box<dyn Classifier>, ArtifactLoadError> {
        match spec {
            ModelSpec::RandomForest(forest) => {
                let forest = RandomForest::from_spec(forest)?;
                info!(trees = forest.num_trees(), "Random forest validated");
                Ok(Box::new(forest))
            }
            #[cfg(feature = "onnx")]
            ModelSpec::Onnx {
                path,
                feature_importances,
            } => {
                let classifier = crate::models::onnx::OnnxClassifier::load(
                    base_dir.join(path),
                    n_classes,
                    self.onnx_threads,
                    feature_importances,
                )?;
                Ok(Box::new(classifier))
            }
            #[cfg(not(feature = "onnx"))]
            ModelSpec::Onnx { .. } => {
                let _ = (base_dir, n_classes);
                Err(ArtifactLoadError::UnsupportedModel("onnx".to_string()))
            }
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-lifetime home of the loaded artifact.
///
/// `load` reads the configured file on first use only. Concurrent first
/// callers block on the same initialization; a failed load leaves the store
/// empty so the error is reported again on the next call.
#[derive(Debug)]
pub struct ArtifactStore {
    path: PathBuf,
    loader: ModelLoader,
    artifact: OnceCell<Arc<ModelArtifact>>,
    reads: AtomicUsize,
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(path: P, loader: ModelLoader) -> Self {
        Self {
            path: path.into(),
            loader,
            artifact: OnceCell::new(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self::new(&config.path, ModelLoader::with_threads(config.onnx_threads))
    }

    /// Return the cached artifact, loading it on first access
    pub fn load(&self) -> Result<Arc<ModelArtifact>, ArtifactLoadError> {
        self.artifact
            .get_or_try_init(|| {
                self.reads.fetch_add(1, Ordering::SeqCst);
                self.loader.load_artifact(&self.path).map(Arc::new)
            })
            .cloned()
    }

    /// Whether the artifact has been loaded
    pub fn is_loaded(&self) -> bool {
        self.artifact.get().is_some()
    }

    /// Number of times the artifact file has been read
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}


#[cfg(test)]
mod tests {
    use super::testing::PENGUIN_ARTIFACT;
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_artifact(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_artifact() {
        let file = write_artifact(PENGUIN_ARTIFACT);
        let artifact = ModelLoader::new().load_artifact(file.path()).unwrap();

        assert_eq!(artifact.features().len(), 7);
        assert_eq!(artifact.classes(), ["Adelie", "Chinstrap", "Gentoo"]);
        assert_eq!(artifact.model().kind(), "random_forest");
    }

    #[test]
    fn test_bundled_artifact_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/models/penguin_model.json");
        let artifact = ModelLoader::new().load_artifact(path).unwrap();

        assert_eq!(artifact.top_features(1)[0].0, "bill_length_mm");
        let raw = crate::types::RawInputs::new(40.0, 18.0, 200.0, 4000.0, "Dream", "Male");
        assert_eq!(crate::models::predict(&raw, &artifact).unwrap().label(), "Adelie");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ModelLoader::new()
            .load_artifact("/nonexistent/penguin_model.json")
            .unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Io { .. }));
    }

    #[test]
    fn test_corrupt_file_is_malformed() {
        let file = write_artifact("{ not json");
        let err = ModelLoader::new().load_artifact(file.path()).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Malformed { .. }));
    }

    #[test]
    fn test_missing_classes_field_is_malformed() {
        let value: serde_json::Value = serde_json::from_str(PENGUIN_ARTIFACT).unwrap();
        let mut object = value.as_object().unwrap().clone();
        object.remove("classes");
        let file = write_artifact(&serde_json::Value::Object(object).to_string());

        let err = ModelLoader::new().load_artifact(file.path()).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Malformed { .. }));
        assert!(err.to_string().contains("classes"));
    }

    #[test]
    fn test_unknown_model_kind_is_malformed() {
        let contents = PENGUIN_ARTIFACT.replace("\"random_forest\"", "\"svm\"");
        let file = write_artifact(&contents);
        let err = ModelLoader::new().load_artifact(file.path()).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Malformed { .. }));
    }

    #[test]
    fn test_feature_count_mismatch_is_invalid() {
        let contents = PENGUIN_ARTIFACT.replace("\"sex_male\"]", "\"sex_male\", \"year\"]");
        let file = write_artifact(&contents);
        let err = ModelLoader::new().load_artifact(file.path()).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Invalid(_)));
    }

    #[test]
    fn test_onnx_artifact_with_missing_graph() {
        let file = write_artifact(
            r#"{
                "model": {"kind": "onnx", "path": "nope.onnx"},
                "features": ["bill_length_mm", "bill_depth_mm", "flipper_length_mm", "body_mass_g",
                             "island_Dream", "island_Torgersen", "sex_male"],
                "classes": ["Adelie", "Chinstrap", "Gentoo"]
            }"#,
        );
        let err = ModelLoader::new().load_artifact(file.path()).unwrap_err();

        #[cfg(feature = "onnx")]
        match err {
            ArtifactLoadError::Onnx { path, .. } => assert!(path.ends_with("nope.onnx")),
            other => panic!("expected ONNX load error, got {other:?}"),
        }
        #[cfg(not(feature = "onnx"))]
        assert!(matches!(err, ArtifactLoadError::UnsupportedModel(_)));
    }

    #[test]
    fn test_store_loads_once() {
        let file = write_artifact(PENGUIN_ARTIFACT);
        let store = ArtifactStore::new(file.path(), ModelLoader::new());
        assert!(!store.is_loaded());

        let first = store.load().unwrap();
        let second = store.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.read_count(), 1);
        assert!(store.is_loaded());
    }

    #[test]
    fn test_store_concurrent_first_access() {
        let file = write_artifact(PENGUIN_ARTIFACT);
        let store = ArtifactStore::new(file.path(), ModelLoader::new());

        let loaded: Vec<Arc<ModelArtifact>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| store.load().unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(store.read_count(), 1);
        assert!(loaded.iter().all(|a| Arc::ptr_eq(a, &loaded[0])));
    }

    #[test]
    fn test_store_failed_load_is_not_cached() {
        let store = ArtifactStore::new("/nonexistent/penguin_model.json", ModelLoader::new());
        assert!(store.load().is_err());
        assert!(store.load().is_err());
        assert!(!store.is_loaded());
        assert_eq!(store.read_count(), 2);
    }
}

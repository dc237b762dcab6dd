//! Artifact loader: resolve the trained model and its feature schema from
//! disk, once per process.
//!
//! The first outcome, success or failure, is memoized. A failed load keeps
//! the forecast feature disabled until the process restarts; nothing is
//! refreshed mid-session.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::model::{ForecastModel, SeasonalRegressionModel};
use super::schema::FeatureSchema;

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Terminal artifact problems. Messages are shown to operators verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    #[error("Model file not found at {}.", .0.display())]
    ModelNotFound(PathBuf),
    #[error("Schema file not found at {}.", .0.display())]
    SchemaNotFound(PathBuf),
    #[error("Error loading artifacts: {0}")]
    Deserialization(String),
}

impl ArtifactError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModelNotFound(_) => "MODEL_NOT_FOUND",
            Self::SchemaNotFound(_) => "SCHEMA_NOT_FOUND",
            Self::Deserialization(_) => "ARTIFACT_UNREADABLE",
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loaded artifacts
// ═══════════════════════════════════════════════════════════

/// Where the two artifact files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub schema: PathBuf,
}

/// Model + schema, immutable once loaded.
pub struct LoadedArtifacts {
    model: Arc<dyn ForecastModel>,
    schema: FeatureSchema,
    /// SHA-256 of the model file, when it came from disk.
    fingerprint: Option<String>,
    loaded_at: DateTime<Utc>,
}

impl fmt::Debug for LoadedArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedArtifacts")
            .field("model_kind", &self.model.kind())
            .field("schema", &self.schema)
            .field("fingerprint", &self.fingerprint)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl LoadedArtifacts {
    /// Wrap an in-memory model (embedding, test doubles).
    pub fn new(model: Arc<dyn ForecastModel>, schema: FeatureSchema) -> Self {
        Self {
            model,
            schema,
            fingerprint: None,
            loaded_at: Utc::now(),
        }
    }

    pub fn model(&self) -> Arc<dyn ForecastModel> {
        Arc::clone(&self.model)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

fn read_text(path: &Path) -> Result<String, ArtifactError> {
    std::fs::read_to_string(path)
        .map_err(|e| ArtifactError::Deserialization(format!("{}: {e}", path.display())))
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Read, parse and cross-check both artifacts.
///
/// Check order: model exists → model parses → schema exists → schema parses.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<LoadedArtifacts, ArtifactError> {
    if !paths.model.exists() {
        return Err(ArtifactError::ModelNotFound(paths.model.clone()));
    }
    let model_raw = read_text(&paths.model)?;
    let model = SeasonalRegressionModel::from_json(&model_raw)
        .map_err(|e| ArtifactError::Deserialization(format!("{}: {e}", paths.model.display())))?;

    if !paths.schema.exists() {
        return Err(ArtifactError::SchemaNotFound(paths.schema.clone()));
    }
    let schema_raw = read_text(&paths.schema)?;
    let schema = FeatureSchema::from_json(&schema_raw)
        .map_err(|e| ArtifactError::Deserialization(format!("{}: {e}", paths.schema.display())))?;

    if let Some(width) = model.exog_width() {
        if width != schema.len() {
            return Err(ArtifactError::Deserialization(format!(
                "model expects {width} exogenous columns but schema lists {}",
                schema.len()
            )));
        }
    }
    if !model.exog_names().is_empty() && model.exog_names() != schema.columns() {
        return Err(ArtifactError::Deserialization(
            "model exogenous names disagree with the schema column order".into(),
        ));
    }

    Ok(LoadedArtifacts {
        model: Arc::new(model),
        schema,
        fingerprint: Some(sha256_hex(model_raw.as_bytes())),
        loaded_at: Utc::now(),
    })
}

// ═══════════════════════════════════════════════════════════
// Load-once store
// ═══════════════════════════════════════════════════════════

enum Source {
    Disk(ArtifactPaths),
    Preloaded,
}

/// Memoized artifact access shared by every request.
///
/// Concurrent first callers block on the same initialization and all
/// observe the same `Arc`.
pub struct ArtifactStore {
    source: Source,
    cell: OnceLock<Result<Arc<LoadedArtifacts>, ArtifactError>>,
}

impl ArtifactStore {
    /// Store that reads from disk on first use.
    pub fn from_paths(paths: ArtifactPaths) -> Self {
        Self {
            source: Source::Disk(paths),
            cell: OnceLock::new(),
        }
    }

    /// Store around artifacts that are already in memory.
    pub fn preloaded(artifacts: LoadedArtifacts) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(Arc::new(artifacts)));
        Self {
            source: Source::Preloaded,
            cell,
        }
    }

    /// Loaded artifacts, loading on first call.
    pub fn get(&self) -> Result<Arc<LoadedArtifacts>, ArtifactError> {
        self.cell.get_or_init(|| self.load()).clone()
    }

    /// Whether the first load has already happened.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn paths(&self) -> Option<&ArtifactPaths> {
        match &self.source {
            Source::Disk(paths) => Some(paths),
            Source::Preloaded => None,
        }
    }

    fn load(&self) -> Result<Arc<LoadedArtifacts>, ArtifactError> {
        let Source::Disk(paths) = &self.source else {
            return Err(ArtifactError::Deserialization(
                "no artifact source configured".into(),
            ));
        };

        match load_artifacts(paths) {
            Ok(artifacts) => {
                tracing::info!(
                    model = %paths.model.display(),
                    schema = %paths.schema.display(),
                    columns = artifacts.schema.len(),
                    fingerprint = artifacts.fingerprint.as_deref().unwrap_or("-"),
                    "Forecast artifacts loaded"
                );
                Ok(Arc::new(artifacts))
            }
            Err(e) => {
                tracing::error!(code = e.code(), error = %e, "Forecast artifacts unavailable");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_artifacts, FixedModel, MODEL_JSON, SCHEMA_JSON};

    fn store_in(dir: &Path) -> ArtifactStore {
        let (model, schema) = write_artifacts(dir, MODEL_JSON, SCHEMA_JSON);
        ArtifactStore::from_paths(ArtifactPaths { model, schema })
    }

    #[test]
    fn loads_model_and_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let artifacts = store.get().unwrap();
        assert_eq!(artifacts.schema().len(), 7);
        assert_eq!(artifacts.model().kind(), "seasonal_regression");
        assert_eq!(artifacts.fingerprint().map(str::len), Some(64));
    }

    #[test]
    fn missing_model_reports_model_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            model: tmp.path().join("model/sarimax_model.json"),
            schema: tmp.path().join("model/sarimax_schema.json"),
        };
        let err = load_artifacts(&paths).unwrap_err();
        assert_eq!(err, ArtifactError::ModelNotFound(paths.model.clone()));
        assert!(err.to_string().starts_with("Model file not found at "));
        assert_eq!(err.code(), "MODEL_NOT_FOUND");
    }

    #[test]
    fn missing_schema_reports_schema_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let (model, schema) = write_artifacts(tmp.path(), MODEL_JSON, SCHEMA_JSON);
        std::fs::remove_file(&schema).unwrap();
        let err = load_artifacts(&ArtifactPaths { model, schema: schema.clone() }).unwrap_err();
        assert_eq!(err, ArtifactError::SchemaNotFound(schema));
        assert_eq!(err.code(), "SCHEMA_NOT_FOUND");
    }

    #[test]
    fn corrupt_model_is_deserialization_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (model, schema) = write_artifacts(tmp.path(), "\u{80}\u{3}pickled", SCHEMA_JSON);
        let err = load_artifacts(&ArtifactPaths { model, schema }).unwrap_err();
        assert!(matches!(err, ArtifactError::Deserialization(_)));
        assert!(err.to_string().starts_with("Error loading artifacts:"));
    }

    #[test]
    fn corrupt_schema_is_deserialization_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (model, schema) = write_artifacts(tmp.path(), MODEL_JSON, "{not json");
        let err = load_artifacts(&ArtifactPaths { model, schema }).unwrap_err();
        assert_eq!(err.code(), "ARTIFACT_UNREADABLE");
    }

    #[test]
    fn schema_width_must_match_model() {
        let tmp = tempfile::tempdir().unwrap();
        let (model, schema) =
            write_artifacts(tmp.path(), MODEL_JSON, r#"["occupancy_rate_lag1"]"#);
        let err = load_artifacts(&ArtifactPaths { model, schema }).unwrap_err();
        assert!(err.to_string().contains("7 exogenous columns"));
    }

    #[test]
    fn second_get_does_not_touch_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let first = store.get().unwrap();

        std::fs::remove_dir_all(tmp.path().join("model")).unwrap();
        let second = store.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failure_is_memoized_too() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            model: tmp.path().join("model/sarimax_model.json"),
            schema: tmp.path().join("model/sarimax_schema.json"),
        };
        let store = ArtifactStore::from_paths(paths);
        assert!(matches!(store.get(), Err(ArtifactError::ModelNotFound(_))));

        // Files appearing later are not picked up until restart.
        write_artifacts(tmp.path(), MODEL_JSON, SCHEMA_JSON);
        assert!(matches!(store.get(), Err(ArtifactError::ModelNotFound(_))));
    }

    #[test]
    fn concurrent_first_loads_share_one_instance() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(tmp.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.get().unwrap())
            })
            .collect();
        let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn preloaded_store_serves_in_memory_model() {
        let schema = FeatureSchema::new(["x"]).unwrap();
        let store = ArtifactStore::preloaded(LoadedArtifacts::new(
            Arc::new(FixedModel::new(vec![1.0])),
            schema,
        ));
        assert!(store.is_resolved());
        assert!(store.paths().is_none());
        let artifacts = store.get().unwrap();
        assert_eq!(artifacts.model().kind(), "fixed");
        assert!(artifacts.fingerprint().is_none());
    }
}

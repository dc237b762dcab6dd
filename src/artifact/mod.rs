//! Persisted forecasting artifacts: the fitted model and its feature schema.

pub mod loader;
pub mod model;
pub mod schema;

pub use loader::{load_artifacts, ArtifactError, ArtifactPaths, ArtifactStore, LoadedArtifacts};
pub use model::{ForecastModel, ModelFault, SeasonalRegressionModel};
pub use schema::{FeatureSchema, SchemaError};

//! Forecast serving: request validation, matrix building, model execution
//! and capacity-risk classification.

pub mod executor;
pub mod matrix;
pub mod request;
pub mod risk;
pub mod service;

pub use executor::{post_process, ExecutionPolicy, ForecastExecutor, PredictionError};
pub use matrix::{build_matrix, FeatureMatrix};
pub use request::{
    FeatureSnapshot, ForecastRequest, ValidatedRequest, ValidationError, Ward, MAX_STEPS,
};
pub use risk::{mean_admissions, RiskPolicy, RiskThresholds, RiskTier};
pub use service::{ForecastOutcome, ForecastPoint, ForecastService};

use thiserror::Error;

use crate::artifact::ArtifactError;

/// Any reason a forecast request did not produce a result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl ForecastError {
    /// Stable machine-readable code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Artifact(e) => e.code(),
            Self::Validation(ValidationError::OutOfRange { .. }) => "OUT_OF_RANGE",
            Self::Validation(ValidationError::UnknownWard(_)) => "UNKNOWN_WARD",
            Self::Validation(ValidationError::InvalidDate(_)) => "INVALID_DATE",
            Self::Validation(ValidationError::MissingField(_)) => "MISSING_FIELD",
            Self::Prediction(PredictionError::ShapeMismatch(_)) => "SHAPE_MISMATCH",
            Self::Prediction(PredictionError::ModelInternal(_)) => "MODEL_INTERNAL",
            Self::Prediction(PredictionError::Timeout(_)) => "PREDICTION_TIMEOUT",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn every_failure_kind_has_a_distinct_code() {
        let errors = [
            ForecastError::from(ArtifactError::ModelNotFound(PathBuf::from("m"))),
            ArtifactError::SchemaNotFound(PathBuf::from("s")).into(),
            ArtifactError::Deserialization("x".into()).into(),
            ValidationError::OutOfRange { field: "steps", reason: "x".into() }.into(),
            ValidationError::UnknownWard("x".into()).into(),
            ValidationError::InvalidDate("x".into()).into(),
            ValidationError::MissingField("hospital").into(),
            PredictionError::ShapeMismatch("x".into()).into(),
            PredictionError::ModelInternal("x".into()).into(),
            PredictionError::Timeout(Duration::from_secs(1)).into(),
        ];
        let mut codes: Vec<_> = errors.iter().map(ForecastError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_pass_through_unchanged() {
        let err: ForecastError = PredictionError::ModelInternal("singular matrix".into()).into();
        assert_eq!(err.to_string(), "Model internal error: singular matrix");
    }
}

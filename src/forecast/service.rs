//! Request → outcome orchestration.
//!
//! artifacts → validate → build matrix → execute → classify. Artifacts are
//! resolved first so a failed load never reaches the model.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::executor::ForecastExecutor;
use super::matrix::build_matrix;
use super::request::{ForecastRequest, ValidatedRequest, Ward};
use super::risk::{mean_admissions, RiskPolicy, RiskTier};
use super::ForecastError;
use crate::artifact::{ArtifactError, ArtifactStore, LoadedArtifacts};

/// One forecast day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub admissions: u32,
}

/// Everything the dashboard renders for one submitted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutcome {
    pub hospital: String,
    pub ward: Ward,
    pub start_date: NaiveDate,
    pub forecast: Vec<u32>,
    pub points: Vec<ForecastPoint>,
    pub total_admissions: u64,
    pub mean_admissions: f64,
    pub risk_tier: RiskTier,
    /// Horizon of one day: render as a single figure, not a chart.
    pub single_day: bool,
    pub generated_at: DateTime<Utc>,
}

impl ForecastOutcome {
    fn new(request: &ValidatedRequest, forecast: Vec<u32>, risk_tier: RiskTier) -> Self {
        let points = request
            .start_date
            .iter_days()
            .zip(&forecast)
            .map(|(date, admissions)| ForecastPoint {
                date,
                admissions: *admissions,
            })
            .collect();

        Self {
            hospital: request.hospital.clone(),
            ward: request.ward,
            start_date: request.start_date,
            total_admissions: forecast.iter().map(|v| u64::from(*v)).sum(),
            mean_admissions: mean_admissions(&forecast),
            single_day: forecast.len() == 1,
            forecast,
            points,
            risk_tier,
            generated_at: Utc::now(),
        }
    }
}

/// Stateless apart from the shared, immutable artifacts.
pub struct ForecastService {
    artifacts: Arc<ArtifactStore>,
    executor: ForecastExecutor,
    risk: RiskPolicy,
}

impl ForecastService {
    pub fn new(artifacts: ArtifactStore, executor: ForecastExecutor, risk: RiskPolicy) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
            executor,
            risk,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Resolved artifacts, loading them off the async runtime on first use.
    pub async fn artifacts_ready(&self) -> Result<Arc<LoadedArtifacts>, ArtifactError> {
        if self.artifacts.is_resolved() {
            return self.artifacts.get();
        }
        let store = Arc::clone(&self.artifacts);
        tokio::task::spawn_blocking(move || store.get())
            .await
            .map_err(|e| ArtifactError::Deserialization(format!("artifact load task failed: {e}")))?
    }

    pub fn risk_policy(&self) -> &RiskPolicy {
        &self.risk
    }

    pub fn executor(&self) -> &ForecastExecutor {
        &self.executor
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastOutcome, ForecastError> {
        let artifacts = self.artifacts_ready().await?;
        let validated = request.validate()?;

        let matrix = build_matrix(&validated.snapshot, artifacts.schema(), validated.steps)?;
        let forecast = self
            .executor
            .run(artifacts.model(), matrix, validated.steps)
            .await?;

        let risk_tier = self.risk.classify(validated.ward, &forecast);
        tracing::info!(
            hospital = %validated.hospital,
            ward = %validated.ward,
            steps = validated.steps,
            risk = ?risk_tier,
            "Forecast generated"
        );

        Ok(ForecastOutcome::new(&validated, forecast, risk_tier))
    }
}

//! Forecast executor: invoke the model, post-process, all-or-nothing.
//!
//! The model call is synchronous CPU work, so it runs on the blocking pool
//! under a deadline. Only `ModelFault::Transient` is retried; shape and
//! internal faults fail the request immediately.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::matrix::FeatureMatrix;
use crate::artifact::{ForecastModel, ModelFault};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

/// Deadline and retry budget for a single forecast. The deadline covers
/// every attempt and backoff of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionPolicy {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl ExecutionPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Why a forecast could not be produced. No partial result accompanies it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Model internal error: {0}")]
    ModelInternal(String),
    #[error("Model did not answer within {} ms", .0.as_millis())]
    Timeout(Duration),
}

impl From<ModelFault> for PredictionError {
    fn from(fault: ModelFault) -> Self {
        match fault {
            ModelFault::ShapeMismatch(detail) => Self::ShapeMismatch(detail),
            ModelFault::Internal(detail) => Self::ModelInternal(detail),
            ModelFault::Transient(detail) => Self::ModelInternal(detail),
        }
    }
}

/// Runs one forecast per call; holds no per-request state.
#[derive(Debug, Clone, Default)]
pub struct ForecastExecutor {
    policy: ExecutionPolicy,
}

impl ForecastExecutor {
    pub fn new(policy: ExecutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Forecast `horizon` days and return non-negative integer admissions.
    pub async fn run(
        &self,
        model: Arc<dyn ForecastModel>,
        matrix: FeatureMatrix,
        horizon: usize,
    ) -> Result<Vec<u32>, PredictionError> {
        if matrix.row_count() != horizon {
            return Err(PredictionError::ShapeMismatch(format!(
                "matrix has {} rows for a {horizon}-day horizon",
                matrix.row_count()
            )));
        }

        let matrix = Arc::new(matrix);
        let deadline = Instant::now() + self.policy.timeout();
        let mut attempt: u32 = 0;
        loop {
            let outcome = self
                .invoke_once(Arc::clone(&model), Arc::clone(&matrix), horizon, deadline)
                .await?;
            match outcome {
                Ok(raw) => return post_process(&raw, horizon),
                Err(ModelFault::Transient(detail)) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    if Instant::now() + self.policy.retry_backoff() >= deadline {
                        tracing::error!(
                            attempt,
                            timeout_ms = self.policy.timeout_ms,
                            error = %detail,
                            "No time left to retry transient model failure"
                        );
                        return Err(PredictionError::Timeout(self.policy.timeout()));
                    }
                    tracing::warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        error = %detail,
                        "Transient model failure, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_backoff()).await;
                }
                Err(ModelFault::Transient(detail)) => {
                    return Err(PredictionError::ModelInternal(format!(
                        "transient failure persisted after {} attempts: {detail}",
                        attempt + 1
                    )));
                }
                Err(fault) => return Err(fault.into()),
            }
        }
    }

    /// One model call bounded by the request deadline. The outer error is
    /// terminal, the inner one is the model's own verdict.
    async fn invoke_once(
        &self,
        model: Arc<dyn ForecastModel>,
        matrix: Arc<FeatureMatrix>,
        horizon: usize,
        deadline: Instant,
    ) -> Result<Result<Vec<f64>, ModelFault>, PredictionError> {
        let task = tokio::task::spawn_blocking(move || model.forecast(horizon, &matrix));

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(join_err)) => Err(PredictionError::ModelInternal(format!(
                "model task failed: {join_err}"
            ))),
            Err(_) => {
                tracing::error!(timeout_ms = self.policy.timeout_ms, "Model call timed out");
                Err(PredictionError::Timeout(self.policy.timeout()))
            }
        }
    }
}

/// Round half away from zero, then clamp at zero.
///
/// Admission counts are never negative; a model that returns the wrong
/// number of values or a non-finite value fails the whole request.
pub fn post_process(raw: &[f64], horizon: usize) -> Result<Vec<u32>, PredictionError> {
    if raw.len() != horizon {
        return Err(PredictionError::ShapeMismatch(format!(
            "model returned {} values for a {horizon}-day horizon",
            raw.len()
        )));
    }
    raw.iter()
        .map(|value| {
            if !value.is_finite() {
                return Err(PredictionError::ModelInternal(format!(
                    "model produced non-finite value {value}"
                )));
            }
            let rounded = value.round().max(0.0);
            if rounded > f64::from(u32::MAX) {
                return Err(PredictionError::ModelInternal(format!(
                    "model produced out-of-range value {value}"
                )));
            }
            Ok(rounded as u32)
        })
        .collect()
}

//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::core_state::ArtifactStatus;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// False when the artifacts could not be loaded; the dashboard keeps
    /// rendering but disables forecast submission.
    pub forecast_enabled: bool,
    pub artifact: ArtifactStatus,
}

/// `GET /api/health`: always 200; artifact problems show as `degraded`.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let core = ctx.core.clone();
    let artifact = tokio::task::spawn_blocking(move || core.artifact_status())
        .await
        .unwrap_or_else(|e| ArtifactStatus::Unavailable {
            error: crate::core_state::StatusError {
                code: "INTERNAL",
                message: format!("artifact status task failed: {e}"),
            },
        });

    let forecast_enabled = artifact.is_ready();
    Json(HealthResponse {
        status: if forecast_enabled { "ok" } else { "degraded" },
        version: crate::config::APP_VERSION,
        forecast_enabled,
        artifact,
    })
}

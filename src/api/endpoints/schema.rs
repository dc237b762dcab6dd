//! Feature schema endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::forecast::{ForecastError, Ward, MAX_STEPS};

#[derive(Serialize)]
pub struct SchemaResponse {
    pub columns: Vec<String>,
    pub model_kind: &'static str,
    pub fingerprint: Option<String>,
    pub wards: Vec<&'static str>,
    pub max_steps: i64,
}

/// `GET /api/schema`: the column order the model was trained on, plus
/// the input choices a form needs. 503 when artifacts are unavailable.
pub async fn columns(State(ctx): State<ApiContext>) -> Result<Json<SchemaResponse>, ApiError> {
    let artifacts = ctx
        .core
        .service()
        .artifacts_ready()
        .await
        .map_err(ForecastError::from)?;

    Ok(Json(SchemaResponse {
        columns: artifacts.schema().columns().to_vec(),
        model_kind: artifacts.model().kind(),
        fingerprint: artifacts.fingerprint().map(str::to_string),
        wards: Ward::ALL.iter().map(Ward::as_str).collect(),
        max_steps: MAX_STEPS,
    }))
}

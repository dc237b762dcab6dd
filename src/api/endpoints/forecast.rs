//! Forecast endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::forecast::{ForecastOutcome, ForecastRequest};

/// Body of `POST /predict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub forecast: Vec<u32>,
}

fn decode(payload: Result<Json<ForecastRequest>, JsonRejection>) -> Result<ForecastRequest, ApiError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `POST /api/forecast`: full outcome: dated points, totals, risk tier.
pub async fn forecast(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<ForecastOutcome>, ApiError> {
    let request = decode(payload)?;
    let outcome = ctx.core.forecast(&request).await?;
    Ok(Json(outcome))
}

/// `POST /predict`: bare admissions sequence.
pub async fn predict(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request = decode(payload)?;
    let outcome = ctx.core.forecast(&request).await?;
    Ok(Json(PredictResponse {
        forecast: outcome.forecast,
    }))
}

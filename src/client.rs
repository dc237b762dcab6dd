//! HTTP client for the forecast API, as used by a dashboard backend or
//! any other prototype consumer of `POST /predict`.

use std::time::Duration;

use serde::Deserialize;

use crate::forecast::{ForecastOutcome, ForecastRequest};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot reach forecast service at {0}")]
    Connection(String),
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
    #[error("Forecast service returned HTTP {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Unexpected response body: {0}")]
    Decode(String),
    #[error("Forecast service returned an empty forecast")]
    EmptyForecast,
    #[error("HTTP client error: {0}")]
    Http(String),
}

#[derive(Deserialize)]
struct PredictBody {
    forecast: Vec<u32>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorFields,
}

#[derive(Deserialize)]
struct ErrorFields {
    code: String,
    message: String,
}

/// Async client for a running forecast service.
pub struct ForecastClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ForecastClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Local service on the default port.
    pub fn default_local() -> Result<Self, ClientError> {
        Self::new("http://127.0.0.1:8000", DEFAULT_TIMEOUT_SECS)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /predict`: the bare admissions sequence. An empty sequence is
    /// an error, never a silent success.
    pub async fn predict(&self, request: &ForecastRequest) -> Result<Vec<u32>, ClientError> {
        let body: PredictBody = self.post("/predict", request).await?;
        if body.forecast.is_empty() {
            return Err(ClientError::EmptyForecast);
        }
        Ok(body.forecast)
    }

    /// `POST /api/forecast`: the full outcome with dates and risk tier.
    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastOutcome, ClientError> {
        let outcome: ForecastOutcome = self.post("/api/forecast", request).await?;
        if outcome.forecast.is_empty() {
            return Err(ClientError::EmptyForecast);
        }
        Ok(outcome)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        request: &ForecastRequest,
    ) -> Result<T, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
                Ok(envelope) => ClientError::Api {
                    status: status.as_u16(),
                    code: envelope.error.code,
                    message: envelope.error.message,
                },
                Err(_) => ClientError::Api {
                    status: status.as_u16(),
                    code: "UNKNOWN".into(),
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                },
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_connect() {
            ClientError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ClientError::Timeout(self.timeout_secs)
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

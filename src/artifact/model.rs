//! Forecasting model seam and the on-disk seasonal regression artifact.
//!
//! The service never trains anything. It receives a fitted
//! SARIMAX(p,0,0)(P,0,0)s-with-exogenous-regressors model as JSON and only
//! ever asks it one question: "given these N rows of exogenous features,
//! what are the next N values?"

use serde::Deserialize;

use crate::forecast::matrix::FeatureMatrix;

pub const SEASONAL_REGRESSION_FORMAT: &str = "seasonal_regression";

// ═══════════════════════════════════════════════════════════
// Seam
// ═══════════════════════════════════════════════════════════

/// Failure raised by a model while producing a forecast.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelFault {
    /// Input matrix does not match what the model was fitted on.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// Numerical or internal failure inside the model.
    #[error("{0}")]
    Internal(String),
    /// Infrastructure hiccup (remote backend unreachable, resource busy).
    /// The only fault class worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),
}

/// Anything that can turn an exogenous feature matrix into a forecast.
///
/// Implementations must be deterministic and must not mutate themselves:
/// one instance is shared read-only across concurrent requests.
pub trait ForecastModel: Send + Sync {
    /// Produce exactly `steps` raw forecast values, one per matrix row.
    fn forecast(&self, steps: usize, exog: &FeatureMatrix) -> Result<Vec<f64>, ModelFault>;

    /// Short label for health reporting.
    fn kind(&self) -> &'static str;

    /// Number of exogenous columns the model consumes, when known.
    fn exog_width(&self) -> Option<usize> {
        None
    }
}

// ═══════════════════════════════════════════════════════════
// Seasonal regression artifact
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct RawSeasonalRegression {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    exog_names: Vec<String>,
    intercept: f64,
    exog_coefficients: Vec<f64>,
    #[serde(default)]
    ar: Vec<f64>,
    #[serde(default)]
    seasonal_period: usize,
    #[serde(default)]
    seasonal_ar: Vec<f64>,
    #[serde(default)]
    residual_history: Vec<f64>,
}

/// Fitted linear regression on exogenous features with seasonal
/// autoregressive errors.
///
/// `y_t = intercept + β·x_t + e_t`, where
/// `e_t = Σ ar[i]·e_{t-1-i} + Σ seasonal_ar[j]·e_{t-(j+1)·s}`.
/// Lags reaching before `residual_history` contribute zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalRegressionModel {
    exog_names: Vec<String>,
    intercept: f64,
    exog_coefficients: Vec<f64>,
    ar: Vec<f64>,
    seasonal_period: usize,
    seasonal_ar: Vec<f64>,
    residual_history: Vec<f64>,
}

impl SeasonalRegressionModel {
    /// Parse and validate a serialized artifact.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let raw: RawSeasonalRegression =
            serde_json::from_str(raw).map_err(|e| format!("invalid model document: {e}"))?;

        if let Some(format) = raw.format.as_deref() {
            if format != SEASONAL_REGRESSION_FORMAT {
                return Err(format!("unsupported model format '{format}'"));
            }
        }

        let model = Self {
            exog_names: raw.exog_names,
            intercept: raw.intercept,
            exog_coefficients: raw.exog_coefficients,
            ar: raw.ar,
            seasonal_period: raw.seasonal_period,
            seasonal_ar: raw.seasonal_ar,
            residual_history: raw.residual_history,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.exog_names.is_empty() && self.exog_names.len() != self.exog_coefficients.len() {
            return Err(format!(
                "model lists {} exogenous names but {} coefficients",
                self.exog_names.len(),
                self.exog_coefficients.len()
            ));
        }
        if !self.seasonal_ar.is_empty() && self.seasonal_period == 0 {
            return Err("seasonal_ar terms require seasonal_period >= 1".into());
        }

        let all_finite = std::iter::once(&self.intercept)
            .chain(&self.exog_coefficients)
            .chain(&self.ar)
            .chain(&self.seasonal_ar)
            .chain(&self.residual_history)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("model parameters contain non-finite values".into());
        }
        Ok(())
    }

    pub fn exog_names(&self) -> &[String] {
        &self.exog_names
    }

    /// Residual forecast for the next step given everything seen so far.
    fn next_residual(&self, residuals: &[f64]) -> f64 {
        let n = residuals.len();
        let lag = |k: usize| if k <= n { residuals[n - k] } else { 0.0 };

        let short: f64 = self
            .ar
            .iter()
            .enumerate()
            .map(|(i, phi)| phi * lag(i + 1))
            .sum();
        let seasonal: f64 = self
            .seasonal_ar
            .iter()
            .enumerate()
            .map(|(j, big_phi)| big_phi * lag((j + 1) * self.seasonal_period))
            .sum();
        short + seasonal
    }
}

impl ForecastModel for SeasonalRegressionModel {
    fn forecast(&self, steps: usize, exog: &FeatureMatrix) -> Result<Vec<f64>, ModelFault> {
        if exog.column_count() != self.exog_coefficients.len() {
            return Err(ModelFault::ShapeMismatch(format!(
                "model expects {} exogenous columns, got {}",
                self.exog_coefficients.len(),
                exog.column_count()
            )));
        }
        if !self.exog_names.is_empty() && exog.columns() != self.exog_names.as_slice() {
            return Err(ModelFault::ShapeMismatch(
                "exogenous column names do not match the fitted model".into(),
            ));
        }
        if exog.row_count() != steps {
            return Err(ModelFault::ShapeMismatch(format!(
                "forecast of {steps} steps needs {steps} exogenous rows, got {}",
                exog.row_count()
            )));
        }

        let mut residuals = self.residual_history.clone();
        residuals.reserve(steps);
        let mut out = Vec::with_capacity(steps);

        for row in exog.rows() {
            let regression: f64 = self
                .exog_coefficients
                .iter()
                .zip(row)
                .map(|(beta, x)| beta * x)
                .sum();
            let e = self.next_residual(&residuals);
            let value = self.intercept + regression + e;
            if !value.is_finite() {
                return Err(ModelFault::Internal(
                    "forecast diverged to a non-finite value".into(),
                ));
            }
            residuals.push(e);
            out.push(value);
        }

        Ok(out)
    }

    fn kind(&self) -> &'static str {
        SEASONAL_REGRESSION_FORMAT
    }

    fn exog_width(&self) -> Option<usize> {
        Some(self.exog_coefficients.len())
    }
}

//! Shared test fixtures: model doubles, artifact files, sample requests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::artifact::{ForecastModel, ModelFault};
use crate::forecast::matrix::FeatureMatrix;
use crate::forecast::request::ForecastRequest;

pub const SCHEMA_JSON: &str = r#"["occupancy_rate_lag1","overflow_lag1","avg_wait_minutes_lag1","base_beds","effective_capacity","staffing_index","ward_ICU"]"#;

/// Fitted on the schema above. With the sample request's features
/// (ED ward) every step forecasts 1 + 6 + 2.1 + 0.9 = 10.
pub const MODEL_JSON: &str = r#"{
    "format": "seasonal_regression",
    "exog_names": ["occupancy_rate_lag1","overflow_lag1","avg_wait_minutes_lag1","base_beds","effective_capacity","staffing_index","ward_ICU"],
    "intercept": 1.0,
    "exog_coefficients": [10.0, 0.05, 0.0, 0.03, 0.0, 0.0, 8.0]
}"#;

pub fn sample_request() -> ForecastRequest {
    ForecastRequest {
        hospital: "Helsinki Central Hospital".into(),
        ward: "ED".into(),
        occupancy_rate_lag1: 0.6,
        overflow_lag1: 42.0,
        avg_wait_minutes_lag1: 227.0,
        base_beds: 30,
        effective_capacity: 34,
        staffing_index: 0.927,
        steps: 7,
        start_date: "2025-03-01".into(),
    }
}

/// Write schema + model into `dir/model/` and return (model, schema) paths.
pub fn write_artifacts(dir: &Path, model_json: &str, schema_json: &str) -> (PathBuf, PathBuf) {
    let model_dir = dir.join("model");
    std::fs::create_dir_all(&model_dir).unwrap();
    let model_path = model_dir.join("sarimax_model.json");
    let schema_path = model_dir.join("sarimax_schema.json");
    std::fs::write(&model_path, model_json).unwrap();
    std::fs::write(&schema_path, schema_json).unwrap();
    (model_path, schema_path)
}

/// `rows` identical rows over a single column.
pub fn matrix_of(rows: usize) -> FeatureMatrix {
    FeatureMatrix::from_rows(vec!["x".into()], vec![vec![1.0]; rows]).unwrap()
}

// ═══════════════════════════════════════════════════════════
// Model doubles
// ═══════════════════════════════════════════════════════════

/// Returns the same raw values regardless of input.
pub struct FixedModel {
    output: Vec<f64>,
    calls: AtomicUsize,
}

impl FixedModel {
    pub fn new(output: Vec<f64>) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ForecastModel for FixedModel {
    fn forecast(&self, _steps: usize, _exog: &FeatureMatrix) -> Result<Vec<f64>, ModelFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }

    fn kind(&self) -> &'static str {
        "fixed"
    }
}

/// Always fails with the given fault.
pub struct FaultyModel {
    fault: ModelFault,
    calls: AtomicUsize,
}

impl FaultyModel {
    pub fn new(fault: ModelFault) -> Self {
        Self {
            fault,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ForecastModel for FaultyModel {
    fn forecast(&self, _steps: usize, _exog: &FeatureMatrix) -> Result<Vec<f64>, ModelFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.fault.clone())
    }

    fn kind(&self) -> &'static str {
        "faulty"
    }
}

/// Fails transiently `failures` times, then succeeds. Each call can be
/// slowed down with [`FlakyModel::with_delay`].
pub struct FlakyModel {
    failures: usize,
    output: Vec<f64>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FlakyModel {
    pub fn new(failures: usize, output: Vec<f64>) -> Self {
        Self {
            failures,
            output,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ForecastModel for FlakyModel {
    fn forecast(&self, _steps: usize, _exog: &FeatureMatrix) -> Result<Vec<f64>, ModelFault> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if n < self.failures {
            return Err(ModelFault::Transient(format!("backend busy (call {})", n + 1)));
        }
        Ok(self.output.clone())
    }

    fn kind(&self) -> &'static str {
        "flaky"
    }
}

/// Sleeps before answering with zeros.
pub struct SlowModel {
    delay: Duration,
}

impl SlowModel {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ForecastModel for SlowModel {
    fn forecast(&self, steps: usize, _exog: &FeatureMatrix) -> Result<Vec<f64>, ModelFault> {
        std::thread::sleep(self.delay);
        Ok(vec![0.0; steps])
    }

    fn kind(&self) -> &'static str {
        "slow"
    }
}

//! Incoming forecast request, its validation, and the feature snapshot
//! derived from it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Longest horizon the dashboard offers.
pub const MAX_STEPS: i64 = 30;

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Per-request input problems, caught before the model is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
    #[error("Unknown ward '{0}' (expected one of ED, ICU, MED, SURG)")]
    UnknownWard(String),
    #[error("Invalid start date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("{0} is required")]
    MissingField(&'static str),
}

// ═══════════════════════════════════════════════════════════
// Ward
// ═══════════════════════════════════════════════════════════

/// Ward units the forecasting model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ward {
    #[serde(rename = "ED")]
    Emergency,
    #[serde(rename = "ICU")]
    IntensiveCare,
    #[serde(rename = "MED")]
    Medical,
    #[serde(rename = "SURG")]
    Surgical,
}

impl Ward {
    pub const ALL: [Ward; 4] = [
        Ward::Emergency,
        Ward::IntensiveCare,
        Ward::Medical,
        Ward::Surgical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "ED",
            Self::IntensiveCare => "ICU",
            Self::Medical => "MED",
            Self::Surgical => "SURG",
        }
    }
}

impl fmt::Display for Ward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ward {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ward::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownWard(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════
// Request
// ═══════════════════════════════════════════════════════════

/// Wire shape submitted by the dashboard (and by the REST prototype).
///
/// Integers are signed on purpose: a negative bed count must surface as a
/// range error naming the field, not as an opaque decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub hospital: String,
    pub ward: String,
    pub occupancy_rate_lag1: f64,
    pub overflow_lag1: f64,
    pub avg_wait_minutes_lag1: f64,
    pub base_beds: i64,
    pub effective_capacity: i64,
    pub staffing_index: f64,
    pub steps: i64,
    pub start_date: String,
}

/// A request that passed validation, ready for the matrix builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub hospital: String,
    pub ward: Ward,
    pub steps: usize,
    pub start_date: NaiveDate,
    pub snapshot: FeatureSnapshot,
}

impl ValidatedRequest {
    /// Calendar date of forecast step `offset` (0-based).
    pub fn date_at(&self, offset: usize) -> Option<NaiveDate> {
        self.start_date.checked_add_days(Days::new(offset as u64))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::OutOfRange {
            field,
            reason: format!("expected a finite value >= 0, got {value}"),
        });
    }
    Ok(())
}

fn at_least_one(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value < 1 {
        return Err(ValidationError::OutOfRange {
            field,
            reason: format!("expected at least 1, got {value}"),
        });
    }
    Ok(())
}

impl ForecastRequest {
    /// Check every field against the ranges the dashboard enforces and
    /// derive the feature snapshot.
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let hospital = self.hospital.trim();
        if hospital.is_empty() {
            return Err(ValidationError::MissingField("hospital"));
        }
        let ward: Ward = self.ward.trim().parse()?;

        if !self.occupancy_rate_lag1.is_finite()
            || !(0.0..=1.0).contains(&self.occupancy_rate_lag1)
        {
            return Err(ValidationError::OutOfRange {
                field: "occupancy_rate_lag1",
                reason: format!("expected a rate in [0, 1], got {}", self.occupancy_rate_lag1),
            });
        }
        non_negative("overflow_lag1", self.overflow_lag1)?;
        non_negative("avg_wait_minutes_lag1", self.avg_wait_minutes_lag1)?;
        at_least_one("base_beds", self.base_beds)?;
        at_least_one("effective_capacity", self.effective_capacity)?;
        non_negative("staffing_index", self.staffing_index)?;

        if !(1..=MAX_STEPS).contains(&self.steps) {
            return Err(ValidationError::OutOfRange {
                field: "steps",
                reason: format!("expected 1 to {MAX_STEPS} days, got {}", self.steps),
            });
        }
        let steps = self.steps as usize;

        let start_date = NaiveDate::parse_from_str(self.start_date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(self.start_date.clone()))?;
        if start_date.checked_add_days(Days::new(steps as u64 - 1)).is_none() {
            return Err(ValidationError::OutOfRange {
                field: "start_date",
                reason: "forecast window runs past the last representable date".into(),
            });
        }

        let snapshot = FeatureSnapshot::new()
            .with_numeric("occupancy_rate_lag1", self.occupancy_rate_lag1)
            .with_numeric("overflow_lag1", self.overflow_lag1)
            .with_numeric("avg_wait_minutes_lag1", self.avg_wait_minutes_lag1)
            .with_numeric("base_beds", self.base_beds as f64)
            .with_numeric("effective_capacity", self.effective_capacity as f64)
            .with_numeric("staffing_index", self.staffing_index)
            .with_categorical("hospital", hospital)
            .with_categorical("ward", ward.as_str());

        Ok(ValidatedRequest {
            hospital: hospital.to_string(),
            ward,
            steps,
            start_date,
            snapshot,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Feature snapshot
// ═══════════════════════════════════════════════════════════

/// Yesterday's operational state for one hospital/ward pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSnapshot {
    numeric: BTreeMap<String, f64>,
    categorical: BTreeMap<String, String>,
}

impl FeatureSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.numeric.insert(name.into(), value);
        self
    }

    pub fn with_categorical(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.categorical.insert(name.into(), value.into());
        self
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.numeric.get(name).copied()
    }

    pub fn numeric_names(&self) -> impl Iterator<Item = &str> {
        self.numeric.keys().map(String::as_str)
    }

    pub fn categorical_names(&self) -> impl Iterator<Item = &str> {
        self.categorical.keys().map(String::as_str)
    }

    /// Resolve a one-hot column such as `ward_ICU`.
    ///
    /// `Some(true)` when the column names this snapshot's value,
    /// `Some(false)` when it names another value of a known categorical
    /// field, `None` when it is not a one-hot column for any field here.
    pub fn one_hot(&self, column: &str) -> Option<bool> {
        let mut known_field = false;
        for (field, value) in &self.categorical {
            if let Some(rest) = column
                .strip_prefix(field.as_str())
                .and_then(|r| r.strip_prefix('_'))
            {
                if rest == value {
                    return Some(true);
                }
                known_field = true;
            }
        }
        known_field.then_some(false)
    }

    /// Total number of fields, numeric and categorical.
    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

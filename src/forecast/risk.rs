//! Capacity-risk classification of a finished forecast.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::request::Ward;

/// Discrete capacity-pressure bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Capacity Risk",
            Self::Moderate => "Moderate Capacity Risk",
            Self::High => "High Capacity Risk",
        }
    }
}

/// Mean-admissions cut points: `mean < moderate` is Low,
/// `moderate <= mean < high` is Moderate, `mean >= high` is High.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub moderate: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            moderate: 5.0,
            high: 15.0,
        }
    }
}

impl RiskThresholds {
    pub fn is_valid(&self) -> bool {
        self.moderate.is_finite()
            && self.high.is_finite()
            && self.moderate >= 0.0
            && self.moderate <= self.high
    }

    pub fn classify(&self, mean: f64) -> RiskTier {
        if mean < self.moderate {
            RiskTier::Low
        } else if mean < self.high {
            RiskTier::Moderate
        } else {
            RiskTier::High
        }
    }
}

/// Thresholds per ward, falling back to a network-wide default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    #[serde(default)]
    pub default: RiskThresholds,
    #[serde(default)]
    pub wards: HashMap<Ward, RiskThresholds>,
}

impl RiskPolicy {
    pub fn thresholds_for(&self, ward: Ward) -> RiskThresholds {
        self.wards.get(&ward).copied().unwrap_or(self.default)
    }

    /// First invalid threshold pair, if any.
    pub fn invalid_entry(&self) -> Option<String> {
        if !self.default.is_valid() {
            return Some("default".into());
        }
        self.wards
            .iter()
            .find(|(_, t)| !t.is_valid())
            .map(|(w, _)| w.to_string())
    }

    pub fn classify(&self, ward: Ward, forecast: &[u32]) -> RiskTier {
        self.thresholds_for(ward).classify(mean_admissions(forecast))
    }
}

/// Arithmetic mean of a forecast; zero for an empty sequence.
pub fn mean_admissions(forecast: &[u32]) -> f64 {
    if forecast.is_empty() {
        return 0.0;
    }
    let total: u64 = forecast.iter().map(|v| u64::from(*v)).sum();
    total as f64 / forecast.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_match_default_cut_points() {
        let t = RiskThresholds::default();
        assert_eq!(t.classify(4.9), RiskTier::Low);
        assert_eq!(t.classify(5.0), RiskTier::Moderate);
        assert_eq!(t.classify(14.9), RiskTier::Moderate);
        assert_eq!(t.classify(15.0), RiskTier::High);
    }

    #[test]
    fn tier_is_monotone_in_mean() {
        let t = RiskThresholds::default();
        let mut previous = RiskTier::Low;
        for tenth in 0..400 {
            let tier = t.classify(f64::from(tenth) / 10.0);
            assert!(tier >= previous);
            previous = tier;
        }
    }

    #[test]
    fn mean_of_small_forecast_is_low() {
        let forecast = [0, 0, 4];
        let mean = mean_admissions(&forecast);
        assert!((mean - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(RiskPolicy::default().classify(Ward::Emergency, &forecast), RiskTier::Low);
    }

    #[test]
    fn empty_forecast_has_zero_mean() {
        assert_eq!(mean_admissions(&[]), 0.0);
    }

    #[test]
    fn ward_override_changes_tier() {
        let mut policy = RiskPolicy::default();
        policy.wards.insert(
            Ward::IntensiveCare,
            RiskThresholds {
                moderate: 2.0,
                high: 4.0,
            },
        );
        let forecast = [5, 5, 5];
        assert_eq!(policy.classify(Ward::IntensiveCare, &forecast), RiskTier::High);
        assert_eq!(policy.classify(Ward::Emergency, &forecast), RiskTier::Moderate);
    }

    #[test]
    fn inverted_thresholds_are_invalid() {
        let mut policy = RiskPolicy::default();
        policy.wards.insert(
            Ward::Medical,
            RiskThresholds {
                moderate: 20.0,
                high: 10.0,
            },
        );
        assert_eq!(policy.invalid_entry(), Some("MED".into()));
    }

    #[test]
    fn policy_deserializes_ward_keys() {
        let policy: RiskPolicy = serde_json::from_str(
            r#"{"default": {"moderate": 4, "high": 12},
                "wards": {"ICU": {"moderate": 1, "high": 3}}}"#,
        )
        .unwrap();
        assert_eq!(policy.default.high, 12.0);
        assert_eq!(policy.thresholds_for(Ward::IntensiveCare).moderate, 1.0);
        assert_eq!(policy.thresholds_for(Ward::Surgical).moderate, 4.0);
    }

    #[test]
    fn tier_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RiskTier::Moderate).unwrap(), "\"moderate\"");
    }
}

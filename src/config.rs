use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactPaths;
use crate::forecast::{ExecutionPolicy, RiskPolicy};

/// Application-level constants
pub const APP_NAME: &str = "MedOptix";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory holding the trained artifacts, relative to the working directory.
pub const MODEL_DIR: &str = "model";
pub const MODEL_FILE: &str = "sarimax_model.json";
pub const SCHEMA_FILE: &str = "sarimax_schema.json";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

/// Env var naming an optional JSON config file.
pub const CONFIG_FILE_ENV: &str = "MEDOPTIX_CONFIG";

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medoptix_lib=info,medoptix=info,tower_http=info"
}

pub fn default_model_path() -> PathBuf {
    Path::new(MODEL_DIR).join(MODEL_FILE)
}

pub fn default_schema_path() -> PathBuf {
    Path::new(MODEL_DIR).join(SCHEMA_FILE)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },
    #[error("Invalid risk thresholds for {0}: need 0 <= moderate <= high")]
    Thresholds(String),
}

/// Runtime configuration for the forecast service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub listen_addr: String,
    pub model_path: PathBuf,
    pub schema_path: PathBuf,
    pub execution: ExecutionPolicy,
    pub risk: RiskPolicy,
    pub rate_limit_per_minute: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            model_path: default_model_path(),
            schema_path: default_schema_path(),
            execution: ExecutionPolicy::default(),
            risk: RiskPolicy::default(),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

impl ServiceConfig {
    /// Defaults, then the file named by `MEDOPTIX_CONFIG`, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// Same as [`ServiceConfig::load`] with an injectable env lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(v) = lookup("MEDOPTIX_LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("MEDOPTIX_MODEL_PATH") {
            config.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDOPTIX_SCHEMA_PATH") {
            config.schema_path = PathBuf::from(v);
        }
        if let Some(v) = parse_env(&lookup, "MEDOPTIX_MODEL_TIMEOUT_MS")? {
            config.execution.timeout_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "MEDOPTIX_MODEL_MAX_RETRIES")? {
            config.execution.max_retries = v;
        }
        if let Some(v) = parse_env(&lookup, "MEDOPTIX_MODEL_RETRY_BACKOFF_MS")? {
            config.execution.retry_backoff_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "MEDOPTIX_RATE_LIMIT_PER_MINUTE")? {
            config.rate_limit_per_minute = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.risk.invalid_entry() {
            Some(entry) => Err(ConfigError::Thresholds(entry)),
            None => Ok(()),
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_path.clone(),
            schema: self.schema_path.clone(),
        }
    }
}

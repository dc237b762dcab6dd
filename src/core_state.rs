//! Shared application state for the HTTP layer and the binary.
//!
//! `CoreState` owns the resolved configuration, the forecast service and
//! a small in-memory log of recent API accesses. It is wrapped in `Arc`
//! at startup and handed to the router.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::config::ServiceConfig;
use crate::forecast::{
    ForecastError, ForecastExecutor, ForecastOutcome, ForecastRequest, ForecastService,
};

/// Recent accesses kept for the audit view; oldest dropped first.
const AUDIT_BUFFER_CAPACITY: usize = 256;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    config: ServiceConfig,
    service: ForecastService,
    started_at: DateTime<Utc>,
    audit: AuditLogger,
}

impl CoreState {
    /// Build state from configuration. Artifacts are not touched until
    /// [`CoreState::warm_up`] or the first forecast.
    pub fn new(config: ServiceConfig) -> Self {
        let service = ForecastService::new(
            ArtifactStore::from_paths(config.artifact_paths()),
            ForecastExecutor::new(config.execution),
            config.risk.clone(),
        );
        Self::with_service(config, service)
    }

    /// Build state around an existing service (preloaded artifacts in tests).
    pub fn with_service(config: ServiceConfig, service: ForecastService) -> Self {
        Self {
            config,
            service,
            started_at: Utc::now(),
            audit: AuditLogger::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn service(&self) -> &ForecastService {
        &self.service
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Resolve artifacts eagerly. The result is memoized either way, so a
    /// failure here is what every later request will report.
    pub fn warm_up(&self) -> Result<(), ArtifactError> {
        self.service.artifacts().get().map(|_| ())
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastOutcome, ForecastError> {
        self.service.forecast(request).await
    }

    /// Artifact readiness for health reporting. Triggers the load if it
    /// has not happened yet.
    pub fn artifact_status(&self) -> ArtifactStatus {
        match self.service.artifacts().get() {
            Ok(artifacts) => ArtifactStatus::Ready {
                fingerprint: artifacts.fingerprint().map(str::to_string),
                columns: artifacts.schema().len(),
                loaded_at: artifacts.loaded_at(),
                model_kind: artifacts.model().kind(),
            },
            Err(e) => ArtifactStatus::Unavailable {
                error: StatusError {
                    code: e.code(),
                    message: e.to_string(),
                },
            },
        }
    }

    // ── Audit ───────────────────────────────────────────────

    pub fn log_access(&self, entry: AuditEntry) {
        self.audit.log(entry);
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }
}

// ═══════════════════════════════════════════════════════════
// Artifact status
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArtifactStatus {
    Ready {
        fingerprint: Option<String>,
        columns: usize,
        loaded_at: DateTime<Utc>,
        model_kind: &'static str,
    },
    Unavailable {
        error: StatusError,
    },
}

impl ArtifactStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusError {
    pub code: &'static str,
    pub message: String,
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// One API access, recorded after the response is produced.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub client: String,
    pub action: String,
    pub status: u16,
    pub latency_ms: u64,
}

/// Bounded in-memory buffer of recent accesses.
pub struct AuditLogger {
    buffer: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_capacity(AUDIT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn log(&self, entry: AuditEntry) {
        if let Ok(mut buf) = self.buffer.lock() {
            if buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(entry);
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

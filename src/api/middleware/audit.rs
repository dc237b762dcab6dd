//! Audit logging middleware.
//!
//! Tags every request with an `X-Request-Id`, logs method, path, status
//! and latency, and records the access in `CoreState`.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::middleware::rate::client_key;
use crate::api::types::ApiContext;
use crate::core_state::AuditEntry;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Accesses `ApiContext` from request extensions.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let client = client_key(&req);

    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ctx = req.extensions().get::<ApiContext>().cloned();

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        request_id = %request_id,
        %method,
        %path,
        status,
        latency_ms,
        "API request"
    );

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    if let Some(ctx) = ctx {
        ctx.core.log_access(AuditEntry {
            timestamp: chrono::Utc::now(),
            request_id,
            client,
            action: format!("{method} {path}"),
            status,
            latency_ms,
        });
    }

    response
}

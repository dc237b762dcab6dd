//! Per-client rate limiting middleware.
//!
//! Clients are keyed by the first `X-Forwarded-For` hop; requests
//! without one share the `anonymous` bucket.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Extract a rate-limit key from the request.
pub fn client_key(req: &Request<axum::body::Body>) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|ip| format!("ip:{ip}"))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Returns 429 with `Retry-After` once a client exceeds its budget.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = client_key(&req);

    // MutexGuard is !Send, drop before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header: Option<&str>) -> Request<axum::body::Body> {
        let mut builder = Request::builder().uri("/predict");
        if let Some(value) = header {
            builder = builder.header("X-Forwarded-For", value);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    }

    #[test]
    fn key_uses_first_forwarded_hop() {
        let req = request_with(Some("10.0.0.7, 172.16.0.1"));
        assert_eq!(client_key(&req), "ip:10.0.0.7");
    }

    #[test]
    fn key_falls_back_to_anonymous() {
        assert_eq!(client_key(&request_with(None)), "anonymous");
        assert_eq!(client_key(&request_with(Some("  "))), "anonymous");
    }
}

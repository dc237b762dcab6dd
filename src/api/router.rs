//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Middleware stack (outermost → innermost):
//! CORS → Extension → Audit logger → Rate limiter → Handler

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the forecast API router.
///
/// Middleware uses `Extension<ApiContext>` (injected outside them).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".into())
}

fn build_router(ctx: ApiContext) -> Router {
    // Layers are applied innermost first. Extension must wrap every
    // middleware that reads ApiContext.
    Router::new()
        .route("/api/health", get(endpoints::health::check))
        .route("/api/schema", get(endpoints::schema::columns))
        .route("/api/forecast", post(endpoints::forecast::forecast))
        .route("/predict", post(endpoints::forecast::predict))
        .fallback(not_found)
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

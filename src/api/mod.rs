//! HTTP surface of the forecast service.
//!
//! Routes:
//! - `GET  /api/health`   liveness plus artifact readiness
//! - `GET  /api/schema`   training column order and form choices
//! - `POST /api/forecast` full forecast outcome with risk tier
//! - `POST /predict`      bare `{"forecast": [...]}` for prototype clients
//!
//! The router is composable: `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server, start_api_server_on, ApiServer, ApiSession, ServerError};
pub use types::ApiContext;

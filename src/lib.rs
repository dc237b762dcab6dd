pub mod api;
pub mod artifact;
pub mod client;
pub mod config;
pub mod core_state;
pub mod forecast;

#[cfg(test)]
mod testing;

use std::future::Future;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServiceConfig};
use crate::core_state::CoreState;

/// Reasons the service could not start or stopped abnormally.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Start the forecast service and block until Ctrl-C.
///
/// A missing or unreadable artifact does not stop startup: the service
/// comes up degraded and reports the load error on every forecast.
pub fn run() -> Result<(), AppError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::load()?;
    tracing::info!(
        listen = %config.listen_addr,
        model = %config.model_path.display(),
        schema = %config.schema_path.display(),
        timeout_ms = config.execution.timeout_ms,
        "Configuration loaded"
    );

    let listen_addr = config.listen_addr.clone();
    let core = Arc::new(CoreState::new(config));
    match core.warm_up() {
        Ok(()) => tracing::info!("Forecasting enabled"),
        Err(e) => tracing::error!(code = e.code(), "Forecasting disabled: {e}"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(serve_until(core, &listen_addr, tokio::signal::ctrl_c()))
}

/// Serve until `shutdown` resolves. A failing shutdown signal still stops
/// the server, then surfaces as [`AppError::Runtime`].
async fn serve_until<F>(core: Arc<CoreState>, listen_addr: &str, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut server = api::start_api_server(core, listen_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    let signal = shutdown.await;
    if let Err(e) = &signal {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }

    server.shutdown();
    server.stopped().await;
    tracing::info!("{} stopped", config::APP_NAME);
    signal.map_err(AppError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_artifacts, MODEL_JSON, SCHEMA_JSON};

    fn test_core(dir: &std::path::Path) -> Arc<CoreState> {
        let (model_path, schema_path) = write_artifacts(dir, MODEL_JSON, SCHEMA_JSON);
        Arc::new(CoreState::new(ServiceConfig {
            model_path,
            schema_path,
            ..ServiceConfig::default()
        }))
    }

    #[tokio::test]
    async fn clean_shutdown_signal_returns_ok() {
        let tmp = tempfile::tempdir().unwrap();
        serve_until(test_core(tmp.path()), "127.0.0.1:0", async { Ok(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_shutdown_signal_is_runtime_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = serve_until(test_core(tmp.path()), "127.0.0.1:0", async {
            Err(std::io::Error::other("no signal handler"))
        })
        .await
        .unwrap_err();
        match err {
            AppError::Runtime(e) => assert_eq!(e.to_string(), "no signal handler"),
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_listen_addr_is_server_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = serve_until(test_core(tmp.path()), "nowhere", async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Server(_)));
    }
}

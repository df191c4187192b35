use harbor_dev_backend::{AppState, DevBackendConfig, DevBackendError, app};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "dev backend stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> harbor_core::Result<(), DevBackendError> {
    let config = DevBackendConfig::from_env().map_err(|e| DevBackendError::Config {
        reason: e.to_string(),
    })?;
    tracing::info!(redirect_uri = %config.redirect_uri, "Loaded configuration");

    let addr = config.listen_addr;
    let state = AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DevBackendError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DevBackendError::Serve {
            reason: e.to_string(),
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

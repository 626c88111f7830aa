//! DeviceHub Server: per-user device session limits with live logout push.
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use devicehub_api::{AppState, build_router};
use devicehub_auth::identity::{IdentityVerifier, JwksVerifier};
use devicehub_auth::session::DeviceSessionManager;
use devicehub_core::config::AppConfig;
use devicehub_core::error::AppError;
use devicehub_database::{DatabasePool, DeviceSessionRepository, DeviceSessionStore};
use devicehub_realtime::ConnectionRegistry;

#[tokio::main]
async fn main() {
    let env = std::env::var("DEVICEHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting DeviceHub v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    // Database
    let db = DatabasePool::connect(&config.database).await?;
    devicehub_database::migration::run_migrations(db.pool()).await?;

    // Core services
    let store: Arc<dyn DeviceSessionStore> =
        Arc::new(DeviceSessionRepository::new(db.pool().clone()));
    let sessions = Arc::new(DeviceSessionManager::new(
        store,
        config.session.max_devices,
    ));
    let registry = Arc::new(ConnectionRegistry::new(&config.realtime));
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwksVerifier::from_config(&config.identity)?);

    tracing::info!(
        max_devices = config.session.max_devices,
        jwks_url = %config.identity.resolved_jwks_url(),
        "Session services initialized"
    );

    let state = AppState::new(
        Arc::clone(&config),
        sessions,
        Arc::clone(&registry),
        verifier,
    );
    let router = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| AppError::configuration(format!("Invalid server address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    let mut server_shutdown = shutdown_rx.clone();
    let shutdown_registry = Arc::clone(&registry);
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.changed().await;
            // Live channels never finish on their own.
            shutdown_registry.close_all();
        })
        .into_future();

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let mut deadline_shutdown = shutdown_rx;
    let deadline = async move {
        let _ = deadline_shutdown.changed().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = deadline => {
            tracing::warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out");
        }
    }

    db.close().await;
    tracing::info!("DeviceHub server shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

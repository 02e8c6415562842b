//! video-broker server.
//!
//! - Maps room names to video sessions, persisted in the room registry
//! - Mints client tokens for those sessions
//! - Proxies archive start/stop/get/list and server signals to the platform

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use room_registry_core::VideoPlatform;
use room_registry_local::create_store;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use video_broker::{create_router, AppState, BrokerSettings, Config, OpenTokClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!("Starting video-broker v{}", env!("CARGO_PKG_VERSION"));
    info!("  Host: {}", config.host);
    info!("  Port: {}", config.port);
    info!("  API: {}", config.api_base_url());
    info!("  Store: {} ({})", config.store_backend, config.storage_dir.display());
    info!("  Media mode: {}", config.media_mode);
    if let Some(dir) = &config.events_log_dir {
        info!("  Events log: {}", dir.display());
    }

    let store = create_store(config.store_backend, &config.storage_dir)
        .context("Failed to open room registry")?;

    let platform: Arc<dyn VideoPlatform> = Arc::new(
        OpenTokClient::new(
            config.api_base_url(),
            config.api_key.clone(),
            config.api_secret.clone(),
            config.upstream_timeout(),
            config.token_ttl(),
        )
        .context("Failed to create platform client")?,
    );

    let state = AppState::new(store, platform, BrokerSettings::from(&config));
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

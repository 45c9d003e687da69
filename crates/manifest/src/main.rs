//! # Pluto Manifest
//!
//! Stores mini-app manifests and signs their canonical payload with a
//! detached Ed25519 signature so clients can check that UI, script and
//! permissions were not altered after publication.
//!
//! ## API endpoints
//! - `POST /manifests`
//! - `GET /manifests`
//! - `GET /manifests/search`
//! - `GET /manifests/{id}`
//! - `GET /manifests/{id}/verify`
//! - `GET /public-key`
//! - `GET /health`

mod config;
mod endpoints;
mod error;
mod locale;
mod pipeline;
mod storage;

use std::sync::Arc;

use config::{ManifestConfig, ManifestState};

fn init_tracing() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ManifestConfig::from_env()?;
    let state = Arc::new(ManifestState::from_config(&config)?);
    let app = endpoints::router(state);

    tracing::info!(
        addr = %config.bind_addr,
        database = %config.database_path,
        version = %config.version,
        "starting manifest service"
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

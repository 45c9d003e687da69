//! # Pluto Auth
//!
//! Issues bearer tokens to client devices. One active session per device
//! fingerprint: repeated logins reuse it until it nears expiry, then it is
//! rotated.
//!
//! ## API endpoints
//! - `POST /auth/app-login`: device login
//! - `GET /auth/public-key`: token verification key
//! - `GET /health`

mod config;
mod endpoints;
mod error;
mod ledger;
mod storage;

use std::sync::Arc;

use config::{AuthConfig, AuthState};

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

    let config = AuthConfig::from_env()?;
    let state = Arc::new(AuthState::from_config(&config)?);
    let app = endpoints::router(state);

    tracing::info!(addr = %config.bind_addr, database = %config.database_path, "starting auth service");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

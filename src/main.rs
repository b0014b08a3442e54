//! # WebAuthn Demo Server
//!
//! Entry point: logging, configuration, state, the expired-ceremony sweep
//! and the HTTP server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webauthn_demo_server::config::Config;
use webauthn_demo_server::routes::build_router;
use webauthn_demo_server::state::AppState;
use webauthn_demo_server::webauthn::WebAuthnService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: info for dependencies, debug for this crate; RUST_LOG overrides
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,webauthn_demo_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config).await?;
    tracing::info!("Application state initialized");

    spawn_session_sweep(Arc::clone(&app_state.webauthn), config.session_sweep_interval);

    let app = build_router(app_state);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop ceremonies that were begun but never finished
fn spawn_session_sweep(service: Arc<WebAuthnService>, period: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = service.purge_expired_sessions();
            tracing::debug!("Ceremony sweep removed {} expired sessions", purged);
        }
    });
}

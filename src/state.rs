//! # Application State
//!
//! Shared resources handed to every request handler. Axum clones the state
//! for each request; both fields are cheap handles.

use crate::config::Config;
use crate::db;
use crate::webauthn::sessions::InMemorySessionStore;
use crate::webauthn::verifier::PasskeyVerifier;
use crate::webauthn::WebAuthnService;
use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Ceremony orchestrator, shared by all handlers
    pub webauthn: Arc<WebAuthnService>,
}

impl AppState {
    /// Initialize application state
    ///
    /// 1. Connects to SQLite and runs the embedded migrations
    /// 2. Configures `webauthn-rs` with the relying party information
    /// 3. Wires the orchestrator to an expiring in-memory session store
    ///
    /// # Errors
    /// Fails if the database cannot be opened or migrated, or if the
    /// relying party configuration is invalid.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::connect(&config.database_url).await?;

        let verifier = Arc::new(PasskeyVerifier::new(config)?);
        let sessions = Arc::new(InMemorySessionStore::new(config.ceremony_ttl));
        let webauthn = Arc::new(WebAuthnService::new(
            db.clone(),
            verifier,
            sessions,
            config.verification_timeout,
        ));

        Ok(Self::from_parts(db, webauthn))
    }

    pub fn from_parts(db: SqlitePool, webauthn: Arc<WebAuthnService>) -> Self {
        AppState { db, webauthn }
    }
}

//! # Ceremony Orchestrator
//!
//! [`WebAuthnService`] ties the credential store, the session cache and the
//! verification capability together. The ceremony steps themselves live in
//! `registration.rs` and `authentication.rs`; this file holds the shared
//! plumbing and the account operations.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::models::User;
use crate::db::users;
use crate::error::{AppError, AppResult};

use super::locks::UserLocks;
use super::sessions::CeremonySessionStore;
use super::verifier::CeremonyVerifier;

pub struct WebAuthnService {
    pub(super) db: SqlitePool,
    pub(super) verifier: Arc<dyn CeremonyVerifier>,
    pub(super) sessions: Arc<dyn CeremonySessionStore>,
    pub(super) locks: UserLocks,
    verification_timeout: Duration,
}

impl WebAuthnService {
    pub fn new(
        db: SqlitePool,
        verifier: Arc<dyn CeremonyVerifier>,
        sessions: Arc<dyn CeremonySessionStore>,
        verification_timeout: Duration,
    ) -> Self {
        Self {
            db,
            verifier,
            sessions,
            locks: UserLocks::new(),
            verification_timeout,
        }
    }

    /// Create a user account, before any credential exists
    ///
    /// The user handle is generated here, once, ahead of the insert.
    pub async fn register_user(&self, username: &str, display_name: &str) -> AppResult<User> {
        let username = require("username", username)?;
        let display_name = require("display_name", display_name)?;

        let _guard = self.locks.lock(username).await;
        let user = User::new(Uuid::new_v4(), username.to_string(), display_name.to_string());
        users::create_user(&self.db, &user).await?;

        tracing::info!("Created user: {}", username);
        Ok(user)
    }

    /// Look up a user with its credentials
    pub async fn get_user(&self, username: &str) -> AppResult<User> {
        users::find_by_username(&self.db, username).await
    }

    /// Drop expired ceremonies and idle per-user locks
    pub fn purge_expired_sessions(&self) -> usize {
        let purged = self.sessions.purge_expired();
        self.locks.prune();
        purged
    }

    /// Run a verifier call off the async runtime, bounded by the timeout
    ///
    /// A call that does not answer in time is reported as a verification
    /// failure; whatever it eventually returns is discarded.
    pub(super) async fn run_verifier<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CeremonyVerifier) -> AppResult<T> + Send + 'static,
    {
        let verifier = Arc::clone(&self.verifier);
        let task = tokio::task::spawn_blocking(move || op(verifier.as_ref()));

        match tokio::time::timeout(self.verification_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(AppError::Internal(format!(
                "Verification task failed: {join_err}"
            ))),
            Err(_) => Err(AppError::VerificationFailed(format!(
                "Verification did not complete within {:?}",
                self.verification_timeout
            ))),
        }
    }
}

pub(super) fn require<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value)
}

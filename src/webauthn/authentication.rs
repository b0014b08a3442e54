//! # Passkey Authentication
//!
//! Authentication (login) is also a two-step process.
//!
//! ## Authentication Flow
//! 1. **Begin**: load the user and its credentials → ask the verifier for a
//!    request challenge naming those credentials → park the state
//! 2. **Finish**: consume the parked state → verify the signed assertion →
//!    record the new signature counter on the stored credential
//!
//! ## Security Concepts
//! - **Assertion**: the authenticator signs the challenge with the private key
//!   it created at registration
//! - **Signature counter**: grows with every use; a counter that fails to
//!   grow suggests a cloned authenticator

use serde_json::Value;

use crate::db::credentials;
use crate::db::models::Credential;
use crate::db::users;
use crate::error::{AppError, AppResult};

use super::service::WebAuthnService;
use super::sessions::{CeremonyKind, CeremonySession};

impl WebAuthnService {
    /// Start an authentication ceremony against the user's credentials
    ///
    /// Returns `RequestChallengeResponse` JSON for `navigator.credentials.get()`.
    pub async fn begin_authentication(&self, username: &str) -> AppResult<Value> {
        let _guard = self.locks.lock(username).await;

        // Get user, with credentials
        let user = users::find_by_username(&self.db, username).await?;

        if user.credentials.is_empty() {
            return Err(AppError::CredentialNotFound(format!(
                "No passkeys found for user '{}'",
                username
            )));
        }

        // Generate authentication challenge
        let challenge = {
            let user = user.clone();
            self.run_verifier(move |verifier| verifier.start_authentication(&user))
                .await?
        };

        // Park the challenge state until finish
        self.sessions.put(
            username,
            CeremonySession::new(CeremonyKind::Authentication, challenge.state),
        );

        tracing::info!("Started authentication for user: {}", username);
        Ok(challenge.options)
    }

    /// Complete authentication with the authenticator's assertion
    ///
    /// On success the stored credential takes the counter, clone verdict and
    /// flags the verifier reported, and the updated record is returned.
    pub async fn finish_authentication(&self, username: &str, response: Value) -> AppResult<Credential> {
        let _guard = self.locks.lock(username).await;

        // Get user
        let user = users::find_by_username(&self.db, username).await?;

        // Consume the authentication challenge state
        let session = self.sessions.take(username, CeremonyKind::Authentication)?;

        // Verify the assertion
        let verified = {
            let user = user.clone();
            self.run_verifier(move |verifier| {
                verifier.verify_authentication(&user, &response, &session.state)
            })
            .await?
        };

        // The credential was usable, so it must have been registered; a miss
        // here means the store and the verifier disagree
        let mut credential = credentials::find_by_credential_id(&self.db, &verified.credential_id)
            .await
            .inspect_err(|e| tracing::error!("Verified credential missing from store: {}", e))?;

        if credential.user_id != user.id {
            return Err(AppError::CredentialNotFound(format!(
                "Credential '{}' is not registered to '{}'",
                credentials::encode_id(&credential.credential_id),
                username
            )));
        }

        if verified.authenticator.clone_warning {
            tracing::warn!(
                "Possible cloned authenticator for user {} (credential {})",
                username,
                credentials::encode_id(&credential.credential_id)
            );
        }

        // Update counter and flags in database
        credential.apply_authentication(&verified);
        credentials::update_credential(&self.db, &credential).await?;

        tracing::info!(
            "Completed authentication for user: {} (counter {})",
            username,
            credential.authenticator.sign_count
        );
        Ok(credential)
    }
}

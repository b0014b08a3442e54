//! # Passkey Registration
//!
//! Registration is a two-step process: begin and finish.
//!
//! ## Registration Flow
//! 1. **Begin**: load the user → ask the verifier for a creation challenge →
//!    park the challenge state in the session cache → send options to client
//! 2. **Finish**: load the user → consume the parked state → verify the
//!    attestation response → store the new credential
//!
//! ## Security Concepts
//! - **Challenge**: random value the authenticator must answer; a new
//!   `begin` replaces the previous one, so only the latest challenge can
//!   finish
//! - **Attestation**: optional proof of where the authenticator came from

use serde_json::Value;

use crate::db::credentials;
use crate::db::models::Credential;
use crate::db::users;
use crate::error::AppResult;

use super::service::WebAuthnService;
use super::sessions::{CeremonyKind, CeremonySession};

impl WebAuthnService {
    /// Start registering a new passkey for an existing user
    ///
    /// ## Returns
    /// `CreationChallengeResponse` JSON, i.e. `{"publicKey": {...}}` for
    /// `navigator.credentials.create()`
    ///
    /// ## Errors
    /// - UserNotFound: no such username
    /// - VerificationFailed: the verifier could not build a challenge
    pub async fn begin_registration(&self, username: &str) -> AppResult<Value> {
        let _guard = self.locks.lock(username).await;

        // Get user, with credentials to exclude
        let user = users::find_by_username(&self.db, username).await?;

        let challenge = {
            let user = user.clone();
            self.run_verifier(move |verifier| verifier.start_registration(&user))
                .await?
        };

        self.sessions.put(
            username,
            CeremonySession::new(CeremonyKind::Registration, challenge.state),
        );

        tracing::info!("Started registration for user: {}", username);
        Ok(challenge.options)
    }

    /// Complete registration with the authenticator's attestation response
    ///
    /// The parked session is consumed before verification, so a failed
    /// finish cannot be retried against the same challenge.
    ///
    /// ## Errors
    /// - UserNotFound: no such username
    /// - NoActiveCeremony: no unexpired registration was begun
    /// - VerificationFailed: the response does not answer the challenge
    /// - AlreadyExists: the credential identifier is already registered
    pub async fn finish_registration(&self, username: &str, response: Value) -> AppResult<Credential> {
        let _guard = self.locks.lock(username).await;
        let user = users::find_by_username(&self.db, username).await?;
        // Consume the registration challenge state
        let session = self.sessions.take(username, CeremonyKind::Registration)?;

        // Verify the attestation
        let verified = {
            let user = user.clone();
            self.run_verifier(move |verifier| {
                verifier.verify_registration(&user, &response, &session.state)
            })
            .await?
        };

        // Store the new credential
        let credential = Credential::from_registration(user.id, verified);
        credentials::create_credential(&self.db, &credential).await?;
        users::update_user(&self.db, &user).await?;

        tracing::info!(
            "Completed registration for user: {} (credential {})",
            username,
            credentials::encode_id(&credential.credential_id)
        );
        Ok(credential)
    }
}

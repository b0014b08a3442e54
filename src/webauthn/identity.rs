//! # WebAuthn Identity
//!
//! Each user has two names. The `username` is what a person types. The user
//! handle is a random UUID that authenticators store with the credential,
//! so it never exposes the username and never changes.

use uuid::Uuid;

use crate::db::models::{Credential, User};

/// Read-only view of a user that a verification capability needs
///
/// Ceremonies only ever read the user handle, the two names and the list of
/// registered credentials; any user representation exposing those can be
/// passed to a [`CeremonyVerifier`](super::verifier::CeremonyVerifier).
pub trait WebAuthnIdentity {
    /// Stable opaque user handle, distinct from the username
    fn webauthn_id(&self) -> Uuid;

    fn webauthn_name(&self) -> &str;

    fn webauthn_display_name(&self) -> &str;

    fn webauthn_credentials(&self) -> &[Credential];
}

impl WebAuthnIdentity for User {
    fn webauthn_id(&self) -> Uuid {
        self.id
    }

    fn webauthn_name(&self) -> &str {
        &self.username
    }

    fn webauthn_display_name(&self) -> &str {
        &self.display_name
    }

    fn webauthn_credentials(&self) -> &[Credential] {
        &self.credentials
    }
}

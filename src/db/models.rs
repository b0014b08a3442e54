//! # Database Models
//!
//! Data structures for the `users` and `credentials` tables.
//!
//! A [`User`] maps straight onto its row. A [`Credential`] does not: the
//! domain shape groups the authenticator flags and counter state into nested
//! records, while the table stores them as flat columns ([`CredentialRow`])
//! with the transport hints encoded as a JSON array.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::webauthn::verifier::VerifiedCredential;

/// User account information
///
/// `id` is the WebAuthn user handle. It is generated once, before the first
/// insert, and never changes; `username` is the lookup key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique username, enforced by the store
    pub username: String,

    /// Human-readable display name
    pub display_name: String,

    /// When the user account was created (RFC3339 timestamp)
    pub created_at: String,

    /// When the user account was last updated (RFC3339 timestamp)
    pub updated_at: String,

    /// Registered credentials, loaded by the store's user lookups
    #[sqlx(skip)]
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl User {
    /// Create a new user with the given handle and fresh timestamps
    pub fn new(id: Uuid, username: String, display_name: String) -> Self {
        let now = Utc::now().to_rfc3339();

        Self {
            id,
            username,
            display_name,
            created_at: now.clone(),
            updated_at: now,
            credentials: Vec::new(),
        }
    }
}

/// Flags the authenticator reported about the user and the key's backup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialFlags {
    pub user_present: bool,
    pub user_verified: bool,
    pub backup_eligible: bool,
    pub backup_state: bool,
}

/// Authenticator model and anti-cloning state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorState {
    /// Authenticator model identifier, when attestation disclosed one
    pub aaguid: Option<Vec<u8>>,

    /// Last signature counter accepted for this credential
    pub sign_count: u32,

    /// Set when the verification library flagged a possible clone
    pub clone_warning: bool,
}

/// Registered passkey credential
///
/// Only the public half of the key pair is held here. `public_key` is the
/// verification library's opaque serialization of the key and its policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Credential identifier chosen by the authenticator, globally unique
    pub credential_id: Vec<u8>,

    /// Owning user's handle
    pub user_id: Uuid,

    pub public_key: Vec<u8>,

    /// Attestation statement format, e.g. "none" or "packed"
    pub attestation_type: String,

    /// Transport hints such as "usb", "nfc", "internal"
    pub transports: Vec<String>,

    pub flags: CredentialFlags,

    pub authenticator: AuthenticatorState,

    /// When the credential was registered (RFC3339 timestamp)
    pub created_at: String,

    /// When the credential last completed an authentication
    pub last_used_at: Option<String>,
}

impl Credential {
    /// Bind a freshly verified registration to its owner
    pub fn from_registration(user_id: Uuid, verified: VerifiedCredential) -> Self {
        Self {
            credential_id: verified.credential_id,
            user_id,
            public_key: verified.public_key,
            attestation_type: verified.attestation_type,
            transports: verified.transports,
            flags: verified.flags,
            authenticator: verified.authenticator,
            created_at: Utc::now().to_rfc3339(),
            last_used_at: None,
        }
    }

    /// Overwrite the fields an authentication is allowed to change
    ///
    /// Identity, key material and attestation are immutable after
    /// registration; only the counter, clone flag and flags move.
    pub fn apply_authentication(&mut self, verified: &VerifiedCredential) {
        self.authenticator.sign_count = verified.authenticator.sign_count;
        self.authenticator.clone_warning = verified.authenticator.clone_warning;
        self.flags = verified.flags;
        self.last_used_at = Some(Utc::now().to_rfc3339());
    }
}

/// Flat row shape of the `credentials` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub credential_id: Vec<u8>,
    pub user_id: Uuid,
    pub public_key: Vec<u8>,
    pub attestation_type: String,

    /// JSON array of transport names
    pub transports: String,

    pub user_present: bool,
    pub user_verified: bool,
    pub backup_eligible: bool,
    pub backup_state: bool,
    pub aaguid: Option<Vec<u8>>,

    /// SQLite integers are signed 64-bit; the counter is a u32 on the wire
    pub sign_count: i64,

    pub clone_warning: bool,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = AppError;

    fn try_from(row: CredentialRow) -> AppResult<Self> {
        let transports: Vec<String> = serde_json::from_str(&row.transports)?;
        let sign_count = u32::try_from(row.sign_count).map_err(|_| {
            AppError::Internal(format!("stored signature counter {} out of range", row.sign_count))
        })?;

        Ok(Self {
            credential_id: row.credential_id,
            user_id: row.user_id,
            public_key: row.public_key,
            attestation_type: row.attestation_type,
            transports,
            flags: CredentialFlags {
                user_present: row.user_present,
                user_verified: row.user_verified,
                backup_eligible: row.backup_eligible,
                backup_state: row.backup_state,
            },
            authenticator: AuthenticatorState {
                aaguid: row.aaguid,
                sign_count,
                clone_warning: row.clone_warning,
            },
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        })
    }
}

impl TryFrom<&Credential> for CredentialRow {
    type Error = AppError;

    fn try_from(credential: &Credential) -> AppResult<Self> {
        Ok(Self {
            credential_id: credential.credential_id.clone(),
            user_id: credential.user_id,
            public_key: credential.public_key.clone(),
            attestation_type: credential.attestation_type.clone(),
            transports: serde_json::to_string(&credential.transports)?,
            user_present: credential.flags.user_present,
            user_verified: credential.flags.user_verified,
            backup_eligible: credential.flags.backup_eligible,
            backup_state: credential.flags.backup_state,
            aaguid: credential.authenticator.aaguid.clone(),
            sign_count: i64::from(credential.authenticator.sign_count),
            clone_warning: credential.authenticator.clone_warning,
            created_at: credential.created_at.clone(),
            last_used_at: credential.last_used_at.clone(),
        })
    }
}

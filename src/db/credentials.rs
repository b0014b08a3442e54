//! # Credential Database Operations
//!
//! CRUD operations for passkey credentials. Credentials hold the public keys
//! used to verify authentication; private keys never leave the device.

use crate::db::is_unique_violation;
use crate::db::models::{Credential, CredentialRow};
use crate::error::{AppError, AppResult};
use base64::prelude::*;
use sqlx::SqlitePool;
use uuid::Uuid;

const CREDENTIAL_COLUMNS: &str = "credential_id, user_id, public_key, attestation_type, transports,
     user_present, user_verified, backup_eligible, backup_state,
     aaguid, sign_count, clone_warning, created_at, last_used_at";

/// Save a newly registered credential
///
/// Fails with `AlreadyExists` when the credential identifier is already
/// registered, to this user or any other.
pub async fn create_credential(pool: &SqlitePool, credential: &Credential) -> AppResult<()> {
    let row = CredentialRow::try_from(credential)?;

    sqlx::query(&format!(
        "INSERT INTO credentials ({CREDENTIAL_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&row.credential_id)
    .bind(row.user_id)
    .bind(&row.public_key)
    .bind(&row.attestation_type)
    .bind(&row.transports)
    .bind(row.user_present)
    .bind(row.user_verified)
    .bind(row.backup_eligible)
    .bind(row.backup_state)
    .bind(&row.aaguid)
    .bind(row.sign_count)
    .bind(row.clone_warning)
    .bind(&row.created_at)
    .bind(&row.last_used_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::AlreadyExists(format!(
                "Credential '{}' is already registered",
                encode_id(&row.credential_id)
            ))
        } else {
            AppError::Database(e)
        }
    })?;

    Ok(())
}

/// Get all credentials for a user
///
/// An empty vector when the user has none; order is unspecified.
pub async fn find_by_user_id(pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<Credential>> {
    let rows = sqlx::query_as::<_, CredentialRow>(&format!(
        "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Credential::try_from).collect()
}

/// Find a specific credential by its identifier
pub async fn find_by_credential_id(pool: &SqlitePool, credential_id: &[u8]) -> AppResult<Credential> {
    let row = sqlx::query_as::<_, CredentialRow>(&format!(
        "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE credential_id = ?"
    ))
    .bind(credential_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::CredentialNotFound(format!(
            "Credential '{}' not found",
            encode_id(credential_id)
        )),
        _ => AppError::Database(e),
    })?;

    Credential::try_from(row)
}

/// Persist the state an authentication changed
///
/// Writes the signature counter, clone flag, verification flags and
/// `last_used_at`. The key material is never rewritten.
pub async fn update_credential(pool: &SqlitePool, credential: &Credential) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE credentials
         SET sign_count = ?, clone_warning = ?,
             user_present = ?, user_verified = ?, backup_eligible = ?, backup_state = ?,
             last_used_at = ?
         WHERE credential_id = ?",
    )
    .bind(i64::from(credential.authenticator.sign_count))
    .bind(credential.authenticator.clone_warning)
    .bind(credential.flags.user_present)
    .bind(credential.flags.user_verified)
    .bind(credential.flags.backup_eligible)
    .bind(credential.flags.backup_state)
    .bind(&credential.last_used_at)
    .bind(&credential.credential_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::CredentialNotFound(format!(
            "Credential '{}' not found",
            encode_id(&credential.credential_id)
        )));
    }

    Ok(())
}

/// Credential identifiers in messages use the WebAuthn wire encoding
pub fn encode_id(credential_id: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(credential_id)
}

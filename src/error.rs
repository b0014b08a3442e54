//! # Error Handling
//!
//! Application-wide error type and its conversion into HTTP responses.
//!
//! Every failure is terminal for the request that hit it: nothing here is
//! retried. Ceremony failures surface as `400 {"error": "..."}`; only the
//! user lookup endpoint answers `404`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use webauthn_rs::prelude::WebauthnError;

/// Application-wide error type
///
/// Variants follow the ceremony error taxonomy: collisions
/// (`AlreadyExists`), lookup misses (`UserNotFound`, `CredentialNotFound`),
/// a finish without its begin (`NoActiveCeremony`), a rejected client
/// response (`VerificationFailed`) and storage failures (`Database`).
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage errors (SQLx library errors)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed while opening the store
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// JSON serialization/deserialization errors
    ///
    /// Mostly a client sending a ceremony response that does not parse.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Username or credential identifier already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// No user with the requested username or id
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A credential the ceremony refers to is not in the store
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// `finish` was called without a matching, unexpired `begin`
    #[error("No active ceremony: {0}")]
    NoActiveCeremony(String),

    /// The verification capability rejected the client's response
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Resource not found errors (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request errors (400)
    ///
    /// Missing or malformed request fields.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server errors (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<WebauthnError> for AppError {
    fn from(err: WebauthnError) -> Self {
        if matches!(err, WebauthnError::CredentialPossibleCompromise) {
            tracing::warn!("Signature counter regressed, possible cloned authenticator");
        }
        AppError::VerificationFailed(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response
///
/// Storage and serialization details are logged but replaced with a generic
/// message in the body, so database internals never reach the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::BAD_REQUEST, "Storage error".to_string())
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            AppError::Serialization(e) => {
                tracing::warn!("Serialization error: {:?}", e);
                (StatusCode::BAD_REQUEST, "Malformed payload".to_string())
            }
            AppError::VerificationFailed(reason) => {
                tracing::warn!("Ceremony verification failed: {}", reason);
                (StatusCode::BAD_REQUEST, reason.clone())
            }
            AppError::AlreadyExists(msg)
            | AppError::UserNotFound(msg)
            | AppError::CredentialNotFound(msg)
            | AppError::NoActiveCeremony(msg)
            | AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceremony_errors_map_to_bad_request() {
        let cases = [
            AppError::AlreadyExists("user 'alice'".into()),
            AppError::UserNotFound("alice".into()),
            AppError::CredentialNotFound("abc".into()),
            AppError::NoActiveCeremony("alice".into()),
            AppError::VerificationFailed("bad signature".into()),
            AppError::BadRequest("username is required".into()),
        ];

        for err in cases {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn not_found_and_internal_keep_their_status() {
        assert_eq!(
            AppError::NotFound("User not found".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("join error".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn response_body_carries_the_bare_message() {
        let response = AppError::BadRequest("username is required".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body, json!({ "error": "username is required" }));
    }

    #[test]
    fn webauthn_errors_become_verification_failures() {
        let err: AppError = WebauthnError::CredentialPossibleCompromise.into();
        assert!(matches!(err, AppError::VerificationFailed(_)));
    }
}

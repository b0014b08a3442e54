//! # User Handlers

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

/// Public profile of a user
///
/// ## Route
/// GET /api/user/{username}
///
/// ## Response
/// ```json
/// {
///   "username": "alice",
///   "display_name": "Alice Smith",
///   "credentials": 1
/// }
/// ```
///
/// Only the credential count is disclosed, never identifiers or keys.
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<Value>> {
    let user = state.webauthn.get_user(&username).await.map_err(|e| match e {
        AppError::UserNotFound(_) => AppError::NotFound("User not found".to_string()),
        other => other,
    })?;

    Ok(Json(json!({
        "username": user.username,
        "display_name": user.display_name,
        "credentials": user.credentials.len(),
    })))
}

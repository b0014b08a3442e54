//! # Account and Ceremony Handlers
//!
//! Begin endpoints take the username in the JSON body. Finish endpoints take
//! it from `?username=`, because the body is the authenticator's response
//! passed through untouched.

use crate::db::credentials::encode_id;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::webauthn::types::*;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde_json::{json, Value};

// Account endpoint

pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = payload?;
    let user = state
        .webauthn
        .register_user(&req.username, &req.display_name)
        .await?;

    Ok(Json(json!({
        "message": "User created successfully",
        "user": {
            "username": user.username,
            "display_name": user.display_name,
        }
    })))
}

// Registration endpoints

pub async fn begin_registration(
    State(state): State<AppState>,
    payload: Result<Json<BeginCeremonyRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = payload?;
    let username = required(&req.username)?;
    let options = state.webauthn.begin_registration(username).await?;

    Ok(Json(options))
}

pub async fn finish_registration(
    State(state): State<AppState>,
    Query(query): Query<FinishCeremonyQuery>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let username = required_query(query.username)?;
    let Json(response) = payload?;
    let credential = state.webauthn.finish_registration(&username, response).await?;

    Ok(Json(json!({
        "message": "Registration completed successfully",
        "credential_id": encode_id(&credential.credential_id),
    })))
}

// Authentication endpoints

pub async fn begin_authentication(
    State(state): State<AppState>,
    payload: Result<Json<BeginCeremonyRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = payload?;
    let username = required(&req.username)?;
    let options = state.webauthn.begin_authentication(username).await?;

    Ok(Json(options))
}

pub async fn finish_authentication(
    State(state): State<AppState>,
    Query(query): Query<FinishCeremonyQuery>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let username = required_query(query.username)?;
    let Json(response) = payload?;
    let credential = state.webauthn.finish_authentication(&username, response).await?;

    Ok(Json(json!({
        "message": "Authentication completed successfully",
        "credential_id": encode_id(&credential.credential_id),
    })))
}

/// Reject a blank username in a request body
fn required(username: &str) -> AppResult<&str> {
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("username is required".to_string()));
    }
    Ok(username)
}

/// The `?username=` of the finish endpoints
fn required_query(username: Option<String>) -> AppResult<String> {
    let username = username.unwrap_or_default();
    required(&username)?;
    Ok(username)
}

//! # Health Check Handler
//!
//! Liveness endpoint for load balancers and monitoring.

use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Health check endpoint
///
/// ## Route
/// GET /health
///
/// ## Response
/// ```json
/// {
///   "status": "healthy",
///   "service": "webauthn-demo-server",
///   "database": "ok"
/// }
/// ```
///
/// Always answers 200 while the process is up; a failing database shows as
/// `"status": "degraded"`.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check database probe failed: {:?}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": if database == "ok" { "healthy" } else { "degraded" },
        "service": "webauthn-demo-server",
        "database": database,
    }))
}

//! # HTTP Request Handlers
//!
//! Thin adapters between axum and [`WebAuthnService`](crate::webauthn::WebAuthnService).
//!
//! ## Submodules
//! - `health`: health check endpoint (for monitoring)
//! - `auth`: account creation and the four ceremony endpoints
//! - `users`: public user profile
//!
//! ## Handler Pattern
//! 1. Extract data from the request (path, query, JSON body)
//! 2. Call the orchestrator
//! 3. Return JSON, or an `AppError` that renders as `{"error": "..."}`
//!
//! JSON bodies are taken as `Result<Json<T>, JsonRejection>` so malformed
//! input produces the same error shape as every other failure.

pub mod auth;
pub mod health;
pub mod users;

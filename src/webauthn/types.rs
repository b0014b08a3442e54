//! # WebAuthn API Types
//!
//! Request bodies and query strings for the HTTP endpoints. The ceremony
//! client responses themselves are passed through as raw JSON and parsed by
//! the verifier.

use serde::{Deserialize, Serialize};

/// Request to create a user account
///
/// ## Example JSON
/// ```json
/// {
///   "username": "alice",
///   "display_name": "Alice Smith"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub display_name: String,
}

/// Request to begin a registration or authentication ceremony
#[derive(Debug, Serialize, Deserialize)]
pub struct BeginCeremonyRequest {
    pub username: String,
}

/// Query string of the finish endpoints: `?username=alice`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FinishCeremonyQuery {
    pub username: Option<String>,
}

//! # WebAuthn Module
//!
//! Ceremony orchestration for passwordless registration and login.
//!
//! ## Submodules
//! - `service`: `WebAuthnService`, the orchestrator and its account operations
//! - `registration` / `authentication`: the two ceremonies
//! - `verifier`: the protocol capability seam and its `webauthn-rs` backend
//! - `identity`: what a verifier may read about a user
//! - `sessions`: in-flight challenge cache
//! - `locks`: per-username serialization
//! - `types`: request types for the API
//!
//! ## WebAuthn Flow Overview
//!
//! ### Registration (Creating a Passkey)
//! 1. Client creates an account → `WebAuthnService::register_user()`
//! 2. Client requests registration → `WebAuthnService::begin_registration()`
//! 3. Client runs `navigator.credentials.create()` with the options
//! 4. Client posts the attestation → `WebAuthnService::finish_registration()`
//!
//! ### Authentication (Logging In)
//! 1. Client requests authentication → `WebAuthnService::begin_authentication()`
//! 2. Client runs `navigator.credentials.get()` with the options
//! 3. Client posts the assertion → `WebAuthnService::finish_authentication()`
//! 4. Server stores the new signature counter

pub mod authentication;
pub mod identity;
pub mod locks;
pub mod registration;
pub mod service;
pub mod sessions;
pub mod types;
pub mod verifier;

pub use service::WebAuthnService;

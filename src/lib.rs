//! # WebAuthn Demo Server
//!
//! Registers and authenticates users with passkeys (platform authenticators
//! and security keys) over the WebAuthn ceremonies. Challenge generation and
//! signature verification are delegated to `webauthn-rs`; this crate wires
//! HTTP endpoints to a SQLite credential store and an in-memory cache of
//! in-flight ceremonies.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod webauthn;

#[cfg(test)]
mod tests;

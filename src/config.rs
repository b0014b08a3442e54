//! # Configuration Management
//!
//! Configuration comes from the environment (a `.env` file is loaded first
//! when present).
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite connection string (default: sqlite:webauthn.db?mode=rwc)
//! - `RP_ID`: WebAuthn Relying Party ID (default: localhost)
//! - `RP_ORIGIN`: WebAuthn Relying Party Origin (default: http://localhost:8080)
//! - `RP_NAME`: Human-readable name for the service (default: WebAuthn Demo)
//! - `CEREMONY_TTL_SECS`: How long a begun ceremony stays valid (default: 300)
//! - `VERIFICATION_TIMEOUT_SECS`: Bound on one verification call (default: 10)
//! - `SESSION_SWEEP_INTERVAL_SECS`: Expired-ceremony sweep period (default: 600)

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
///
/// ## WebAuthn Terminology
/// - **RP (Relying Party)**: the application that relies on authentication
/// - **RP ID**: the domain name (e.g. "example.com" or "localhost")
/// - **RP Origin**: the full URL the browser sees (e.g. "https://example.com")
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL
    /// The "mode=rwc" suffix means: read, write, create if missing
    pub database_url: String,

    /// WebAuthn Relying Party ID, must match the domain the app is served from
    pub rp_id: String,

    /// WebAuthn Relying Party Origin, including scheme and port
    pub rp_origin: String,

    /// Name shown to users during passkey creation
    pub rp_name: String,

    /// Lifetime of an unfinished ceremony
    pub ceremony_ttl: Duration,

    /// Upper bound on a single call into the verification library
    pub verification_timeout: Duration,

    /// Period of the background sweep that drops expired ceremonies
    pub session_sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=8080
    /// DATABASE_URL=sqlite:webauthn.db?mode=rwc
    /// RP_ID=localhost
    /// RP_ORIGIN=http://localhost:8080
    /// RP_NAME=WebAuthn Demo
    /// CEREMONY_TTL_SECS=300
    /// ```
    pub fn from_env() -> Result<Self> {
        // dotenvy doesn't error if the file is missing
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Missing keys fall back to their defaults; present but unparsable
    /// values are an error naming the offending key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let sweep_secs: u64 = parse(&lookup, "SESSION_SWEEP_INTERVAL_SECS", 600)?;
        anyhow::ensure!(sweep_secs > 0, "SESSION_SWEEP_INTERVAL_SECS must be positive");

        Ok(Config {
            host: string("HOST", "127.0.0.1"),
            port: parse(&lookup, "PORT", 8080)?,
            database_url: string("DATABASE_URL", "sqlite:webauthn.db?mode=rwc"),
            rp_id: string("RP_ID", "localhost"),
            rp_origin: string("RP_ORIGIN", "http://localhost:8080"),
            rp_name: string("RP_NAME", "WebAuthn Demo"),
            ceremony_ttl: Duration::from_secs(parse(&lookup, "CEREMONY_TTL_SECS", 300)?),
            verification_timeout: Duration::from_secs(parse(
                &lookup,
                "VERIFICATION_TIMEOUT_SECS",
                10,
            )?),
            session_sweep_interval: Duration::from_secs(sweep_secs),
        })
    }

    /// Socket address to bind the server to, e.g. "127.0.0.1:8080"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

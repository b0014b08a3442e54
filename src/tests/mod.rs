//! Ceremony and HTTP tests over an in-memory database and a fake verifier

mod ceremony_flow;

use std::sync::Arc;
use std::time::Duration;

use crate::db;
use crate::webauthn::sessions::InMemorySessionStore;
use crate::webauthn::WebAuthnService;
use fake_verifier::FakeVerifier;

pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// An orchestrator plus a handle on its session store for inspection
pub(crate) struct Harness {
    pub service: Arc<WebAuthnService>,
    pub sessions: Arc<InMemorySessionStore>,
    pub db: sqlx::SqlitePool,
}

pub(crate) async fn harness_with(verifier: FakeVerifier, ttl: Duration, timeout: Duration) -> Harness {
    let db = db::connect_in_memory().await;
    let sessions = Arc::new(InMemorySessionStore::new(ttl));
    let service = Arc::new(WebAuthnService::new(
        db.clone(),
        Arc::new(verifier),
        sessions.clone(),
        timeout,
    ));

    Harness {
        service,
        sessions,
        db,
    }
}

pub(crate) async fn harness() -> Harness {
    harness_with(FakeVerifier::new(), DEFAULT_TTL, DEFAULT_TIMEOUT).await
}

//! # Ceremony Session Cache
//!
//! Holds the one in-flight challenge a user may have between `begin` and
//! `finish`. Entries live in memory only: a restart abandons every
//! unfinished ceremony and clients start again from `begin`.
//!
//! ## Lifecycle
//! 1. `begin` → `put` (overwrites any unfinished ceremony for that user)
//! 2. `finish` → `take` (the entry is consumed, whatever the verdict)
//! 3. entries older than the TTL read as absent and are swept periodically

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyKind::Registration => f.write_str("registration"),
            CeremonyKind::Authentication => f.write_str("authentication"),
        }
    }
}

/// Server-side state of one begun ceremony
#[derive(Debug, Clone)]
pub struct CeremonySession {
    pub kind: CeremonyKind,

    /// Opaque challenge state produced by the verifier
    pub state: Vec<u8>,

    pub created_at: Instant,
}

impl CeremonySession {
    pub fn new(kind: CeremonyKind, state: Vec<u8>) -> Self {
        Self {
            kind,
            state,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Keyed store of in-flight ceremonies, one per username
pub trait CeremonySessionStore: Send + Sync + 'static {
    /// Store `session`, replacing whatever `username` had in flight
    fn put(&self, username: &str, session: CeremonySession);

    fn get(&self, username: &str) -> AppResult<CeremonySession>;

    /// Atomically remove and return the session if it is of `kind`
    ///
    /// A session of the other kind is left in place.
    fn take(&self, username: &str, kind: CeremonyKind) -> AppResult<CeremonySession>;

    fn remove(&self, username: &str);

    /// Drop every expired session, returning how many were dropped
    fn purge_expired(&self) -> usize;
}

/// Concurrent in-memory session store with a fixed TTL
pub struct InMemorySessionStore {
    entries: DashMap<String, CeremonySession>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        tracing::info!("Creating in-memory ceremony session store (ttl {:?})", ttl);
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn no_ceremony(username: &str) -> AppError {
    AppError::NoActiveCeremony(format!("No ceremony in progress for user '{}'", username))
}

impl CeremonySessionStore for InMemorySessionStore {
    fn put(&self, username: &str, session: CeremonySession) {
        if let Some(previous) = self.entries.insert(username.to_string(), session) {
            tracing::debug!(
                "Discarded unfinished {} ceremony for user: {}",
                previous.kind,
                username
            );
        }
    }

    fn get(&self, username: &str) -> AppResult<CeremonySession> {
        match self.entries.entry(username.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(self.ttl) => {
                entry.remove();
                tracing::debug!("Ceremony for user {} expired", username);
                Err(no_ceremony(username))
            }
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(_) => Err(no_ceremony(username)),
        }
    }

    fn take(&self, username: &str, kind: CeremonyKind) -> AppResult<CeremonySession> {
        match self.entries.entry(username.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(self.ttl) => {
                entry.remove();
                tracing::debug!("Ceremony for user {} expired", username);
                Err(no_ceremony(username))
            }
            Entry::Occupied(entry) if entry.get().kind != kind => Err(AppError::NoActiveCeremony(
                format!(
                    "No {} ceremony in progress for user '{}' ({} pending)",
                    kind,
                    username,
                    entry.get().kind
                ),
            )),
            Entry::Occupied(entry) => Ok(entry.remove()),
            Entry::Vacant(_) => Err(no_ceremony(username)),
        }
    }

    fn remove(&self, username: &str) {
        self.entries.remove(username);
    }

    fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, session| !session.is_expired(self.ttl));
        before.saturating_sub(self.entries.len())
    }
}

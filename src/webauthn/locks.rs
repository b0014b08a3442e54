//! # Per-User Ceremony Locks
//!
//! A ceremony step reads the session cache, calls the verifier and writes the
//! store. Two steps for the same user interleaving there could both consume
//! one challenge, or let a stale begin overwrite a fresh one. Every
//! orchestrator operation therefore holds its user's lock from start to end.
//!
//! Idle locks are dropped by the periodic sweep.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per username
///
/// Ceremony operations for the same user run one at a time; operations for
/// different users never contend.
#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `username`'s ceremony state
    pub async fn lock(&self, username: &str) -> OwnedMutexGuard<()> {
        // Clone the handle out so the shard lock is released before awaiting
        let lock = Arc::clone(self.locks.entry(username.to_string()).or_default().value());
        lock.lock_owned().await
    }

    /// Forget locks nobody holds or waits on
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.lock("alice").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("alice").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender acquires after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let locks = UserLocks::new();
        let _alice = locks.lock("alice").await;

        tokio::time::timeout(Duration::from_secs(1), locks.lock("bob"))
            .await
            .expect("bob is not blocked by alice");
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = UserLocks::new();
        let held = locks.lock("alice").await;
        drop(locks.lock("bob").await);

        assert_eq!(locks.prune(), 1);
        assert_eq!(locks.len(), 1);

        drop(held);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_empty());
    }
}

//! Per-user async locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutexes serializing device admission for one user.
///
/// Entries are created on demand and removed when the last holder or waiter
/// lets go, so the map only holds users with an operation in flight.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`.
    pub async fn acquire(&self, user_id: &str) -> UserLockGuard<'_> {
        let lock = Arc::clone(self.locks.entry(user_id.to_string()).or_default().value());
        let guard = lock.lock_owned().await;
        UserLockGuard {
            locks: self,
            user_id: user_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of users with a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held while a user's admission sequence runs.
#[derive(Debug)]
pub struct UserLockGuard<'a> {
    locks: &'a UserLocks,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map itself still references the mutex: nobody is waiting.
        self.locks
            .locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

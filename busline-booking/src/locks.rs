use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::partition::PartitionKey;

/// One async mutex per key, created on first use.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

/// Serializes ledger writers on one (route, date) inside this process; the
/// store's compare-and-swap covers other processes.
pub type PartitionLocks = KeyedLocks<PartitionKey>;

/// Serializes writes to one user's booking index.
pub type UserLocks = KeyedLocks<String>;

impl<K: Eq + Hash> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(key).or_default().clone()
    }

    /// `None` when the lock could not be taken within `timeout`.
    /// The guard releases on drop, including early returns and panics.
    pub async fn acquire(&self, key: K, timeout: Duration) -> Option<OwnedMutexGuard<()>> {
        tokio::time::timeout(timeout, self.entry(key).lock_owned()).await.ok()
    }

    /// Waits as long as it takes. Only for critical sections that do a
    /// bounded amount of store work and take no other lock.
    pub async fn acquire_unbounded(&self, key: K) -> OwnedMutexGuard<()> {
        self.entry(key).lock_owned().await
    }
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use busline_core::{KvStore, StoreError, Versioned};

/// Process-local store. Every call takes the map lock for its whole duration,
/// which makes `compare_and_swap` trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Versioned>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let version = entries.get(key).map_or(1, |e| e.version + 1);
        entries.insert(key.to_string(), Versioned { version, value });
        Ok(version)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|e| e.version);
        if current != expected {
            return Ok(false);
        }
        let version = current.map_or(1, |v| v + 1);
        entries.insert(key.to_string(), Versioned { version, value });
        Ok(true)
    }
}

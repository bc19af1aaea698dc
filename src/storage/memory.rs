use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Entries, KeyValueStorage};
use crate::errors::StorageResult;

/// Volatile storage, used when no cache directory is wanted and in tests
#[derive(Debug)]
pub struct MemoryStorage {
    entries: RwLock<Entries>,
}

impl MemoryStorage {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::new(capacity_bytes)),
        }
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().await.get(key))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.write().await.set(key, value)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn key(&self, index: usize) -> Option<String> {
        self.entries.read().await.key(index)
    }

    async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

//! Durable key/value storage
//!
//! The cache persists its envelopes through [`KeyValueStorage`], a small
//! string-to-string store with a byte ceiling. Writes that would push the
//! stored size past the ceiling fail with [`StorageError::QuotaExceeded`]
//! and leave the store unchanged.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::errors::{StorageError, StorageResult};

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Key/value persistence collaborator
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key; removing a missing key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Key at position `index` in enumeration order
    async fn key(&self, index: usize) -> Option<String>;

    /// Snapshot of every stored key
    async fn keys(&self) -> Vec<String>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Ordered entries plus the byte accounting shared by every backend
#[derive(Debug, Clone, Default)]
pub(crate) struct Entries {
    map: BTreeMap<String, String>,
    used_bytes: usize,
    capacity_bytes: usize,
}

impl Entries {
    pub(crate) fn new(capacity_bytes: usize) -> Self {
        Self {
            map: BTreeMap::new(),
            used_bytes: 0,
            capacity_bytes,
        }
    }

    pub(crate) fn from_map(map: BTreeMap<String, String>, capacity_bytes: usize) -> Self {
        let used_bytes = map.iter().map(|(k, v)| entry_size(k, v)).sum();
        Self {
            map,
            used_bytes,
            capacity_bytes,
        }
    }

    pub(crate) fn map(&self) -> &BTreeMap<String, String> {
        &self.map
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub(crate) fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let replaced = self.map.get(key).map_or(0, |old| entry_size(key, old));
        let baseline = self.used_bytes - replaced;
        let requested = entry_size(key, value);

        if baseline + requested > self.capacity_bytes {
            return Err(StorageError::QuotaExceeded {
                requested,
                available: self.capacity_bytes.saturating_sub(baseline),
            });
        }

        self.map.insert(key.to_string(), value.to_string());
        self.used_bytes = baseline + requested;
        Ok(())
    }

    /// Returns whether the key was present
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.map.remove(key) {
            Some(old) => {
                self.used_bytes -= entry_size(key, &old);
                true
            }
            None => false,
        }
    }

    pub(crate) fn key(&self, index: usize) -> Option<String> {
        self.map.keys().nth(index).cloned()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[cfg(test)]
    pub(crate) fn used_bytes(&self) -> usize {
        self.used_bytes
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

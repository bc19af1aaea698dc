//! Time-expiring playlist cache
//!
//! Maps a playlist source to its parsed channel list. Values are wrapped in a
//! [`CacheEnvelope`] carrying an absolute expiry timestamp and persisted
//! through a [`KeyValueStorage`]; an optional LRU mirror keeps recently used
//! envelopes in memory so repeated lookups skip deserializing the document.
//!
//! The cache never fails its callers: storage problems are logged and the
//! affected entry behaves as absent.

use chrono::Utc;
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::CacheConfig;
use crate::models::Channel;
use crate::storage::KeyValueStorage;

/// Stored form of a cache entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub value: serde_json::Value,
    /// Milliseconds since the Unix epoch
    pub expiry: i64,
}

impl CacheEnvelope {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expiry
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_after(ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms().saturating_add(ttl_ms)
}

/// Playlist cache backed by durable storage
pub struct ChannelCache {
    storage: Arc<dyn KeyValueStorage>,
    mirror: Option<Mutex<LruCache<String, CacheEnvelope>>>,
    enabled: bool,
    default_ttl: Duration,
}

impl ChannelCache {
    pub fn new(storage: Arc<dyn KeyValueStorage>, config: &CacheConfig) -> Self {
        let mirror = NonZeroUsize::new(config.memory_entries)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));

        Self {
            storage,
            mirror,
            enabled: config.enabled,
            default_ttl: config.default_ttl(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a live entry, purging it if it has expired or is unreadable
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let envelope = match self.mirror_get(key).await {
            Some(envelope) => envelope,
            None => self.load_envelope(key).await?,
        };

        if envelope.is_expired_at(now_ms()) {
            debug!("Cache entry expired: {}", key);
            self.purge(key).await;
            return None;
        }

        match serde_json::from_value(envelope.value.clone()) {
            Ok(value) => {
                self.mirror_put(key, envelope).await;
                Some(value)
            }
            Err(e) => {
                warn!("Discarding cache entry {} with unexpected payload: {}", key, e);
                self.purge(key).await;
                None
            }
        }
    }

    /// Store a value for `ttl`; failures are logged, never returned
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        if !self.enabled {
            return;
        }

        let envelope = match serde_json::to_value(value) {
            Ok(value) => CacheEnvelope {
                value,
                expiry: expiry_after(ttl),
            },
            Err(e) => {
                error!("Error serializing cache entry {}: {}", key, e);
                return;
            }
        };

        let document = match serde_json::to_string(&envelope) {
            Ok(document) => document,
            Err(e) => {
                error!("Error serializing cache entry {}: {}", key, e);
                return;
            }
        };

        match self.storage.set(key, &document).await {
            Ok(()) => {}
            Err(e) if e.is_quota_exceeded() => {
                error!("Error writing to storage: {}", e);
                let removed = self.cleanup().await;
                debug!("Quota cleanup removed {} entries, retrying write", removed);
                if let Err(e) = self.storage.set(key, &document).await {
                    error!("Failed to save to storage even after cleanup: {}", e);
                    return;
                }
            }
            Err(e) => {
                error!("Error writing to storage: {}", e);
                return;
            }
        }

        self.mirror_put(key, envelope).await;
    }

    /// Store a value with the configured expiry
    pub async fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set(key, value, self.default_ttl).await;
    }

    /// Remove every expired or unreadable entry, returning how many were removed
    pub async fn cleanup(&self) -> usize {
        if !self.enabled {
            return 0;
        }

        info!("Cleaning up expired cache entries...");
        let now = now_ms();
        let mut removed = 0;

        for key in self.storage.keys().await {
            let stale = match self.storage.get(&key).await {
                Ok(Some(document)) => match serde_json::from_str::<CacheEnvelope>(&document) {
                    Ok(envelope) => envelope.is_expired_at(now),
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(e) => {
                    warn!("Unable to read cache entry {}: {}", key, e);
                    false
                }
            };

            if stale {
                self.purge(&key).await;
                debug!("Removed expired item: {}", key);
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Removed {} expired cache entries", removed);
        }
        removed
    }

    /// Cached channel list for a playlist source
    pub async fn get_channels(&self, source: &str) -> Option<Vec<Channel>> {
        self.get(source).await
    }

    pub async fn set_channels(&self, source: &str, channels: &[Channel]) {
        self.set_default(source, channels).await;
    }

    async fn load_envelope(&self, key: &str) -> Option<CacheEnvelope> {
        let document = match self.storage.get(key).await {
            Ok(document) => document?,
            Err(e) => {
                error!("Error reading from storage: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&document) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                error!("Error reading from storage, removing {}: {}", key, e);
                self.purge(key).await;
                None
            }
        }
    }

    async fn purge(&self, key: &str) {
        if let Some(mirror) = &self.mirror {
            mirror.lock().await.pop(key);
        }
        if let Err(e) = self.storage.remove(key).await {
            warn!("Failed to remove cache entry {}: {}", key, e);
        }
    }

    async fn mirror_get(&self, key: &str) -> Option<CacheEnvelope> {
        let mirror = self.mirror.as_ref()?;
        mirror.lock().await.get(key).cloned()
    }

    async fn mirror_put(&self, key: &str, envelope: CacheEnvelope) {
        if let Some(mirror) = &self.mirror {
            mirror.lock().await.put(key.to_string(), envelope);
        }
    }
}

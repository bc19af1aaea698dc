use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Entries, KeyValueStorage};
use crate::errors::StorageResult;

/// Name of the JSON document holding every entry
pub const STORAGE_FILE_NAME: &str = "storage.json";

/// File-backed storage: one JSON object persisted under a directory
///
/// Entries are held in memory and the whole document is rewritten on every
/// mutation (written to a temporary file, then renamed over the original).
/// A mutation only becomes visible once it has been persisted.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl FileStorage {
    /// Open (or create) the storage document in `directory`
    ///
    /// An unreadable or corrupt document is logged and replaced by an empty
    /// store rather than failing startup.
    pub async fn open<P: AsRef<Path>>(directory: P, capacity_bytes: usize) -> StorageResult<Self> {
        let directory = directory.as_ref();
        tokio::fs::create_dir_all(directory).await?;
        let path = directory.join(STORAGE_FILE_NAME);

        let map = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Discarding corrupt storage document {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Opened storage {} with {} entries",
            path.display(),
            map.len()
        );

        Ok(Self {
            path,
            entries: RwLock::new(Entries::from_map(map, capacity_bytes)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &Entries) -> StorageResult<()> {
        let document = serde_json::to_string(entries.map())?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, document).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!("Persisted {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().await.get(key))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        let mut updated = entries.clone();
        updated.set(key, value)?;
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        let mut updated = entries.clone();
        if updated.remove(key) {
            self.persist(&updated).await?;
            *entries = updated;
        }
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

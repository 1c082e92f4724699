//! Schema-versioned, device-local cache of the user's feed progress.
//!
//! # Layout
//! - `meta/schema.json` holds `{"version": N}`.
//! - `progress/<user_id>.json` holds one [`ProgressRecord`] per user.
//!
//! # Invariants
//! - The stored version never exceeds [`CACHE_SCHEMA_VERSION`] after `open`;
//!   a newer store is a conflict and is reset.
//! - Upgrades run in order and rewrite every entry; entries that cannot be
//!   upgraded are dropped.

use feed_core::{PostingId, ProgressCache, ProgressRecord, StoreError, UserId};
use serde::{Deserialize, Serialize};

use crate::{Storage, StorageError};

/// Schema version written by this build.
pub const CACHE_SCHEMA_VERSION: u32 = 2;

const META_KEY: &str = "meta/schema.json";
const PROGRESS_DIR: &str = "progress";

#[derive(Debug, Serialize, Deserialize)]
struct SchemaMeta {
    version: u32,
}

/// Version 1 entries, written before records carried the owner and the item
/// ordering key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressV1 {
    item_id: PostingId,
    index: usize,
    #[serde(default)]
    timestamp: i64,
}

/// Progress cache backed by [`Storage`].
#[derive(Debug, Clone)]
pub struct LocalProgressCache {
    storage: Storage,
}

impl LocalProgressCache {
    /// Open the cache, upgrading or resetting the on-disk schema as needed.
    pub async fn open(storage: Storage) -> Result<Self, StorageError> {
        let cache = Self { storage };

        match cache.stored_version().await {
            Ok(Some(version)) if version == CACHE_SCHEMA_VERSION => {}
            Ok(Some(version)) if version > CACHE_SCHEMA_VERSION => {
                tracing::warn!(
                    "{}; resetting local progress cache",
                    StorageError::SchemaConflict {
                        found: version,
                        supported: CACHE_SCHEMA_VERSION,
                    }
                );
                cache.reset().await?;
            }
            Ok(Some(version)) => cache.upgrade_from(version).await?,
            Ok(None) => {
                // Entries without a meta file predate schema versioning.
                if cache.storage.list_keys(PROGRESS_DIR).await?.is_empty() {
                    cache.write_version(CACHE_SCHEMA_VERSION).await?;
                } else {
                    cache.upgrade_from(1).await?;
                }
            }
            Err(e) => {
                tracing::warn!("Unreadable cache schema meta ({}); resetting", e);
                cache.reset().await?;
            }
        }

        Ok(cache)
    }

    /// Open the cache on a backend selected from the environment.
    pub async fn from_env() -> Result<Self, StorageError> {
        Self::open(Storage::from_env()?).await
    }

    fn key(user: &UserId) -> String {
        format!("{PROGRESS_DIR}/{}.json", user.as_str())
    }

    fn user_from_key(key: &str) -> Option<UserId> {
        let name = key.rsplit('/').next()?;
        let stem = name.strip_suffix(".json")?;
        UserId::parse(stem).ok()
    }

    async fn stored_version(&self) -> Result<Option<u32>, StorageError> {
        match self.storage.get_bytes_opt(META_KEY).await? {
            Some(bytes) => {
                let meta: SchemaMeta = serde_json::from_slice(&bytes)?;
                Ok(Some(meta.version))
            }
            None => Ok(None),
        }
    }

    async fn write_version(&self, version: u32) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(&SchemaMeta { version })?;
        self.storage.put_bytes(META_KEY, bytes.into()).await
    }

    /// Schema version currently recorded on disk.
    pub async fn schema_version(&self) -> Result<Option<u32>, StorageError> {
        self.stored_version().await
    }

    async fn upgrade_from(&self, from: u32) -> Result<(), StorageError> {
        tracing::info!(
            "Upgrading local progress cache v{} -> v{}",
            from,
            CACHE_SCHEMA_VERSION
        );
        let mut version = from;
        while version < CACHE_SCHEMA_VERSION {
            match version {
                1 => self.upgrade_v1_to_v2().await?,
                other => {
                    tracing::warn!("No upgrade path from cache v{}; resetting", other);
                    return self.reset().await;
                }
            }
            version += 1;
            self.write_version(version).await?;
        }
        Ok(())
    }

    async fn upgrade_v1_to_v2(&self) -> Result<(), StorageError> {
        for key in self.storage.list_keys(PROGRESS_DIR).await? {
            let upgraded = match (Self::user_from_key(&key), self.storage.get_bytes(&key).await) {
                (Some(user), Ok(bytes)) => serde_json::from_slice::<ProgressV1>(&bytes)
                    .ok()
                    .map(|old| {
                        ProgressRecord::new(user, old.item_id, old.index, None, old.timestamp)
                    }),
                _ => None,
            };

            match upgraded {
                Some(record) => {
                    let bytes = serde_json::to_vec(&record)?;
                    self.storage.put_bytes(&key, bytes.into()).await?;
                }
                None => {
                    tracing::warn!("Dropping unreadable v1 cache entry {}", key);
                    self.storage.delete(&key).await?;
                }
            }
        }
        Ok(())
    }

    /// Destroy every cached record and stamp the current schema version.
    pub async fn reset(&self) -> Result<(), StorageError> {
        let keys = self.storage.list_keys(PROGRESS_DIR).await?;
        tracing::warn!("Resetting local progress cache ({} entries)", keys.len());
        for key in keys {
            self.storage.delete(&key).await?;
        }
        self.write_version(CACHE_SCHEMA_VERSION).await
    }

    /// Read the user's record. Corrupt entries are deleted and read as absent.
    pub async fn load(&self, user: &UserId) -> Result<Option<ProgressRecord>, StorageError> {
        let key = Self::key(user);
        let Some(bytes) = self.storage.get_bytes_opt(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<ProgressRecord>(&bytes) {
            Ok(record) if &record.user_id == user => Ok(Some(record)),
            Ok(record) => {
                tracing::warn!(
                    "Cache entry {} belongs to {}; discarding",
                    key,
                    record.user_id
                );
                self.storage.delete(&key).await?;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Corrupt cache entry {}: {}; discarding", key, e);
                self.storage.delete(&key).await?;
                Ok(None)
            }
        }
    }

    /// Write the user's record. A failed write resets the store and retries once.
    pub async fn store(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let key = Self::key(&record.user_id);
        let bytes = bytes::Bytes::from(serde_json::to_vec(record)?);

        match self.storage.put_bytes(&key, bytes.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Cache write for {} failed: {}; resetting", record.user_id, e);
                self.reset().await?;
                self.storage.put_bytes(&key, bytes).await
            }
        }
    }
}

fn to_store_error(e: StorageError) -> StoreError {
    match e {
        StorageError::Json(e) => StoreError::Corrupt(e.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

impl ProgressCache for LocalProgressCache {
    async fn get(&self, user: &UserId) -> Result<Option<ProgressRecord>, StoreError> {
        self.load(user).await.map_err(to_store_error)
    }

    async fn put(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.store(record).await.map_err(to_store_error)
    }
}

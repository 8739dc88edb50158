use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cacache::Integrity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::adapter::{AdapterKind, CacheAdapter, CacheError, effective_retention};
use super::entry::CacheEntry;
use super::key::CacheKey;

/// Record kept in the `cacache` index next to the body hash.
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecordHeader {
    headers: BTreeMap<String, String>,
    stored_at: DateTime<Utc>,
    ttl_seconds: u64,
    expires_at: DateTime<Utc>,
}

/// On-disk response cache backed by `cacache`.
///
/// Bodies are content-addressed; the index entry for a key carries the
/// headers, timestamp, ttl and physical expiry as JSON metadata. Entries whose
/// metadata does not parse, whose content fails its integrity check, or that
/// are past their expiry are removed on read.
#[derive(Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DiskCache").field(&self.root).finish()
    }
}

impl DiskCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            CacheError::Unavailable(format!(
                "cannot create cache dir {}: {e}",
                root.display()
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drops the index entry for `key` and, when known, the body it pointed
    /// at.
    async fn purge(&self, key: &CacheKey, integrity: Option<&Integrity>) -> Result<(), CacheError> {
        cacache::index::RemoveOpts::new()
            .remove_fully(true)
            .remove(&self.root, key.as_str())
            .await
            .map_err(|e| CacheError::Unavailable(format!("cacache remove failed: {e}")))?;

        if let Some(integrity) = integrity {
            self.remove_content(integrity).await;
        }
        Ok(())
    }

    async fn purge_corrupt(
        &self,
        key: &CacheKey,
        integrity: Option<&Integrity>,
        reason: &str,
    ) -> Result<(), CacheError> {
        warn!("Purging corrupt disk cache entry {key}: {reason}");
        self.purge(key, integrity).await
    }

    /// Content removal is best effort; a body another key still shares is
    /// re-fetched on that key's next read.
    async fn remove_content(&self, integrity: &Integrity) {
        if let Err(e) = cacache::remove_hash(&self.root, integrity).await {
            debug!("cacache remove_hash failed for {integrity}: {e}");
        }
    }
}

#[async_trait]
impl CacheAdapter for DiskCache {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Disk
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        debug!("Cache GET: {}", key);

        let meta = match cacache::metadata(&self.root, key.as_str()).await {
            Ok(Some(meta)) => meta,
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                return Ok(None);
            }
            Err(cacache::Error::SerdeError(_, msg)) => {
                self.purge_corrupt(key, None, &msg).await?;
                return Ok(None);
            }
            Err(e) => {
                return Err(CacheError::Unavailable(format!(
                    "cacache metadata failed: {e}"
                )));
            }
        };

        let header: DiskRecordHeader = match serde_json::from_value(meta.metadata) {
            Ok(header) => header,
            Err(e) => {
                self.purge_corrupt(key, Some(&meta.integrity), &e.to_string()).await?;
                return Ok(None);
            }
        };

        if header.expires_at <= Utc::now() {
            debug!("Cache EXPIRED: {}", key);
            self.purge(key, Some(&meta.integrity)).await?;
            return Ok(None);
        }

        let body = match cacache::read_hash(&self.root, &meta.integrity).await {
            Ok(body) => body,
            Err(cacache::Error::EntryNotFound(_, _)) => {
                self.purge_corrupt(key, None, "content missing").await?;
                return Ok(None);
            }
            Err(cacache::Error::IntegrityError(err)) => {
                self.purge_corrupt(key, Some(&meta.integrity), &err.to_string())
                    .await?;
                return Ok(None);
            }
            Err(cacache::Error::SizeMismatch(wanted, actual)) => {
                self.purge_corrupt(
                    key,
                    Some(&meta.integrity),
                    &format!("size mismatch, wanted={wanted}, actual={actual}"),
                )
                .await?;
                return Ok(None);
            }
            Err(cacache::Error::IoError(_, msg)) => {
                return Err(CacheError::Unavailable(format!(
                    "cacache read_hash I/O error: {msg}"
                )));
            }
            Err(cacache::Error::SerdeError(_, msg)) => {
                self.purge_corrupt(key, Some(&meta.integrity), &msg).await?;
                return Ok(None);
            }
        };

        match CacheEntry::new(body, header.headers, header.stored_at, header.ttl_seconds) {
            Ok(entry) => {
                debug!("Cache HIT: {}", key);
                Ok(Some(entry))
            }
            Err(e) => {
                self.purge_corrupt(key, Some(&meta.integrity), &e.to_string())
                    .await?;
                Ok(None)
            }
        }
    }

    async fn store(
        &self,
        key: &CacheKey,
        entry: &CacheEntry,
        retention: Duration,
    ) -> Result<(), CacheError> {
        let retention = effective_retention(entry, retention);
        debug!("Cache SET: {} (retention: {:?})", key, retention);

        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| CacheError::InvalidEntry(format!("retention out of range: {e}")))?;
        let header = DiskRecordHeader {
            headers: entry.headers().clone(),
            stored_at: entry.stored_at(),
            ttl_seconds: entry.ttl_seconds(),
            expires_at: entry.stored_at() + retention,
        };

        // Body the key pointed at before this write, dropped once replaced.
        let previous = cacache::metadata(&self.root, key.as_str())
            .await
            .ok()
            .flatten()
            .map(|meta| meta.integrity);

        let integrity = cacache::write_hash(&self.root, entry.body())
            .await
            .map_err(|e| CacheError::Unavailable(format!("cacache write_hash failed: {e}")))?;

        let opts = cacache::WriteOpts::new()
            .integrity(integrity.clone())
            .size(entry.body().len())
            .metadata(serde_json::to_value(&header)?);

        cacache::index::insert_async(&self.root, key.as_str(), opts)
            .await
            .map_err(|e| CacheError::Unavailable(format!("cacache index insert failed: {e}")))?;

        if let Some(previous) = previous.filter(|previous| *previous != integrity) {
            self.remove_content(&previous).await;
        }

        Ok(())
    }
}

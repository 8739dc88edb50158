use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::entry::CacheEntry;
use super::key::CacheKey;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("invalid cache entry: {0}")]
    InvalidEntry(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Disk,
    Redis,
    Noop,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disk => "disk",
            Self::Redis => "redis",
            Self::Noop => "noop",
        };
        f.write_str(name)
    }
}

/// Storage backend for cached responses.
///
/// Absence is never an error: `lookup` returns `Ok(None)` for missing,
/// expired or corrupt entries (corrupt ones are purged first). `Err` is
/// reserved for an unreachable backend.
#[async_trait]
pub trait CacheAdapter: Send + Sync + fmt::Debug {
    fn kind(&self) -> AdapterKind;

    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Stores `entry`, keeping it physically for at least `retention` and
    /// never less than the entry's own ttl.
    async fn store(
        &self,
        key: &CacheKey,
        entry: &CacheEntry,
        retention: Duration,
    ) -> Result<(), CacheError>;
}

/// Physical lifetime of a stored entry.
pub(crate) fn effective_retention(entry: &CacheEntry, retention: Duration) -> Duration {
    retention.max(Duration::from_secs(entry.ttl_seconds()))
}

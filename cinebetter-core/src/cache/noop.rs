use std::time::Duration;

use async_trait::async_trait;

use super::adapter::{AdapterKind, CacheAdapter, CacheError};
use super::entry::CacheEntry;
use super::key::CacheKey;

/// Never stores, always misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheAdapter for NoopCache {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Noop
    }

    async fn lookup(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(None)
    }

    async fn store(
        &self,
        _key: &CacheKey,
        _entry: &CacheEntry,
        _retention: Duration,
    ) -> Result<(), CacheError> {
        Ok(())
    }
}

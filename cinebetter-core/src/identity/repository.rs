use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a primary id resolved to in the secondary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tmdb_id", rename_all = "lowercase")]
pub enum Disposition {
    Movie(u64),
    Series(u64),
    /// Looked up and found nothing.
    None,
}

impl Disposition {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Movie(_) => "movie",
            Self::Series(_) => "series",
            Self::None => "none",
        }
    }

    pub fn target_id(&self) -> Option<u64> {
        match self {
            Self::Movie(id) | Self::Series(id) => Some(*id),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapping {
    pub source_id: String,
    pub disposition: Disposition,
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt mapping for {source_id}: {reason}")]
    Corrupt { source_id: String, reason: String },
}

/// Persistent primary-to-secondary id mappings.
///
/// Inserts never overwrite: the first mapping written for an id wins and a
/// concurrent duplicate insert is not an error.
#[async_trait]
pub trait IdMappingRepository: Send + Sync + fmt::Debug {
    async fn find(&self, source_id: &str) -> Result<Option<Disposition>, RepositoryError>;

    /// Returns `true` when this call created the mapping.
    async fn insert_if_absent(&self, mapping: &IdMapping) -> Result<bool, RepositoryError>;
}

/// Process-local store used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryIdMappingRepository {
    mappings: DashMap<String, Disposition>,
}

impl MemoryIdMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[async_trait]
impl IdMappingRepository for MemoryIdMappingRepository {
    async fn find(&self, source_id: &str) -> Result<Option<Disposition>, RepositoryError> {
        Ok(self.mappings.get(source_id).map(|entry| *entry.value()))
    }

    async fn insert_if_absent(&self, mapping: &IdMapping) -> Result<bool, RepositoryError> {
        let mut created = false;
        self.mappings
            .entry(mapping.source_id.clone())
            .or_insert_with(|| {
                created = true;
                mapping.disposition
            });
        Ok(created)
    }
}

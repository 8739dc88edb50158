use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::repository::{Disposition, IdMapping, IdMappingRepository};
use crate::providers::{ExternalIdLookup, ProviderError};

/// Secondary ids found for a primary id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TmdbMatch {
    pub movie: Option<u64>,
    pub series: Option<u64>,
}

impl TmdbMatch {
    pub fn is_empty(&self) -> bool {
        self.movie.is_none() && self.series.is_none()
    }
}

impl From<Disposition> for TmdbMatch {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Movie(id) => Self {
                movie: Some(id),
                series: None,
            },
            Disposition::Series(id) => Self {
                movie: None,
                series: Some(id),
            },
            Disposition::None => Self::default(),
        }
    }
}

/// Outcome of resolving a title with its connection fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch {
    pub matched: TmdbMatch,
    /// Set when the match came from the connection id rather than the
    /// title's own id.
    pub used_connection: Option<String>,
}

impl TitleMatch {
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Resolves IMDb ids to TMDB ids through a persistent memo.
#[derive(Clone)]
pub struct IdentifierResolver {
    store: Arc<dyn IdMappingRepository>,
    lookup: Arc<dyn ExternalIdLookup>,
}

impl fmt::Debug for IdentifierResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierResolver")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl IdentifierResolver {
    pub fn new(store: Arc<dyn IdMappingRepository>, lookup: Arc<dyn ExternalIdLookup>) -> Self {
        Self { store, lookup }
    }

    /// Resolves one id.
    ///
    /// A stored mapping answers without any lookup. Otherwise the external
    /// service is asked and the first movie, else first series, result is
    /// stored. An empty answer is stored only when `allow_negative_memo` is
    /// set. Store failures are logged and do not fail the resolution.
    pub async fn resolve(
        &self,
        source_id: &str,
        allow_negative_memo: bool,
    ) -> Result<TmdbMatch, ProviderError> {
        match self.store.find(source_id).await {
            Ok(Some(disposition)) => {
                debug!("Identifier memo hit {} -> {}", source_id, disposition.kind());
                return Ok(disposition.into());
            }
            Ok(None) => {}
            Err(e) => warn!("Identifier store read failed for {source_id}: {e}"),
        }

        let found = self.lookup.find_by_imdb_id(source_id).await?;
        let matched = TmdbMatch {
            movie: found.movie_ids.first().copied(),
            series: found.series_ids.first().copied(),
        };

        let disposition = match matched {
            TmdbMatch {
                movie: Some(id), ..
            } => Some(Disposition::Movie(id)),
            TmdbMatch {
                series: Some(id), ..
            } => Some(Disposition::Series(id)),
            _ if allow_negative_memo => Some(Disposition::None),
            _ => None,
        };

        if let Some(disposition) = disposition {
            let mapping = IdMapping {
                source_id: source_id.to_string(),
                disposition,
            };
            if let Err(e) = self.store.insert_if_absent(&mapping).await {
                warn!("Identifier store write failed for {source_id}: {e}");
            }
        }

        Ok(matched)
    }

    /// Resolves a title's own id, falling back to its connection id.
    ///
    /// The own id may only be memoized as a miss when there is no connection
    /// to try. The connection, as the last candidate, always may.
    pub async fn resolve_with_fallback(
        &self,
        title_id: &str,
        connection_id: Option<&str>,
    ) -> Result<TitleMatch, ProviderError> {
        let own = self.resolve(title_id, connection_id.is_none()).await?;

        match connection_id {
            Some(connection) if own.is_empty() => {
                debug!("No match for {title_id}, trying connection {connection}");
                let matched = self.resolve(connection, true).await?;
                Ok(TitleMatch {
                    matched,
                    used_connection: Some(connection.to_string()),
                })
            }
            _ => Ok(TitleMatch {
                matched: own,
                used_connection: None,
            }),
        }
    }
}

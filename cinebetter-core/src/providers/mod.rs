//! Upstream ports: the title catalog (IMDb GraphQL) and the secondary
//! identifier service (TMDB).

pub mod imdb;
pub mod tmdb;

use std::fmt;

use async_trait::async_trait;

use crate::episodes::{EpisodeRecord, PagedConnection};
use crate::settings::LanguageCode;
use crate::title::{ContentType, RawTitle};

pub use imdb::ImdbClient;
pub use tmdb::TmdbClient;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Query rejected: {0}")]
    QueryRejected(String),

    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ProviderError {
    /// True when the upstream could not be reached or is temporarily refusing
    /// work, as opposed to rejecting the request itself.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
    Popularity,
    UserRating,
}

/// Minimum audience rating for a constrained search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingFloor {
    pub min_votes: u32,
    pub min_rating: f64,
}

/// A constrained, sorted title listing.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedSearch {
    pub content_type: ContentType,
    pub genre: Option<String>,
    pub release_year: Option<i32>,
    pub rating_floor: Option<RatingFloor>,
    pub sort: SearchSort,
    pub first: u32,
    pub skip: u32,
}

/// Title catalog queries. Every call carries the caller's language so the
/// upstream can localise titles and plots.
#[async_trait]
pub trait TitleProvider: Send + Sync + fmt::Debug {
    /// Full title including the first page of episodes. `None` when the id
    /// does not exist upstream.
    async fn title(
        &self,
        id: &str,
        language: &LanguageCode,
    ) -> Result<Option<RawTitle>, ProviderError>;

    /// The episode page after `cursor`. `None` when the upstream returned no
    /// page data.
    async fn more_episodes(
        &self,
        id: &str,
        cursor: &str,
        language: &LanguageCode,
    ) -> Result<Option<PagedConnection<EpisodeRecord>>, ProviderError>;

    /// Several titles at once, each with its latest `episode_count` episodes.
    async fn titles(
        &self,
        ids: &[String],
        episode_count: u32,
        language: &LanguageCode,
    ) -> Result<Vec<RawTitle>, ProviderError>;

    async fn main_search(
        &self,
        term: &str,
        content_type: ContentType,
        language: &LanguageCode,
    ) -> Result<Vec<RawTitle>, ProviderError>;

    async fn advanced_search(
        &self,
        search: &AdvancedSearch,
        language: &LanguageCode,
    ) -> Result<Vec<RawTitle>, ProviderError>;
}

/// Identifiers the secondary service knows for a primary id, in relevance
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalMatches {
    pub movie_ids: Vec<u64>,
    pub series_ids: Vec<u64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalIdLookup: Send + Sync {
    async fn find_by_imdb_id(&self, imdb_id: &str) -> Result<ExternalMatches, ProviderError>;
}

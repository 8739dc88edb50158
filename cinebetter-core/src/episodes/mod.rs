pub mod normalizer;
pub mod paginator;

use serde::{Deserialize, Serialize};

use crate::title::PartialDate;

pub use normalizer::{UNKNOWN_SEASON, normalize_episodes};
pub use paginator::{MAX_PAGES, collect_all_pages, collect_all_pages_with_limit};

/// One episode of an episodic title. Season and episode are the provider's
/// display labels, not parsed numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: String,
    pub season: String,
    pub episode: String,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub released: Option<PartialDate>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    pub fn last() -> Self {
        Self::default()
    }

    pub fn next(cursor: impl Into<String>) -> Self {
        Self {
            has_next_page: true,
            end_cursor: Some(cursor.into()),
        }
    }

    /// Cursor for the next page, if there is one to fetch.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedConnection<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

impl<T> PagedConnection<T> {
    pub fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }
}

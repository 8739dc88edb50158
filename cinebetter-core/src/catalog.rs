//! Catalog identifiers, the `extra` path segment and how each catalog maps
//! onto an upstream query.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::form_urlencoded;

use crate::providers::{AdvancedSearch, RatingFloor, SearchSort};
use crate::title::ContentType;

/// Page size of the discover catalogs.
pub const DISCOVER_PAGE_SIZE: u32 = 50;
pub const CALENDAR_EPISODE_COUNT: u32 = 10;
pub const NOTIFICATIONS_EPISODE_COUNT: u32 = 20;

const FEATURED_MIN_VOTES: u32 = 2000;
const FEATURED_MIN_RATING: f64 = 6.5;

/// Genre option that stands for "no genre constraint".
pub const ALL_GENRES: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogId {
    Search,
    Popular,
    New,
    Featured,
    Calendar,
    Notifications,
}

impl CatalogId {
    pub const ALL: [CatalogId; 6] = [
        Self::Search,
        Self::Popular,
        Self::New,
        Self::Featured,
        Self::Calendar,
        Self::Notifications,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Popular => "top",
            Self::New => "year",
            Self::Featured => "imdbRating",
            Self::Calendar => "calendar",
            Self::Notifications => "notifications",
        }
    }

    /// Detailed catalogs answer under `metasDetailed` instead of `metas`.
    pub fn is_detailed(self) -> bool {
        matches!(self, Self::Calendar | Self::Notifications)
    }

    /// Response body key.
    pub fn body_key(self) -> &'static str {
        if self.is_detailed() {
            "metasDetailed"
        } else {
            "metas"
        }
    }

    /// Freshness window of a catalog response.
    pub fn ttl_days(self) -> u32 {
        match self {
            Self::Search => 1,
            _ => 7,
        }
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown catalog: {0}")]
pub struct UnknownCatalog(pub String);

impl FromStr for CatalogId {
    type Err = UnknownCatalog;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownCatalog(s.to_string()))
    }
}

/// Parsed `extra` segment, e.g. `genre=Horror&skip=50`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogExtras {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub skip: u32,
    pub calendar_video_ids: Option<Vec<String>>,
    pub last_video_ids: Option<Vec<String>>,
}

impl CatalogExtras {
    /// Parses the segment. Unknown keys are ignored, the first occurrence of
    /// a key wins and an unparseable `skip` reads as 0.
    pub fn parse(segment: &str) -> Self {
        let mut extras = Self::default();
        let mut skip = None;

        for (key, value) in form_urlencoded::parse(segment.as_bytes()) {
            match key.as_ref() {
                "search" if extras.search.is_none() => extras.search = Some(value.into_owned()),
                "genre" if extras.genre.is_none() => extras.genre = Some(value.into_owned()),
                "skip" if skip.is_none() => skip = Some(value.trim().parse().unwrap_or(0)),
                "calendarVideosIds" if extras.calendar_video_ids.is_none() => {
                    extras.calendar_video_ids = Some(split_ids(&value));
                }
                "lastVideosIds" if extras.last_video_ids.is_none() => {
                    extras.last_video_ids = Some(split_ids(&value));
                }
                _ => {}
            }
        }

        extras.skip = skip.unwrap_or(0);
        extras
    }

    /// Genre constraint, with the `All` option meaning none.
    pub fn genre_constraint(&self) -> Option<&str> {
        self.genre.as_deref().filter(|genre| *genre != ALL_GENRES)
    }
}

fn split_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// The upstream query a catalog request turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogQuery {
    Search {
        term: String,
        content_type: ContentType,
    },
    Advanced(AdvancedSearch),
    Bulk {
        ids: Vec<String>,
        episode_count: u32,
    },
}

impl CatalogQuery {
    /// Plans the query for a catalog request. `None` means the request is
    /// missing the extra it needs and the catalog is empty.
    pub fn plan(catalog: CatalogId, content_type: ContentType, extras: &CatalogExtras) -> Option<Self> {
        match catalog {
            CatalogId::Search => extras.search.clone().map(|term| Self::Search { term, content_type }),
            CatalogId::Calendar => extras.calendar_video_ids.clone().map(|ids| Self::Bulk {
                ids,
                episode_count: CALENDAR_EPISODE_COUNT,
            }),
            CatalogId::Notifications => extras.last_video_ids.clone().map(|ids| Self::Bulk {
                ids,
                episode_count: NOTIFICATIONS_EPISODE_COUNT,
            }),
            CatalogId::Popular | CatalogId::New | CatalogId::Featured => {
                discover_search(catalog, content_type, extras).map(Self::Advanced)
            }
        }
    }
}

fn discover_search(
    catalog: CatalogId,
    content_type: ContentType,
    extras: &CatalogExtras,
) -> Option<AdvancedSearch> {
    let genre = extras.genre_constraint();
    let base = AdvancedSearch {
        content_type,
        genre: None,
        release_year: None,
        rating_floor: None,
        sort: SearchSort::Popularity,
        first: DISCOVER_PAGE_SIZE,
        skip: extras.skip,
    };

    match catalog {
        CatalogId::Popular => Some(AdvancedSearch {
            genre: genre.map(str::to_string),
            ..base
        }),
        // the year catalog carries its year in the genre slot
        CatalogId::New => {
            let year = genre?.parse().ok()?;
            Some(AdvancedSearch {
                release_year: Some(year),
                ..base
            })
        }
        CatalogId::Featured => Some(AdvancedSearch {
            genre: genre.map(str::to_string),
            rating_floor: Some(RatingFloor {
                min_votes: FEATURED_MIN_VOTES,
                min_rating: FEATURED_MIN_RATING,
            }),
            sort: SearchSort::UserRating,
            ..base
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_round_trip_through_wire_names() {
        assert_eq!("imdbRating".parse::<CatalogId>().unwrap(), CatalogId::Featured);
        assert_eq!("top".parse::<CatalogId>().unwrap(), CatalogId::Popular);
        assert!("trending".parse::<CatalogId>().is_err());
        assert_eq!(CatalogId::Calendar.body_key(), "metasDetailed");
        assert_eq!(CatalogId::Popular.body_key(), "metas");
    }

    #[test]
    fn parses_extras() {
        let extras = CatalogExtras::parse("genre=Sci-Fi&skip=100&search=the%20wire&genre=Drama");
        assert_eq!(extras.genre.as_deref(), Some("Sci-Fi"));
        assert_eq!(extras.skip, 100);
        assert_eq!(extras.search.as_deref(), Some("the wire"));

        let extras = CatalogExtras::parse("skip=abc&calendarVideosIds=tt1,tt2,,tt3");
        assert_eq!(extras.skip, 0);
        assert_eq!(
            extras.calendar_video_ids,
            Some(vec!["tt1".to_string(), "tt2".to_string(), "tt3".to_string()])
        );
    }

    #[test]
    fn all_genre_means_unconstrained() {
        let extras = CatalogExtras::parse("genre=All");
        let Some(CatalogQuery::Advanced(search)) =
            CatalogQuery::plan(CatalogId::Popular, ContentType::Movie, &extras)
        else {
            panic!("expected an advanced search");
        };
        assert_eq!(search.genre, None);
    }

    #[test]
    fn year_catalog_requires_a_year() {
        let none = CatalogQuery::plan(CatalogId::New, ContentType::Series, &CatalogExtras::default());
        assert_eq!(none, None);

        let extras = CatalogExtras::parse("genre=1999&skip=50");
        let Some(CatalogQuery::Advanced(search)) =
            CatalogQuery::plan(CatalogId::New, ContentType::Series, &extras)
        else {
            panic!("expected an advanced search");
        };
        assert_eq!(search.release_year, Some(1999));
        assert_eq!(search.skip, 50);
        assert_eq!(search.sort, SearchSort::Popularity);
    }

    #[test]
    fn featured_applies_rating_floor() {
        let extras = CatalogExtras::parse("genre=Horror");
        let Some(CatalogQuery::Advanced(search)) =
            CatalogQuery::plan(CatalogId::Featured, ContentType::Movie, &extras)
        else {
            panic!("expected an advanced search");
        };
        assert_eq!(search.sort, SearchSort::UserRating);
        assert_eq!(search.genre.as_deref(), Some("Horror"));
        assert_eq!(search.rating_floor.map(|f| f.min_votes), Some(2000));
    }

    #[test]
    fn bulk_catalogs_pick_episode_counts() {
        let extras = CatalogExtras::parse("lastVideosIds=tt1");
        assert_eq!(
            CatalogQuery::plan(CatalogId::Notifications, ContentType::Series, &extras),
            Some(CatalogQuery::Bulk {
                ids: vec!["tt1".to_string()],
                episode_count: 20,
            })
        );
        assert_eq!(
            CatalogQuery::plan(CatalogId::Calendar, ContentType::Series, &extras),
            None
        );
        assert_eq!(
            CatalogQuery::plan(CatalogId::Search, ContentType::Series, &extras),
            None
        );
    }
}

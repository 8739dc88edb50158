//! Canonical raw title shape shared by every upstream query.
//!
//! The full-title, bulk and search queries each return a different subset of
//! these fields; anything a query does not select is left empty.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::episodes::{EpisodeRecord, PagedConnection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    pub fn from_episodic(can_have_episodes: bool) -> Self {
        if can_have_episodes {
            Self::Series
        } else {
            Self::Movie
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported content type: {0}")]
pub struct UnsupportedContentType(pub String);

impl FromStr for ContentType {
    type Err = UnsupportedContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "series" => Ok(Self::Series),
            other => Err(UnsupportedContentType(other.to_string())),
        }
    }
}

/// A date where month and day may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl PartialDate {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    /// Midnight UTC of the date, rounding unknown parts up to the last
    /// month / day of the year. Invalid days clamp to the end of the month.
    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        let month = self.month.unwrap_or(12);
        let day = self.day.unwrap_or(31);

        let date = NaiveDate::from_ymd_opt(self.year, month, day).or_else(|| {
            (28..day.min(31))
                .rev()
                .find_map(|d| NaiveDate::from_ymd_opt(self.year, month, d))
        })?;

        Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseYear {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalCredits {
    pub category: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTitle {
    pub id: Option<String>,
    pub name: Option<String>,
    pub can_have_episodes: bool,
    pub release_year: ReleaseYear,
    pub release_date: Option<PartialDate>,
    pub plot: Option<String>,
    pub rating: Option<f64>,
    pub poster: Option<String>,
    pub runtime: Option<String>,
    pub genres: Vec<String>,
    pub credits: Vec<PrincipalCredits>,
    pub episodes: Option<PagedConnection<EpisodeRecord>>,
    /// Deepest "follows" connection within two hops.
    pub connection_id: Option<String>,
}

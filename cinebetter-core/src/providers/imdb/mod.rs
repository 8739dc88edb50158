pub mod queries;
mod wire;

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error};

use super::{AdvancedSearch, ProviderError, SearchSort, TitleProvider};
use crate::episodes::{EpisodeRecord, PagedConnection};
use crate::settings::LanguageCode;
use crate::title::{ContentType, RawTitle};
use wire::{
    AdvancedSearchData, GraphQlResponse, MainSearchData, TitleData, TitlesData,
};

pub const DEFAULT_IMDB_GRAPHQL_URL: &str = "https://api.graphql.imdb.com/";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.3";

const SERIES_TITLE_TYPES: [&str; 2] = ["tvSeries", "tvMiniSeries"];
const MOVIE_TITLE_TYPES: [&str; 4] = ["movie", "short", "tvSpecial", "tvShort"];
const SEARCH_LANGUAGES: [&str; 4] = ["en", "ja", "ko", "zh"];

#[derive(Clone)]
pub struct ImdbClient {
    http: reqwest::Client,
    endpoint: String,
}

impl fmt::Debug for ImdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImdbClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ImdbClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    fn headers(language: &LanguageCode) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(language.as_str()) {
            headers.insert("x-imdb-user-language", value);
        }
        if let Ok(value) = HeaderValue::from_str(language.country()) {
            headers.insert("x-imdb-user-country", value);
        }
        headers
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        document: String,
        variables: Value,
        language: &LanguageCode,
    ) -> Result<Option<T>, ProviderError> {
        debug!("IMDb GraphQL {} ({})", operation, language);

        let response = self
            .http
            .post(&self.endpoint)
            .headers(Self::headers(language))
            .json(&json!({
                "operationName": operation,
                "query": document,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        let parsed: Result<GraphQlResponse<T>, _> = serde_json::from_slice(&bytes);
        let body = match parsed {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(ProviderError::ParseError(format!(
                    "{operation} response: {e}"
                )));
            }
            Err(_) => {
                return Err(ProviderError::UnexpectedStatus {
                    status: status.as_u16(),
                    message: format!("IMDb {operation} request failed"),
                });
            }
        };

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            error!("GraphQL error in {}: {}", operation, message);
            return Err(ProviderError::QueryRejected(message));
        }

        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                message: format!("IMDb {operation} request failed"),
            });
        }

        Ok(body.data)
    }
}

fn title_type_ids(content_type: ContentType) -> &'static [&'static str] {
    match content_type {
        ContentType::Series => &SERIES_TITLE_TYPES,
        ContentType::Movie => &MOVIE_TITLE_TYPES,
    }
}

/// GraphQL variables for an advanced title search.
pub fn advanced_search_variables(search: &AdvancedSearch) -> Value {
    let mut constraints = json!({
        "titleTypeConstraint": { "anyTitleTypeIds": title_type_ids(search.content_type) },
        "languageConstraint": { "anyLanguages": SEARCH_LANGUAGES },
    });

    if let Some(genre) = &search.genre {
        constraints["genreConstraint"] = json!({ "allGenreIds": [genre] });
    }
    if let Some(year) = search.release_year {
        constraints["releaseDateConstraint"] = json!({
            "releaseDateRange": {
                "start": format!("{year}-01-01"),
                "end": format!("{year}-12-31"),
            }
        });
    }
    if let Some(floor) = search.rating_floor {
        constraints["userRatingsConstraint"] = json!({
            "ratingsCountRange": { "min": floor.min_votes },
            "aggregateRatingRange": { "min": floor.min_rating },
        });
    }

    let sort_by = match search.sort {
        SearchSort::Popularity => "POPULARITY",
        SearchSort::UserRating => "USER_RATING",
    };

    json!({
        "search": constraints,
        "sort": { "sortBy": sort_by, "sortOrder": "ASC" },
        "first": search.first,
        "jumpToPosition": (search.skip > 0).then_some(search.skip),
    })
}

#[async_trait]
impl TitleProvider for ImdbClient {
    async fn title(
        &self,
        id: &str,
        language: &LanguageCode,
    ) -> Result<Option<RawTitle>, ProviderError> {
        let data: Option<TitleData> = self
            .query("Title", queries::title_full(), json!({ "id": id }), language)
            .await?;

        Ok(data.and_then(|d| d.title).map(RawTitle::from))
    }

    async fn more_episodes(
        &self,
        id: &str,
        cursor: &str,
        language: &LanguageCode,
    ) -> Result<Option<PagedConnection<EpisodeRecord>>, ProviderError> {
        let data: Option<TitleData> = self
            .query(
                "GetMoreEpisodes",
                queries::more_episodes(),
                json!({ "id": id, "after": cursor }),
                language,
            )
            .await?;

        Ok(data
            .and_then(|d| d.title)
            .and_then(|title| title.into_episode_page()))
    }

    async fn titles(
        &self,
        ids: &[String],
        episode_count: u32,
        language: &LanguageCode,
    ) -> Result<Vec<RawTitle>, ProviderError> {
        let data: Option<TitlesData> = self
            .query(
                "Titles",
                queries::titles(),
                json!({ "ids": ids, "episodeCount": episode_count }),
                language,
            )
            .await?;

        Ok(data
            .and_then(|d| d.titles)
            .into_iter()
            .flatten()
            .flatten()
            .map(RawTitle::from)
            .collect())
    }

    async fn main_search(
        &self,
        term: &str,
        content_type: ContentType,
        language: &LanguageCode,
    ) -> Result<Vec<RawTitle>, ProviderError> {
        let title_type = match content_type {
            ContentType::Series => "TV",
            ContentType::Movie => "MOVIE",
        };
        let variables = json!({
            "search": {
                "type": ["TITLE"],
                "searchTerm": term,
                "titleSearchOptions": { "type": [title_type] },
            }
        });

        let data: Option<MainSearchData> = self
            .query("MainSearch", queries::main_search(), variables, language)
            .await?;

        Ok(data
            .and_then(|d| d.main_search)
            .into_iter()
            .flat_map(|edges| edges.into_nodes())
            .map(|node| node.entity)
            .filter(|entity| entity.is_title())
            .map(RawTitle::from)
            .collect())
    }

    async fn advanced_search(
        &self,
        search: &AdvancedSearch,
        language: &LanguageCode,
    ) -> Result<Vec<RawTitle>, ProviderError> {
        let data: Option<AdvancedSearchData> = self
            .query(
                "AdvancedTitleSearch",
                queries::advanced_title_search(),
                advanced_search_variables(search),
                language,
            )
            .await?;

        Ok(data
            .and_then(|d| d.advanced_title_search)
            .into_iter()
            .flat_map(|edges| edges.into_nodes())
            .map(|node| RawTitle::from(node.title))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::RatingFloor;

    fn search(content_type: ContentType) -> AdvancedSearch {
        AdvancedSearch {
            content_type,
            genre: None,
            release_year: None,
            rating_floor: None,
            sort: SearchSort::Popularity,
            first: 50,
            skip: 0,
        }
    }

    #[test]
    fn popular_search_variables() {
        let variables = advanced_search_variables(&AdvancedSearch {
            genre: Some("Horror".to_string()),
            ..search(ContentType::Series)
        });

        assert_eq!(
            variables["search"]["titleTypeConstraint"]["anyTitleTypeIds"],
            json!(["tvSeries", "tvMiniSeries"])
        );
        assert_eq!(variables["search"]["genreConstraint"]["allGenreIds"], json!(["Horror"]));
        assert_eq!(variables["sort"]["sortBy"], "POPULARITY");
        assert!(variables["jumpToPosition"].is_null());
    }

    #[test]
    fn featured_year_search_variables() {
        let variables = advanced_search_variables(&AdvancedSearch {
            release_year: Some(1999),
            rating_floor: Some(RatingFloor {
                min_votes: 2000,
                min_rating: 6.5,
            }),
            sort: SearchSort::UserRating,
            skip: 100,
            ..search(ContentType::Movie)
        });

        assert_eq!(
            variables["search"]["releaseDateConstraint"]["releaseDateRange"]["start"],
            "1999-01-01"
        );
        assert_eq!(
            variables["search"]["userRatingsConstraint"]["aggregateRatingRange"]["min"],
            6.5
        );
        assert_eq!(variables["sort"]["sortBy"], "USER_RATING");
        assert_eq!(variables["jumpToPosition"], 100);
    }

    #[test]
    fn upstream_headers_follow_language() {
        let headers = ImdbClient::headers(&"fr-ca".parse().unwrap());
        assert_eq!(headers["x-imdb-user-language"], "fr-CA");
        assert_eq!(headers["x-imdb-user-country"], "CA");
    }
}

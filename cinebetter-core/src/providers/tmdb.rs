use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::{ExternalIdLookup, ExternalMatches, ProviderError};

pub const DEFAULT_TMDB_API_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    movie_results: Vec<FindResult>,
    #[serde(default)]
    tv_results: Vec<FindResult>,
}

#[derive(Debug, Deserialize)]
struct FindResult {
    id: u64,
}

/// TMDB v3 client for the `/find` endpoint, authenticated with a bearer
/// token.
#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    async fn get_tmdb_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        let token = self.token.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("TMDB_TOKEN is not set".to_string())
        })?;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| ProviderError::ParseError(format!("TMDB {path}: {e}")));
        }

        #[derive(Debug, Deserialize)]
        struct TmdbErrorBody {
            #[serde(default)]
            status_message: Option<String>,
        }

        let message = response
            .json::<TmdbErrorBody>()
            .await
            .ok()
            .and_then(|body| body.status_message)
            .unwrap_or_else(|| format!("TMDB request failed with status {status}"));

        error!("TMDB request to {} failed: {} ({})", path, message, status);

        match status.as_u16() {
            401 => Err(ProviderError::InvalidApiKey),
            404 => Err(ProviderError::NotFound),
            429 => Err(ProviderError::RateLimited),
            code => Err(ProviderError::UnexpectedStatus {
                status: code,
                message,
            }),
        }
    }
}

#[async_trait]
impl ExternalIdLookup for TmdbClient {
    async fn find_by_imdb_id(&self, imdb_id: &str) -> Result<ExternalMatches, ProviderError> {
        debug!("TMDB find {}", imdb_id);

        let path = format!("/find/{}", urlencoding::encode(imdb_id));
        let found: FindResponse = self
            .get_tmdb_json(&path, &[("external_source", "imdb_id")])
            .await?;

        Ok(ExternalMatches {
            movie_ids: found.movie_results.into_iter().map(|r| r.id).collect(),
            series_ids: found.tv_results.into_iter().map(|r| r.id).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_not_configured() {
        let client = TmdbClient::new(DEFAULT_TMDB_API_URL, Some(String::new()));
        let result = client.find_by_imdb_id("tt0111161").await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn find_response_tolerates_missing_lists() {
        let found: FindResponse =
            serde_json::from_str(r#"{"movie_results":[{"id":278,"title":"x"}]}"#).unwrap();
        assert_eq!(found.movie_results[0].id, 278);
        assert!(found.tv_results.is_empty());
    }
}

//! Meta and catalog lookups behind the HTTP handlers.
//!
//! Each lookup has a plain form returning typed items and an `_outcome` form
//! that renders the response body and freshness window for the cache layer.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde_json::json;
use tracing::{debug, warn};

use crate::cache::{FetchOutcome, GatewayResponse};
use crate::catalog::{CatalogExtras, CatalogId, CatalogQuery};
use crate::episodes::{PagedConnection, collect_all_pages, normalize_episodes};
use crate::error::{GatewayError, Result};
use crate::identity::{IdentifierResolver, TitleMatch};
use crate::projection::{MetaItem, ProjectionOptions, is_ongoing, project};
use crate::providers::{ProviderError, TitleProvider};
use crate::settings::UserSettings;
use crate::title::{ContentType, RawTitle};

pub const META_TTL_DAYS: u32 = 14;
pub const ONGOING_META_TTL_DAYS: u32 = 1;

/// Keying settings for meta responses: only the language matters.
pub fn meta_keying(settings: &UserSettings) -> UserSettings {
    settings.language_only()
}

/// Keying settings for catalog responses. Search results also depend on the
/// low quality filter.
pub fn catalog_keying(settings: &UserSettings, extras: &CatalogExtras) -> UserSettings {
    UserSettings {
        hide_low_quality: extras.search.is_some() && settings.hide_low_quality,
        ..settings.language_only()
    }
}

#[derive(Clone)]
pub struct MetadataService {
    provider: Arc<dyn TitleProvider>,
    resolver: IdentifierResolver,
}

impl fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataService")
            .field("provider", &self.provider)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl MetadataService {
    pub fn new(provider: Arc<dyn TitleProvider>, resolver: IdentifierResolver) -> Self {
        Self { provider, resolver }
    }

    /// Full title with every episode page, identifier match and projection.
    pub async fn full_title(
        &self,
        id: &str,
        settings: &UserSettings,
        transport_url: &str,
    ) -> Result<MetaItem> {
        let language = &settings.language_code;
        let mut title = self
            .provider
            .title(id, language)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("title {id}")))?;

        let title_id = title.id.clone().unwrap_or_else(|| id.to_string());

        if title.can_have_episodes {
            if let Some(initial) = title.episodes.take() {
                let provider = &self.provider;
                let title_id = title_id.as_str();
                let all = collect_all_pages(initial, |cursor: String| async move {
                    provider.more_episodes(title_id, &cursor, language).await
                })
                .await?;

                debug!("Collected {} episodes for {}", all.items.len(), title_id);
                title.episodes = Some(PagedConnection::new(
                    normalize_episodes(all.items),
                    all.page_info,
                ));
            }
        }

        let matched = self.match_title(&title).await?;
        let options = ProjectionOptions {
            transport_url: transport_url.to_string(),
            now: Utc::now(),
        };

        project(&title, matched.as_ref(), false, &options)
            .ok_or_else(|| GatewayError::NotFound(format!("title {id} has no name")))
    }

    /// Meta response for the cache layer. A missing title is a 404 that is
    /// never cached.
    pub async fn meta_outcome(
        &self,
        id: &str,
        settings: &UserSettings,
        transport_url: &str,
    ) -> Result<FetchOutcome> {
        match self.full_title(id, settings, transport_url).await {
            Ok(meta) => {
                let ttl_days = if is_ongoing(meta.release_info.as_deref()) {
                    ONGOING_META_TTL_DAYS
                } else {
                    META_TTL_DAYS
                };
                let response = GatewayResponse::json(&json!({ "meta": meta }))?;
                Ok(FetchOutcome::cacheable(response, ttl_days))
            }
            Err(e) if e.is_not_found() => {
                debug!("Meta {id} not found: {e}");
                Ok(FetchOutcome::uncached(GatewayResponse::not_found()))
            }
            Err(e) => Err(e),
        }
    }

    /// Items of one catalog page. Requests missing their required extra
    /// yield an empty page.
    pub async fn catalog(
        &self,
        catalog: CatalogId,
        content_type: ContentType,
        extras: &CatalogExtras,
        settings: &UserSettings,
        transport_url: &str,
    ) -> Result<Vec<MetaItem>> {
        let Some(query) = CatalogQuery::plan(catalog, content_type, extras) else {
            debug!("Catalog {content_type}/{catalog} is missing its extra");
            return Ok(Vec::new());
        };

        let language = &settings.language_code;
        let options = ProjectionOptions {
            transport_url: transport_url.to_string(),
            now: Utc::now(),
        };

        let titles = match query {
            CatalogQuery::Search { term, content_type } => {
                let titles = self.provider.main_search(&term, content_type, language).await?;
                return self
                    .project_matched(titles, settings.hide_low_quality, &options)
                    .await;
            }
            CatalogQuery::Advanced(search) => self.provider.advanced_search(&search, language).await?,
            CatalogQuery::Bulk { ids, episode_count } => {
                self.provider.titles(&ids, episode_count, language).await?
            }
        };

        Ok(titles
            .iter()
            .filter_map(|title| project(title, None, false, &options))
            .collect())
    }

    /// Catalog response for the cache layer. Unknown catalogs and types are
    /// a 404 that is never cached.
    pub async fn catalog_outcome(
        &self,
        catalog: &str,
        content_type: &str,
        extras: &CatalogExtras,
        settings: &UserSettings,
        transport_url: &str,
    ) -> Result<FetchOutcome> {
        let (Ok(catalog), Ok(content_type)) = (
            catalog.parse::<CatalogId>(),
            content_type.parse::<ContentType>(),
        ) else {
            debug!("Unknown catalog {content_type}/{catalog}");
            return Ok(FetchOutcome::uncached(GatewayResponse::not_found()));
        };

        let metas = self
            .catalog(catalog, content_type, extras, settings, transport_url)
            .await?;
        let response = GatewayResponse::json(&json!({ catalog.body_key(): metas }))?;

        Ok(FetchOutcome::cacheable(response, catalog.ttl_days()))
    }

    async fn project_matched(
        &self,
        titles: Vec<RawTitle>,
        filter_no_match: bool,
        options: &ProjectionOptions,
    ) -> Result<Vec<MetaItem>> {
        let projected = try_join_all(titles.iter().map(|title| async move {
            let matched = self.match_title(title).await?;
            Ok::<_, GatewayError>(project(title, matched.as_ref(), filter_no_match, options))
        }))
        .await?;

        Ok(projected.into_iter().flatten().collect())
    }

    /// Identifier match for a title, with its connection as fallback.
    ///
    /// `None` when the title has no id or no lookup service is configured.
    async fn match_title(&self, title: &RawTitle) -> Result<Option<TitleMatch>> {
        let Some(id) = title.id.as_deref() else {
            return Ok(None);
        };

        match self
            .resolver
            .resolve_with_fallback(id, title.connection_id.as_deref())
            .await
        {
            Ok(matched) => Ok(Some(matched)),
            Err(ProviderError::NotConfigured(reason)) => {
                warn!("Skipping identifier match for {id}: {reason}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

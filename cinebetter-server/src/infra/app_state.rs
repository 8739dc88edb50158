use std::{fmt, sync::Arc};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use cinebetter_core::MetadataService;
use cinebetter_core::cache::{CacheAdapterSelector, ResponseCache, TokioSpawner};
use cinebetter_core::identity::{
    IdMappingRepository, IdentifierResolver, MemoryIdMappingRepository,
    PostgresIdMappingRepository,
};
use cinebetter_core::providers::{ExternalIdLookup, ImdbClient, TitleProvider, TmdbClient};

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<MetadataService>,
    pub cache: ResponseCache,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Arc<Config>, service: Arc<MetadataService>, cache: ResponseCache) -> Self {
        Self {
            config,
            service,
            cache,
        }
    }

    /// Wires the upstream clients, identifier store and response cache
    /// described by `config`.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn IdMappingRepository> = match &config.database.url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("failed to connect to the identifier database")?;
                cinebetter_core::MIGRATOR
                    .run(&pool)
                    .await
                    .context("failed to run identifier database migrations")?;
                info!("identifier mappings stored in Postgres");
                Arc::new(PostgresIdMappingRepository::new(pool))
            }
            None => {
                info!("identifier mappings stored in memory");
                Arc::new(MemoryIdMappingRepository::new())
            }
        };

        let provider: Arc<dyn TitleProvider> =
            Arc::new(ImdbClient::new(config.upstream.imdb_graphql_url.clone()));
        let lookup: Arc<dyn ExternalIdLookup> = Arc::new(TmdbClient::new(
            config.upstream.tmdb_api_url.clone(),
            config.upstream.tmdb_token.clone(),
        ));

        let service = MetadataService::new(provider, IdentifierResolver::new(store, lookup));
        let cache = ResponseCache::new(
            Arc::new(CacheAdapterSelector::new(config.cache_backends())),
            Arc::new(TokioSpawner),
        );

        Ok(Self::new(Arc::new(config), Arc::new(service), cache))
    }
}

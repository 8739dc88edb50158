use std::path::PathBuf;

use cinebetter_core::cache::CacheBackendSettings;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 7000;
pub const DEFAULT_CACHE_DAYS_CATALOG: u32 = 1;
pub const DEFAULT_CACHE_DAYS_META: u32 = 7;

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub upstream: UpstreamConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn cache_backends(&self) -> CacheBackendSettings {
        CacheBackendSettings {
            enabled: self.cache.enabled,
            disk_root: self.cache.root.clone(),
            redis_url: self.redis.as_ref().map(|redis| redis.url.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// External base URL used for addon transport URLs. Derived from the
    /// request when unset.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub root: Option<PathBuf>,
    /// Retention of catalog responses, in days.
    pub catalog_days: u32,
    /// Retention of meta responses, in days.
    pub meta_days: u32,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub imdb_graphql_url: String,
    pub tmdb_api_url: String,
    pub tmdb_token: Option<String>,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("imdb_graphql_url", &self.imdb_graphql_url)
            .field("tmdb_api_url", &self.tmdb_api_url)
            .field("tmdb_token", &self.tmdb_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint(&mut self, message: impl Into<String>, hint: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A loaded configuration together with anything worth telling the operator.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub cache: FileCacheConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    pub redis: Option<FileRedisConfig>,
    #[serde(default)]
    pub upstream: FileUpstreamConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_days: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileRedisConfig {
    pub url: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileUpstreamConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_graphql_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_token: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub public_url: Option<String>,
    pub use_cache: Option<bool>,
    pub cache_root: Option<PathBuf>,
    pub cache_days_catalog: Option<u32>,
    pub cache_days_meta: Option<u32>,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub imdb_graphql_url: Option<String>,
    pub tmdb_api_url: Option<String>,
    pub tmdb_token: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the environment view from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let flag = |name: &str| var(name).and_then(|raw| parse_bool(&raw));

        Self {
            config_path: var("CINEBETTER_CONFIG").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT").and_then(|s| s.parse().ok()),
            public_url: var("PUBLIC_URL"),
            use_cache: flag("USE_CACHE"),
            cache_root: var("CACHE_DIR").map(PathBuf::from),
            cache_days_catalog: var("CACHE_DAYS_CATALOG").and_then(|s| s.parse().ok()),
            cache_days_meta: var("CACHE_DAYS_META").and_then(|s| s.parse().ok()),
            database_url: var("DATABASE_URL"),
            redis_url: var("REDIS_URL"),
            imdb_graphql_url: var("IMDB_GRAPHQL_URL"),
            tmdb_api_url: var("TMDB_API_URL"),
            tmdb_token: var("TMDB_TOKEN"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use cinebetter_core::providers::imdb::DEFAULT_IMDB_GRAPHQL_URL;
use cinebetter_core::providers::tmdb::DEFAULT_TMDB_API_URL;
use thiserror::Error;
use url::Url;

use super::models::{
    CacheConfig, Config, ConfigLoad, ConfigMetadata, ConfigWarnings, DEFAULT_CACHE_DAYS_CATALOG,
    DEFAULT_CACHE_DAYS_META, DEFAULT_HOST, DEFAULT_PORT, DatabaseConfig, RedisConfig,
    ServerConfig, UpstreamConfig,
};
use super::sources::{EnvConfig, FileConfig};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["cinebetter.toml", "config/cinebetter.toml"];

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load .env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("config file {path} does not exist")]
    MissingConfig { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Default, Clone)]
struct ConfigLoaderOptions {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

/// Loads `.env`, then the TOML file, then the process environment, with the
/// environment taking precedence over the file.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        self.load_with_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Composes the configuration from an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        compose_config(file_config, env, config_path, env_file_loaded)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigLoadError::MissingConfig { path }),
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file_config.is_none() {
        warnings.push_with_hint(
            "No cinebetter.toml detected; using environment variables only",
            "Set CINEBETTER_CONFIG to point at a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        cache: file_cache,
        database: file_database,
        redis: file_redis,
        upstream: file_upstream,
    } = file_config.unwrap_or_default();

    let public_url = env.public_url.or(file_server.public_url);
    if let Some(url) = &public_url {
        Url::parse(url).map_err(|e| ConfigLoadError::Invalid {
            field: "PUBLIC_URL",
            reason: e.to_string(),
        })?;
    }

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        public_url,
    };

    let cache = CacheConfig {
        enabled: env.use_cache.or(file_cache.enabled).unwrap_or(true),
        root: env.cache_root.or(file_cache.root),
        catalog_days: env
            .cache_days_catalog
            .or(file_cache.catalog_days)
            .unwrap_or(DEFAULT_CACHE_DAYS_CATALOG),
        meta_days: env
            .cache_days_meta
            .or(file_cache.meta_days)
            .unwrap_or(DEFAULT_CACHE_DAYS_META),
    };

    let redis = env
        .redis_url
        .map(|url| RedisConfig { url })
        .or_else(|| file_redis.map(|r| RedisConfig { url: r.url }));

    if cache.enabled && cache.root.is_none() && redis.is_none() {
        warnings.push_with_hint(
            "Response caching is enabled but no backend is configured",
            "Set CACHE_DIR or REDIS_URL",
        );
    }

    let database = DatabaseConfig {
        url: env.database_url.or(file_database.url),
    };
    if database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL is not set; identifier mappings are kept in memory",
            "Point DATABASE_URL at Postgres to persist them across restarts",
        );
    }

    let upstream = UpstreamConfig {
        imdb_graphql_url: env
            .imdb_graphql_url
            .or(file_upstream.imdb_graphql_url)
            .unwrap_or_else(|| DEFAULT_IMDB_GRAPHQL_URL.to_string()),
        tmdb_api_url: env
            .tmdb_api_url
            .or(file_upstream.tmdb_api_url)
            .unwrap_or_else(|| DEFAULT_TMDB_API_URL.to_string()),
        tmdb_token: env.tmdb_token.or(file_upstream.tmdb_token),
    };
    if upstream.tmdb_token.is_none() {
        warnings.push("TMDB_TOKEN is not set; titles will not be matched against TMDB");
    }

    Ok(ConfigLoad {
        config: Config {
            server,
            cache,
            database,
            redis,
            upstream,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        },
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn loader() -> ConfigLoader {
        ConfigLoader::new()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let ConfigLoad { config, warnings } = compose_config(None, EnvConfig::default(), None, false).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 7000);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.catalog_days, 1);
        assert_eq!(config.cache.meta_days, 7);
        assert_eq!(config.upstream.imdb_graphql_url, DEFAULT_IMDB_GRAPHQL_URL);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 7100\n\n[cache]\nmeta_days = 30\ncatalog_days = 2\n\n[upstream]\ntmdb_token = \"file-token\""
        )
        .unwrap();

        let env = EnvConfig {
            server_port: Some(7200),
            tmdb_token: Some("env-token".to_string()),
            ..EnvConfig::default()
        };
        let ConfigLoad { config, .. } = loader()
            .with_config_path(file.path())
            .load_with_env(env, false)
            .unwrap();

        assert_eq!(config.server.port, 7200);
        assert_eq!(config.cache.meta_days, 30);
        assert_eq!(config.cache.catalog_days, 2);
        assert_eq!(config.upstream.tmdb_token.as_deref(), Some("env-token"));
        assert_eq!(config.metadata.config_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn explicit_env_file_is_loaded() {
        let mut env_file = NamedTempFile::new().unwrap();
        writeln!(env_file, "CINEBETTER_ENV_FILE_MARKER=loaded").unwrap();

        let ConfigLoad { config, .. } = loader().with_env_file(env_file.path()).load().unwrap();

        assert!(config.metadata.env_file_loaded);
        assert_eq!(
            std::env::var("CINEBETTER_ENV_FILE_MARKER").as_deref(),
            Ok("loaded")
        );
    }

    #[test]
    fn absent_env_file_is_skipped() {
        let ConfigLoad { config, .. } = loader()
            .with_env_file("/nonexistent/cinebetter.env")
            .load()
            .unwrap();

        assert!(!config.metadata.env_file_loaded);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = loader()
            .with_config_path("/nonexistent/cinebetter.toml")
            .load_with_env(EnvConfig::default(), false);

        assert!(matches!(result, Err(ConfigLoadError::MissingConfig { .. })));
    }

    #[test]
    fn rejects_invalid_public_url() {
        let env = EnvConfig {
            public_url: Some("not a url".to_string()),
            ..EnvConfig::default()
        };

        let result = compose_config(None, env, None, false);
        assert!(matches!(
            result,
            Err(ConfigLoadError::Invalid { field: "PUBLIC_URL", .. })
        ));
    }

    #[test]
    fn disabling_cache_builds_disabled_backends() {
        let env = EnvConfig {
            use_cache: Some(false),
            redis_url: Some("redis://localhost".to_string()),
            ..EnvConfig::default()
        };

        let ConfigLoad { config, .. } = compose_config(None, env, None, false).unwrap();
        let backends = config.cache_backends();

        assert!(!backends.enabled);
        assert_eq!(backends.redis_url.as_deref(), Some("redis://localhost"));
    }
}

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::adapter::CacheAdapter;
use super::disk::DiskCache;
use super::noop::NoopCache;
use super::remote::RedisCache;

/// Backends the selector may try, in priority order: disk, then Redis.
#[derive(Debug, Clone, Default)]
pub struct CacheBackendSettings {
    pub enabled: bool,
    pub disk_root: Option<PathBuf>,
    pub redis_url: Option<String>,
}

/// Picks the first backend that initializes and keeps it for the lifetime of
/// the selector. Falls back to [`NoopCache`] when caching is disabled or no
/// backend is usable.
pub struct CacheAdapterSelector {
    settings: CacheBackendSettings,
    selected: OnceCell<Arc<dyn CacheAdapter>>,
}

impl fmt::Debug for CacheAdapterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAdapterSelector")
            .field("settings", &self.settings)
            .field("selected", &self.selected.get().map(|a| a.kind()))
            .finish()
    }
}

impl CacheAdapterSelector {
    pub fn new(settings: CacheBackendSettings) -> Self {
        Self {
            settings,
            selected: OnceCell::new(),
        }
    }

    /// A selector whose choice is already made.
    pub fn with_adapter(adapter: Arc<dyn CacheAdapter>) -> Self {
        Self {
            settings: CacheBackendSettings {
                enabled: true,
                ..CacheBackendSettings::default()
            },
            selected: OnceCell::from(adapter),
        }
    }

    pub async fn adapter(&self) -> Arc<dyn CacheAdapter> {
        self.selected
            .get_or_init(|| select(&self.settings))
            .await
            .clone()
    }
}

async fn select(settings: &CacheBackendSettings) -> Arc<dyn CacheAdapter> {
    if !settings.enabled {
        info!("Response cache disabled");
        return Arc::new(NoopCache);
    }

    if let Some(root) = &settings.disk_root {
        match DiskCache::open(root).await {
            Ok(cache) => {
                info!("Using disk response cache at {}", root.display());
                return Arc::new(cache);
            }
            Err(e) => warn!("Disk response cache unavailable: {e}"),
        }
    }

    if let Some(url) = &settings.redis_url {
        match RedisCache::connect(url).await {
            Ok(cache) => {
                info!("Using Redis response cache");
                return Arc::new(cache);
            }
            Err(e) => warn!("Redis response cache unavailable: {e}"),
        }
    }

    warn!("No response cache backend available, responses will not be cached");
    Arc::new(NoopCache)
}

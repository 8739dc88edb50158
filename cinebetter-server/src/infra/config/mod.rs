pub mod loader;
pub mod models;
pub mod sources;

pub use loader::{ConfigLoadError, ConfigLoader};
pub use models::{
    CacheConfig, Config, ConfigLoad, ConfigMetadata, ConfigWarning, ConfigWarnings,
    DatabaseConfig, RedisConfig, ServerConfig, UpstreamConfig,
};

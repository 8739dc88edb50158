pub mod adapter;
pub mod disk;
pub mod entry;
pub mod key;
pub mod noop;
pub mod orchestrator;
pub mod remote;
pub mod response;
pub mod selector;

pub use adapter::{AdapterKind, CacheAdapter, CacheError};
pub use disk::DiskCache;
pub use entry::CacheEntry;
pub use key::CacheKey;
pub use noop::NoopCache;
pub use orchestrator::{CachePolicy, FetchOutcome, ResponseCache, TaskSpawner, TokioSpawner};
pub use remote::RedisCache;
pub use response::{GatewayResponse, days_to_seconds};
pub use selector::{CacheAdapterSelector, CacheBackendSettings};

//! Request-level cache control flow with stale-while-revalidate refreshes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::response::{GatewayResponse, days_to_seconds};
use super::selector::CacheAdapterSelector;
use crate::request::RequestContext;
use crate::settings::UserSettings;

/// Runs detached work. Implementations must not block the caller and must
/// not surface the task's result.
pub trait TaskSpawner: Send + Sync + fmt::Debug {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns onto the ambient tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}

/// What a fetch function hands back to the cache layer.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: GatewayResponse,
    pub should_cache: bool,
    pub ttl_days: u32,
}

impl FetchOutcome {
    /// Cacheable when the response succeeded.
    pub fn cacheable(response: GatewayResponse, ttl_days: u32) -> Self {
        let should_cache = response.is_success();
        Self {
            response,
            should_cache,
            ttl_days,
        }
    }

    pub fn uncached(response: GatewayResponse) -> Self {
        Self {
            response,
            should_cache: false,
            ttl_days: 0,
        }
    }
}

/// Physical retention handed to the adapter on store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub retention: Duration,
}

impl CachePolicy {
    pub fn retention_days(days: u32) -> Self {
        Self {
            retention: Duration::from_secs(days_to_seconds(days)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    selector: Arc<CacheAdapterSelector>,
    spawner: Arc<dyn TaskSpawner>,
}

impl ResponseCache {
    pub fn new(selector: Arc<CacheAdapterSelector>, spawner: Arc<dyn TaskSpawner>) -> Self {
        Self { selector, spawner }
    }

    pub fn selector(&self) -> &Arc<CacheAdapterSelector> {
        &self.selector
    }

    /// Serves `ctx` from cache when possible, otherwise through `fetch`.
    ///
    /// Fresh hits are returned as stored. Stale hits are returned immediately
    /// and a refresh is handed to the spawner. Misses await `fetch` and store
    /// the outcome only when it asked to be cached, succeeded and has a
    /// positive ttl. Cache backend failures are logged and never fail the
    /// request; fetch errors propagate on the miss path and are logged on the
    /// refresh path.
    pub async fn with_cache<F, Fut, E>(
        &self,
        ctx: &RequestContext,
        keying: &UserSettings,
        policy: CachePolicy,
        fetch: F,
    ) -> Result<GatewayResponse, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<FetchOutcome, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let key = CacheKey::normalize(ctx, keying);
        let adapter = self.selector.adapter().await;

        let cached = match adapter.lookup(&key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Cache lookup failed for {key}, treating as miss: {e}");
                None
            }
        };

        if let Some(entry) = cached {
            let now = Utc::now();
            if !entry.is_fresh(now) {
                debug!(
                    "Cache STALE: {} (age {}s > ttl {}s), refreshing in background",
                    key,
                    entry.age_seconds(now),
                    entry.ttl_seconds()
                );
                let selector = Arc::clone(&self.selector);
                let refresh_key = key.clone();
                self.spawner.spawn(Box::pin(async move {
                    match fetch().await {
                        Ok(outcome) => {
                            finish(&selector, &refresh_key, policy, outcome).await;
                        }
                        Err(e) => {
                            warn!("Background cache refresh failed for {refresh_key}: {e}");
                        }
                    }
                }));
            }
            return Ok(entry.to_response(now));
        }

        let outcome = fetch().await?;
        Ok(finish(&self.selector, &key, policy, outcome).await)
    }
}

async fn finish(
    selector: &CacheAdapterSelector,
    key: &CacheKey,
    policy: CachePolicy,
    outcome: FetchOutcome,
) -> GatewayResponse {
    let FetchOutcome {
        mut response,
        should_cache,
        ttl_days,
    } = outcome;

    let ttl_seconds = days_to_seconds(ttl_days);
    response.set_cache_headers(ttl_seconds);

    if !should_cache || !response.is_success() || ttl_seconds == 0 {
        return response;
    }

    let entry = match CacheEntry::from_response(&response, Utc::now(), ttl_seconds) {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Not caching {key}: {e}");
            return response;
        }
    };

    let adapter = selector.adapter().await;
    if let Err(e) = adapter.store(key, &entry, policy.retention).await {
        warn!("Cache store failed for {key}: {e}");
    }

    response
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};

    use super::*;
    use crate::cache::adapter::{AdapterKind, CacheAdapter, CacheError};

    /// In-memory adapter that counts stores.
    #[derive(Debug, Default)]
    struct MemoryCache {
        entries: Mutex<BTreeMap<CacheKey, CacheEntry>>,
        stores: AtomicUsize,
        fail_lookups: bool,
    }

    #[async_trait]
    impl CacheAdapter for MemoryCache {
        fn kind(&self) -> AdapterKind {
            AdapterKind::Noop
        }

        async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
            if self.fail_lookups {
                return Err(CacheError::Unavailable("down".to_string()));
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn store(
            &self,
            key: &CacheKey,
            entry: &CacheEntry,
            _retention: Duration,
        ) -> Result<(), CacheError> {
            self.stores.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().insert(key.clone(), entry.clone());
            Ok(())
        }
    }

    /// Holds spawned tasks until the test drives them.
    #[derive(Default)]
    struct DeferredSpawner {
        tasks: Mutex<Vec<BoxFuture<'static, ()>>>,
    }

    impl fmt::Debug for DeferredSpawner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("DeferredSpawner")
                .field("pending", &self.pending())
                .finish()
        }
    }

    impl TaskSpawner for DeferredSpawner {
        fn spawn(&self, task: BoxFuture<'static, ()>) {
            self.tasks.lock().unwrap().push(task);
        }
    }

    impl DeferredSpawner {
        fn pending(&self) -> usize {
            self.tasks.lock().unwrap().len()
        }

        async fn drain(&self) {
            let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
            for task in tasks {
                task.await;
            }
        }
    }

    fn setup(adapter: Arc<MemoryCache>) -> (ResponseCache, Arc<DeferredSpawner>) {
        let spawner = Arc::new(DeferredSpawner::default());
        let cache = ResponseCache::new(
            Arc::new(CacheAdapterSelector::with_adapter(adapter)),
            spawner.clone(),
        );
        (cache, spawner)
    }

    fn ok_json(body: &str) -> GatewayResponse {
        let mut response = GatewayResponse::new(200, body.as_bytes().to_vec());
        response.set_header("content-type", "application/json");
        response
    }

    fn stale_entry(body: &str) -> CacheEntry {
        let stored_at: DateTime<Utc> = Utc::now() - ChronoDuration::days(2);
        CacheEntry::new(body.as_bytes().to_vec(), BTreeMap::new(), stored_at, 86_400).unwrap()
    }

    const POLICY: CachePolicy = CachePolicy {
        retention: Duration::from_secs(7 * 86_400),
    };

    #[tokio::test]
    async fn miss_fetches_and_stores() {
        let adapter = Arc::new(MemoryCache::default());
        let (cache, _) = setup(adapter.clone());
        let ctx = RequestContext::get("/meta/movie/tt1.json");

        let response = cache
            .with_cache(&ctx, &UserSettings::default(), POLICY, || async {
                Ok::<_, String>(FetchOutcome::cacheable(ok_json("{\"meta\":1}"), 14))
            })
            .await
            .unwrap();

        assert_eq!(response.max_age(), 14 * 86_400);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        assert_eq!(adapter.stores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_hit_skips_fetch() {
        let adapter = Arc::new(MemoryCache::default());
        let (cache, spawner) = setup(adapter.clone());
        let ctx = RequestContext::get("/meta/movie/tt1.json");
        let keying = UserSettings::default();

        cache
            .with_cache(&ctx, &keying, POLICY, || async {
                Ok::<_, String>(FetchOutcome::cacheable(ok_json("first"), 1))
            })
            .await
            .unwrap();

        let response = cache
            .with_cache(&ctx, &keying, POLICY, || async {
                Err::<FetchOutcome, _>("must not be called".to_string())
            })
            .await
            .unwrap();

        assert_eq!(response.body, b"first");
        assert!(response.age().is_some());
        assert_eq!(spawner.pending(), 0);
        assert_eq!(adapter.stores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_hit_returns_immediately_and_refreshes_once() {
        let adapter = Arc::new(MemoryCache::default());
        let ctx = RequestContext::get("/catalog/movie/top.json");
        let keying = UserSettings::default();
        let key = CacheKey::normalize(&ctx, &keying);
        adapter.entries.lock().unwrap().insert(key.clone(), stale_entry("old"));

        let (cache, spawner) = setup(adapter.clone());
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();

        let response = cache
            .with_cache(&ctx, &keying, POLICY, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(FetchOutcome::cacheable(ok_json("new"), 7))
            })
            .await
            .unwrap();

        assert_eq!(response.body, b"old");
        assert!(response.age().unwrap() > response.max_age());
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        assert_eq!(spawner.pending(), 1);

        spawner.drain().await;

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.stores.load(Ordering::SeqCst), 1);
        let refreshed = adapter.entries.lock().unwrap().get(&key).cloned().unwrap();
        assert_eq!(refreshed.body(), b"new");
    }

    #[tokio::test]
    async fn failed_background_refresh_keeps_stale_entry() {
        let adapter = Arc::new(MemoryCache::default());
        let ctx = RequestContext::get("/meta/series/tt2.json");
        let keying = UserSettings::default();
        let key = CacheKey::normalize(&ctx, &keying);
        adapter.entries.lock().unwrap().insert(key.clone(), stale_entry("old"));

        let (cache, spawner) = setup(adapter.clone());
        let response = cache
            .with_cache(&ctx, &keying, POLICY, || async {
                Err::<FetchOutcome, _>("upstream down".to_string())
            })
            .await
            .unwrap();
        spawner.drain().await;

        assert_eq!(response.body, b"old");
        assert_eq!(adapter.stores.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn uncacheable_outcomes_are_not_stored() {
        let adapter = Arc::new(MemoryCache::default());
        let (cache, _) = setup(adapter.clone());
        let keying = UserSettings::default();

        let not_found = cache
            .with_cache(&RequestContext::get("/a"), &keying, POLICY, || async {
                Ok::<_, String>(FetchOutcome::cacheable(GatewayResponse::not_found(), 14))
            })
            .await
            .unwrap();
        assert_eq!(not_found.status, 404);

        cache
            .with_cache(&RequestContext::get("/b"), &keying, POLICY, || async {
                Ok::<_, String>(FetchOutcome::uncached(ok_json("{}")))
            })
            .await
            .unwrap();

        cache
            .with_cache(&RequestContext::get("/c"), &keying, POLICY, || async {
                Ok::<_, String>(FetchOutcome::cacheable(ok_json("{}"), 0))
            })
            .await
            .unwrap();

        assert_eq!(adapter.stores.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_errors_propagate_on_miss() {
        let adapter = Arc::new(MemoryCache::default());
        let (cache, _) = setup(adapter);

        let result = cache
            .with_cache(
                &RequestContext::get("/meta/movie/tt3.json"),
                &UserSettings::default(),
                POLICY,
                || async { Err::<FetchOutcome, _>("network".to_string()) },
            )
            .await;

        assert_eq!(result.unwrap_err(), "network");
    }

    #[tokio::test]
    async fn lookup_failures_degrade_to_fetch() {
        let adapter = Arc::new(MemoryCache {
            fail_lookups: true,
            ..MemoryCache::default()
        });
        let (cache, _) = setup(adapter);

        let response = cache
            .with_cache(
                &RequestContext::get("/manifest.json"),
                &UserSettings::default(),
                POLICY,
                || async { Ok::<_, String>(FetchOutcome::cacheable(ok_json("{}"), 1)) },
            )
            .await
            .unwrap();

        assert!(response.is_success());
    }
}

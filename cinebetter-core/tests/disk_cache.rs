use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use cinebetter_core::RequestContext;
use cinebetter_core::cache::{
    CacheAdapter, CacheAdapterSelector, CacheEntry, CacheKey, CachePolicy, DiskCache,
    FetchOutcome, GatewayResponse, ResponseCache, TokioSpawner,
};
use cinebetter_core::settings::UserSettings;
use serde_json::json;
use tempfile::TempDir;

async fn disk_cache() -> (TempDir, DiskCache) {
    let dir = TempDir::new().unwrap();
    let cache = DiskCache::open(dir.path().join("responses")).await.unwrap();
    (dir, cache)
}

fn response_cache(cache: DiskCache) -> ResponseCache {
    ResponseCache::new(
        Arc::new(CacheAdapterSelector::with_adapter(Arc::new(cache))),
        Arc::new(TokioSpawner),
    )
}

#[tokio::test]
async fn miss_then_hit_through_disk() {
    let (_dir, disk) = disk_cache().await;
    let cache = response_cache(disk);
    let calls = Arc::new(AtomicUsize::new(0));

    let ctx = RequestContext::new(
        "GET",
        "/l=fr-FR/meta/movie/tt0111161.json",
        None,
        Some("l=fr-FR".to_string()),
    );
    let keying = ctx.settings.language_only();

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let response = cache
            .with_cache(&ctx, &keying, CachePolicy::retention_days(7), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let response = GatewayResponse::json(&json!({ "meta": { "id": "tt0111161" } }))?;
                Ok::<_, serde_json::Error>(FetchOutcome::cacheable(response, 14))
            })
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.max_age(), 1_209_600);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn equivalent_settings_share_an_entry() {
    let (_dir, disk) = disk_cache().await;
    let cache = response_cache(disk.clone());

    let ctx = RequestContext::new(
        "GET",
        "/h=1&l=de-de/meta/series/tt0903747.json",
        None,
        Some("h=1&l=de-de".to_string()),
    );
    let keying = ctx.settings.language_only();

    cache
        .with_cache(&ctx, &keying, CachePolicy::retention_days(7), || async {
            let response = GatewayResponse::json(&json!({ "meta": null }))?;
            Ok::<_, serde_json::Error>(FetchOutcome::cacheable(response, 1))
        })
        .await
        .unwrap();

    let other = RequestContext::new(
        "GET",
        "/l=DE-DE/meta/series/tt0903747.json",
        None,
        Some("l=DE-DE".to_string()),
    );
    let key = CacheKey::normalize(&other, &other.settings.language_only());

    assert_eq!(key.as_str(), "GET /l=de-DE/meta/series/tt0903747.json");
    assert!(disk.lookup(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn retention_outlives_freshness() {
    let (_dir, disk) = disk_cache().await;
    let key = CacheKey::from("GET /catalog/movie/top.json");

    let stored_at = Utc::now() - ChronoDuration::days(2);
    let entry = CacheEntry::new(b"{}".to_vec(), BTreeMap::new(), stored_at, 86_400).unwrap();
    disk.store(&key, &entry, Duration::from_secs(7 * 86_400))
        .await
        .unwrap();

    let cached = disk.lookup(&key).await.unwrap().expect("entry retained");
    assert!(!cached.is_fresh(Utc::now()));
}

#[tokio::test]
async fn corrupt_entry_is_purged_on_read() {
    let (_dir, disk) = disk_cache().await;
    let key = CacheKey::from("GET /meta/movie/tt0068646.json");

    // raw write without the record header the adapter expects
    cacache::write(disk.root(), key.as_str(), b"garbage")
        .await
        .unwrap();
    assert!(
        cacache::metadata(disk.root(), key.as_str())
            .await
            .unwrap()
            .is_some()
    );

    assert!(disk.lookup(&key).await.unwrap().is_none());
    assert!(
        cacache::metadata(disk.root(), key.as_str())
            .await
            .unwrap()
            .is_none()
    );
}

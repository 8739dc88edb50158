use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::{debug, info, warn};

use super::adapter::{AdapterKind, CacheAdapter, CacheError, effective_retention};
use super::entry::CacheEntry;
use super::key::CacheKey;

const FIELD_BODY: &str = "body";
const FIELD_HEADERS: &str = "headers";
const FIELD_TIMESTAMP: &str = "timestamp";
const FIELD_TTL: &str = "ttl";
const FIELD_RETENTION: &str = "retention";

/// Remote response cache. One hash per key: gzip body, JSON headers,
/// RFC 3339 timestamp, ttl seconds and the retention used for key expiry.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        info!("Connecting to Redis cache at {}", redis_url);

        let client = redis::Client::open(redis_url).map_err(|e| {
            CacheError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::Unavailable(format!("Failed to connect to Redis: {e}"))
        })?;

        info!("Successfully connected to Redis cache");

        Ok(Self { conn })
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key.as_str())
            .await
            .map_err(|e| CacheError::Unavailable(format!("Redis DEL failed: {e}")))
    }
}

#[async_trait]
impl CacheAdapter for RedisCache {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Redis
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        debug!("Cache GET: {}", key);

        let mut conn = self.conn.clone();
        let fields: HashMap<String, Vec<u8>> = conn
            .hgetall(key.as_str())
            .await
            .map_err(|e| CacheError::Unavailable(format!("Redis HGETALL failed: {e}")))?;

        let entry = match read_record(&fields) {
            StoredRecord::Missing => {
                debug!("Cache MISS: {}", key);
                return Ok(None);
            }
            StoredRecord::Corrupt(e) => {
                warn!("Purging corrupt Redis cache entry {key}: {e}");
                self.delete(key).await?;
                return Ok(None);
            }
            StoredRecord::Entry(entry) => entry,
        };

        if let Some(retention) = parse_field::<i64>(&fields, FIELD_RETENTION)
            && let Err(e) = conn.expire::<_, ()>(key.as_str(), retention).await
        {
            warn!("Failed to refresh expiry for {key}: {e}");
        }

        debug!("Cache HIT: {}", key);
        Ok(Some(entry))
    }

    async fn store(
        &self,
        key: &CacheKey,
        entry: &CacheEntry,
        retention: Duration,
    ) -> Result<(), CacheError> {
        let retention = effective_retention(entry, retention);
        debug!("Cache SET: {} (retention: {:?})", key, retention);

        let retention_secs = i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);
        let mut fields = encode_fields(entry)?;
        fields.push((FIELD_RETENTION, retention_secs.to_string().into_bytes()));

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .del(key.as_str())
            .hset_multiple(key.as_str(), fields.as_slice())
            .expire(key.as_str(), retention_secs)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Redis HSET failed: {e}")))?;

        Ok(())
    }
}

/// What a `HGETALL` reply holds.
#[derive(Debug)]
enum StoredRecord {
    Missing,
    Entry(CacheEntry),
    /// Present but undecodable; the caller deletes it and reports a miss.
    Corrupt(CacheError),
}

fn read_record(fields: &HashMap<String, Vec<u8>>) -> StoredRecord {
    if fields.is_empty() {
        return StoredRecord::Missing;
    }
    match decode_fields(fields) {
        Ok(entry) => StoredRecord::Entry(entry),
        Err(e) => StoredRecord::Corrupt(e),
    }
}

fn encode_fields(entry: &CacheEntry) -> Result<Vec<(&'static str, Vec<u8>)>, CacheError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(entry.body())?;
    let body = encoder.finish()?;

    Ok(vec![
        (FIELD_BODY, body),
        (FIELD_HEADERS, serde_json::to_vec(entry.headers())?),
        (FIELD_TIMESTAMP, entry.stored_at().to_rfc3339().into_bytes()),
        (FIELD_TTL, entry.ttl_seconds().to_string().into_bytes()),
    ])
}

fn parse_field<T: std::str::FromStr>(
    fields: &HashMap<String, Vec<u8>>,
    name: &str,
) -> Option<T> {
    std::str::from_utf8(fields.get(name)?).ok()?.parse().ok()
}

fn decode_fields(fields: &HashMap<String, Vec<u8>>) -> Result<CacheEntry, CacheError> {
    let compressed = fields
        .get(FIELD_BODY)
        .ok_or_else(|| CacheError::Corrupt("missing body".to_string()))?;

    let timestamp = fields
        .get(FIELD_TIMESTAMP)
        .ok_or_else(|| CacheError::Corrupt("missing timestamp".to_string()))?;
    let stored_at = std::str::from_utf8(timestamp)
        .ok()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| CacheError::Corrupt("unreadable timestamp".to_string()))?;

    let ttl_seconds = parse_field::<u64>(fields, FIELD_TTL)
        .ok_or_else(|| CacheError::Corrupt("missing or unreadable ttl".to_string()))?;

    let headers: BTreeMap<String, String> = match fields.get(FIELD_HEADERS) {
        Some(raw) => serde_json::from_slice(raw)
            .map_err(|e| CacheError::Corrupt(format!("unreadable headers: {e}")))?,
        None => BTreeMap::new(),
    };

    let mut body = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut body)
        .map_err(|e| CacheError::Corrupt(format!("body failed to decompress: {e}")))?;

    CacheEntry::new(body, headers, stored_at, ttl_seconds)
        .map_err(|e| CacheError::Corrupt(e.to_string()))
}

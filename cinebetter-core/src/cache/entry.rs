use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::adapter::CacheError;
use super::response::GatewayResponse;

/// A stored response body plus the metadata needed to judge its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    body: Vec<u8>,
    headers: BTreeMap<String, String>,
    stored_at: DateTime<Utc>,
    ttl_seconds: u64,
}

impl CacheEntry {
    pub fn new(
        body: Vec<u8>,
        headers: BTreeMap<String, String>,
        stored_at: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Result<Self, CacheError> {
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidEntry(
                "ttl must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            body,
            headers,
            stored_at,
            ttl_seconds,
        })
    }

    pub fn from_response(
        response: &GatewayResponse,
        stored_at: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Result<Self, CacheError> {
        Self::new(
            response.body.clone(),
            response.headers.clone(),
            stored_at,
            ttl_seconds,
        )
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Whole seconds since the entry was stored. Clock skew clamps to zero.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.stored_at).num_seconds()).unwrap_or(0)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.age_seconds(now) <= self.ttl_seconds
    }

    /// Rebuilds the response served for this entry, with `Age` set.
    pub fn to_response(&self, now: DateTime<Utc>) -> GatewayResponse {
        let mut response = GatewayResponse {
            status: 200,
            headers: self.headers.clone(),
            body: self.body.clone(),
        };
        response.set_cache_headers(self.ttl_seconds);
        response.set_header("age", self.age_seconds(now).to_string());
        response
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn entry(stored_at: DateTime<Utc>, ttl: u64) -> CacheEntry {
        CacheEntry::new(b"{}".to_vec(), BTreeMap::new(), stored_at, ttl).unwrap()
    }

    #[test]
    fn rejects_zero_ttl() {
        let result = CacheEntry::new(Vec::new(), BTreeMap::new(), Utc::now(), 0);
        assert!(matches!(result, Err(CacheError::InvalidEntry(_))));
    }

    #[test]
    fn freshness_window_is_inclusive() {
        let now = Utc::now();
        let stored = now - Duration::seconds(60);

        assert!(entry(stored, 60).is_fresh(now));
        assert!(!entry(stored, 59).is_fresh(now));
    }

    #[test]
    fn future_timestamps_have_zero_age() {
        let now = Utc::now();
        assert_eq!(entry(now + Duration::seconds(30), 10).age_seconds(now), 0);
    }

    #[test]
    fn response_carries_age_and_max_age() {
        let now = Utc::now();
        let response = entry(now - Duration::seconds(120), 3600).to_response(now);

        assert_eq!(response.status, 200);
        assert_eq!(response.max_age(), 3600);
        assert_eq!(response.age(), Some(120));
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }
}

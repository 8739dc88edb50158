use std::collections::BTreeMap;

use serde::Serialize;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

pub fn days_to_seconds(days: u32) -> u64 {
    u64::from(days) * SECONDS_PER_DAY
}

/// Transport-neutral response produced by fetch functions and served from
/// cache. Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        let mut response = Self::new(200, body);
        response.set_header("content-type", "application/json");
        Ok(response)
    }

    pub fn not_found() -> Self {
        let mut response = Self::new(404, b"Not found".to_vec());
        response.set_header("content-type", "text/plain; charset=utf-8");
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// `max-age` from the `cache-control` header, zero when absent.
    pub fn max_age(&self) -> u64 {
        self.header("cache-control")
            .and_then(|value| {
                value.split(',').find_map(|directive| {
                    directive.trim().strip_prefix("max-age=")?.parse().ok()
                })
            })
            .unwrap_or(0)
    }

    pub fn age(&self) -> Option<u64> {
        self.header("age").and_then(|value| value.parse().ok())
    }

    /// Stamps the headers every gateway response carries.
    pub fn set_cache_headers(&mut self, ttl_seconds: u64) {
        self.set_header("access-control-allow-origin", "*");
        self.set_header(
            "cache-control",
            format!("public, max-age={ttl_seconds}, stale-while-revalidate={ttl_seconds}"),
        );
        self.headers
            .entry("content-type".to_string())
            .or_insert_with(|| "application/json".to_string());
    }
}

use std::fmt;

use crate::request::RequestContext;
use crate::settings::UserSettings;

/// Canonical cache key: `"{METHOD} {path}[?query]"`, where the path starts
/// with the canonical settings token of the keying settings (if non-empty)
/// instead of whatever token the caller sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn normalize(ctx: &RequestContext, keying: &UserSettings) -> Self {
        let path = ctx.path_without_settings();
        let token = keying.encode();

        let mut key = String::with_capacity(
            ctx.method.len() + token.len() + path.len() + 2,
        );
        key.push_str(&ctx.method.to_ascii_uppercase());
        key.push(' ');
        if !token.is_empty() {
            key.push('/');
            key.push_str(&token);
        }
        if !path.starts_with('/') {
            key.push('/');
        }
        key.push_str(path);
        if let Some(query) = ctx.query.as_deref() {
            key.push('?');
            key.push_str(query);
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &str, segment: Option<&str>) -> RequestContext {
        RequestContext::new("get", path, None, segment.map(str::to_string))
    }

    #[test]
    fn default_keying_has_no_prefix() {
        let key = CacheKey::normalize(
            &ctx("/meta/movie/tt0111161.json", None),
            &UserSettings::default(),
        );
        assert_eq!(key.as_str(), "GET /meta/movie/tt0111161.json");
    }

    #[test]
    fn equivalent_tokens_collide() {
        let keying = |ctx: &RequestContext| ctx.settings.language_only();

        let a = ctx("/l=fr-fr&h=1/meta/series/tt1.json", Some("l=fr-fr&h=1"));
        let b = ctx("/h=0&l=FR-FR/meta/series/tt1.json", Some("h=0&l=FR-FR"));

        let key_a = CacheKey::normalize(&a, &keying(&a));
        let key_b = CacheKey::normalize(&b, &keying(&b));
        assert_eq!(key_a, key_b);
        assert_eq!(key_a.as_str(), "GET /l=fr-FR/meta/series/tt1.json");
    }

    #[test]
    fn explicit_default_token_matches_bare_path() {
        let with_token = ctx("/l=en-US/manifest.json", Some("l=en-US"));
        let bare = ctx("/manifest.json", None);

        assert_eq!(
            CacheKey::normalize(&with_token, &with_token.settings),
            CacheKey::normalize(&bare, &bare.settings),
        );
    }

    #[test]
    fn normalizing_is_idempotent() {
        let first = ctx("/d=1&l=de-de/catalog/movie/top.json", Some("d=1&l=de-de"));
        let key = CacheKey::normalize(&first, &first.settings);

        let token = first.settings.encode();
        let path = format!("/{token}/catalog/movie/top.json");
        let second = ctx(&path, Some(&token));
        assert_eq!(CacheKey::normalize(&second, &second.settings), key);
    }

    #[test]
    fn query_participates_in_key() {
        let mut request = ctx("/catalog/movie/search.json", None);
        request.query = Some("search=alien".to_string());
        let key = CacheKey::normalize(&request, &UserSettings::default());
        assert_eq!(key.as_str(), "GET /catalog/movie/search.json?search=alien");
    }
}

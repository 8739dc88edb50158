//! Addon endpoints. Every route is served both bare and behind a leading
//! settings segment (`/{settings}/manifest.json`).

pub mod catalog;
pub mod manifest;
pub mod meta;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Uri, header::HOST},
    response::Response,
};
use cinebetter_core::RequestContext;
use cinebetter_core::cache::GatewayResponse;

use crate::infra::config::Config;
use crate::infra::errors::{AppError, AppResult};

const JSON_SUFFIX: &str = ".json";

/// Builds the request context. `has_settings` tells whether the matched
/// route carried a settings segment; the raw segment is taken from the URI
/// so the cache sees it exactly as sent.
pub(crate) fn request_context(method: &Method, uri: &Uri, has_settings: bool) -> RequestContext {
    let settings_segment = has_settings.then(|| first_segment(uri.path()).to_string());

    RequestContext::new(
        method.as_str(),
        uri.path(),
        uri.query().map(str::to_string),
        settings_segment,
    )
}

fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

/// Raw last path segment without its `.json` suffix.
pub(crate) fn last_segment(uri: &Uri) -> Option<&str> {
    uri.path().rsplit('/').next()?.strip_suffix(JSON_SUFFIX)
}

pub(crate) fn strip_json(segment: &str) -> AppResult<&str> {
    segment
        .strip_suffix(JSON_SUFFIX)
        .ok_or_else(|| AppError::not_found("Not found"))
}

/// Base URL clients reach this addon under.
pub(crate) fn public_base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = &config.server.public_url {
        return url.trim_end_matches('/').to_string();
    }

    let host = header_str(headers, HOST.as_str()).unwrap_or("localhost");
    let scheme = header_str(headers, "x-forwarded-proto").unwrap_or("http");

    format!("{scheme}://{host}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub(crate) fn into_http_response(response: GatewayResponse) -> AppResult<Response> {
    let GatewayResponse {
        status,
        headers,
        body,
    } = response;

    let mut builder = Response::builder().status(status);
    for (name, value) in &headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(body))
        .map_err(|e| AppError::internal(format!("invalid cached response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_raw_settings_segment() {
        let uri: Uri = "/l=fr-FR&h=1/catalog/movie/search/search=x.json?foo=1"
            .parse()
            .unwrap();
        let ctx = request_context(&Method::GET, &uri, true);

        assert_eq!(ctx.settings_segment.as_deref(), Some("l=fr-FR&h=1"));
        assert!(ctx.settings.hide_low_quality);
        assert_eq!(ctx.path_without_settings(), "/catalog/movie/search/search=x.json");
        assert_eq!(ctx.query.as_deref(), Some("foo=1"));
    }

    #[test]
    fn last_segment_requires_json_suffix() {
        let uri: Uri = "/catalog/movie/top/genre=Sci-Fi&skip=50.json".parse().unwrap();
        assert_eq!(last_segment(&uri), Some("genre=Sci-Fi&skip=50"));

        let uri: Uri = "/catalog/movie/top/genre=Drama".parse().unwrap();
        assert_eq!(last_segment(&uri), None);
    }
}

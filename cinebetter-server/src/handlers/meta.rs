use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use serde::Deserialize;

use cinebetter_core::cache::CachePolicy;
use cinebetter_core::manifest::transport_url;
use cinebetter_core::service::meta_keying;

use super::{into_http_response, public_base_url, request_context, strip_json};
use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
pub struct MetaPath {
    settings: Option<String>,
    #[serde(rename = "type")]
    content_type: String,
    id: String,
}

/// `GET [/{settings}]/meta/{type}/{id}.json`
pub async fn meta(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(params): Path<MetaPath>,
) -> AppResult<Response> {
    let ctx = request_context(&method, &uri, params.settings.is_some());
    let id = strip_json(&params.id)?.to_string();
    tracing::debug!("meta {} {}", params.content_type, id);

    let settings = ctx.settings.clone();
    let transport = transport_url(&public_base_url(&state.config, &headers), &settings);
    let service = Arc::clone(&state.service);

    let response = state
        .cache
        .with_cache(
            &ctx,
            &meta_keying(&ctx.settings),
            CachePolicy::retention_days(state.config.cache.meta_days),
            move || async move { service.meta_outcome(&id, &settings, &transport).await },
        )
        .await?;

    into_http_response(response)
}

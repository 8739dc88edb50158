use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use serde::Deserialize;

use cinebetter_core::cache::CachePolicy;
use cinebetter_core::catalog::CatalogExtras;
use cinebetter_core::manifest::transport_url;
use cinebetter_core::service::catalog_keying;

use super::{into_http_response, last_segment, public_base_url, request_context, strip_json};
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct CatalogPath {
    settings: Option<String>,
    #[serde(rename = "type")]
    content_type: String,
    catalog: String,
    extra: Option<String>,
}

/// `GET [/{settings}]/catalog/{type}/{catalog}[/{extra}].json`
pub async fn catalog(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(params): Path<CatalogPath>,
) -> AppResult<Response> {
    let ctx = request_context(&method, &uri, params.settings.is_some());

    let (catalog, extras) = match params.extra {
        // extras come from the raw path so encoded separators survive
        Some(_) => {
            let raw = last_segment(&uri).ok_or_else(|| AppError::not_found("Not found"))?;
            (params.catalog, CatalogExtras::parse(raw))
        }
        None => (strip_json(&params.catalog)?.to_string(), CatalogExtras::default()),
    };
    let content_type = params.content_type;

    let settings = ctx.settings.clone();
    let keying = catalog_keying(&settings, &extras);
    let transport = transport_url(&public_base_url(&state.config, &headers), &settings);
    let service = Arc::clone(&state.service);

    let response = state
        .cache
        .with_cache(
            &ctx,
            &keying,
            CachePolicy::retention_days(state.config.cache.catalog_days),
            move || async move {
                service
                    .catalog_outcome(&catalog, &content_type, &extras, &settings, &transport)
                    .await
            },
        )
        .await?;

    into_http_response(response)
}

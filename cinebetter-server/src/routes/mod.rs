use axum::{Router, http::Method, routing::get};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{catalog::catalog, manifest, meta::meta};
use crate::infra::app_state::AppState;

/// Addon router. Each resource is mounted bare and under a leading settings
/// segment.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/manifest.json", get(manifest::manifest))
        .route("/{settings}/manifest.json", get(manifest::configured_manifest))
        .route("/meta/{type}/{id}", get(meta))
        .route("/{settings}/meta/{type}/{id}", get(meta))
        .route("/catalog/{type}/{catalog}", get(catalog))
        .route("/catalog/{type}/{catalog}/{extra}", get(catalog))
        .route("/{settings}/catalog/{type}/{catalog}", get(catalog))
        .route("/{settings}/catalog/{type}/{catalog}/{extra}", get(catalog))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

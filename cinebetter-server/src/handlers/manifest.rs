use axum::{
    Json,
    extract::Path,
    http::{Method, Uri},
};

use cinebetter_core::manifest::{Manifest, build_manifest};

use super::request_context;

/// `GET /manifest.json`
pub async fn manifest(method: Method, uri: Uri) -> Json<Manifest> {
    let ctx = request_context(&method, &uri, false);
    Json(build_manifest(&ctx.settings))
}

/// `GET /{settings}/manifest.json`
pub async fn configured_manifest(
    method: Method,
    uri: Uri,
    Path(_settings): Path<String>,
) -> Json<Manifest> {
    let ctx = request_context(&method, &uri, true);
    Json(build_manifest(&ctx.settings))
}

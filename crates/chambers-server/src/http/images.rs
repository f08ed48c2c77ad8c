//! Image upload and byte-serving, from the database blob table or the
//! upload directory.

use crate::http::handlers_utilities::{
    declared_content_length, etag_matches, finish, json_response, no_content, not_modified,
    propagated_request_id, put_cache_headers, read_body, require_admin, run_blocking,
    store_error, with_store,
};
use crate::AppState;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chambers_api::{parse_storage_target, ApiError, ApiErrorCode, ApiResponseEnvelope, StorageTarget};
use chambers_core::canonical::strong_etag;
use chambers_core::images::UPLOAD_ROUTE_PREFIX;
use chambers_core::{is_valid_image_id, sha256_hex};
use chambers_model::{is_allowed_mime, ImageMime};
use chambers_store::is_valid_upload_name;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{info, warn};

fn image_cache_control(state: &AppState) -> String {
    format!(
        "public, max-age={}, immutable",
        state.api.image_cache_ttl.as_secs()
    )
}

fn image_response(
    state: &AppState,
    request_headers: &HeaderMap,
    mime: &str,
    sha256: &str,
    bytes: Vec<u8>,
) -> Response {
    let etag = strong_etag(sha256);
    let cache_control = image_cache_control(state);
    if etag_matches(request_headers, &etag) {
        return not_modified(&cache_control, &etag);
    }
    let len = bytes.len() as u64;
    let mut resp = (StatusCode::OK, Bytes::from(bytes)).into_response();
    let headers = resp.headers_mut();
    if let Ok(v) = HeaderValue::from_str(mime) {
        headers.insert("content-type", v);
    }
    headers.insert("content-length", HeaderValue::from(len));
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    put_cache_headers(headers, &cache_control, &etag);
    state
        .metrics
        .image_bytes_served
        .fetch_add(len, Ordering::Relaxed);
    state.metrics.images_served.fetch_add(1, Ordering::Relaxed);
    resp
}

pub(crate) async fn serve_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = serve_image(&state, &headers, id).await;
    finish(&state, "/api/images/:id", &request_id, started, result).await
}

async fn serve_image(state: &AppState, headers: &HeaderMap, id: String) -> Result<Response, ApiError> {
    if !is_valid_image_id(&id) {
        return Err(ApiError::invalid_param("id", &id));
    }
    let lookup = id.clone();
    let blob = with_store(state, move |store| store.get_image(&lookup))
        .await
        .map_err(|e| store_error(e, "image", &id))?
        .ok_or_else(|| ApiError::not_found("image", &id))?;
    if !is_allowed_mime(&blob.meta.mime_type) {
        warn!(id = %id, mime = %blob.meta.mime_type, "stored image has a disallowed mime type");
        return Err(ApiError::unsupported_media_type(&blob.meta.mime_type));
    }
    Ok(image_response(
        state,
        headers,
        &blob.meta.mime_type,
        &blob.meta.sha256,
        blob.bytes,
    ))
}

pub(crate) async fn serve_upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = serve_upload(&state, &headers, name).await;
    finish(&state, "/uploads/:name", &request_id, started, result).await
}

async fn serve_upload(state: &AppState, headers: &HeaderMap, name: String) -> Result<Response, ApiError> {
    if !is_valid_upload_name(&name) {
        return Err(ApiError::invalid_param("name", &name));
    }
    let uploads = state.uploads.clone();
    let lookup = name.clone();
    let (mime, bytes) = run_blocking(move || uploads.read(&lookup))
        .await
        .map_err(|e| store_error(e, "upload", &name))?
        .ok_or_else(|| ApiError::not_found("upload", &name))?;
    let sha = sha256_hex(&bytes);
    Ok(image_response(state, headers, mime.as_str(), &sha, bytes))
}

/// Site assets compiled into the binary, served under `/static/`.
const STATIC_ASSETS: &[(&str, &str, &[u8])] = &[
    (
        "placeholder.svg",
        "image/svg+xml",
        include_bytes!("../../assets/placeholder.svg"),
    ),
    (
        "og-default.png",
        "image/png",
        include_bytes!("../../assets/og-default.png"),
    ),
];

pub(crate) async fn serve_static_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = STATIC_ASSETS
        .iter()
        .find(|(asset, _, _)| *asset == name)
        .map(|(_, mime, bytes)| {
            image_response(&state, &headers, mime, &sha256_hex(bytes), bytes.to_vec())
        })
        .ok_or_else(|| ApiError::not_found("asset", &name));
    finish(&state, "/static/:name", &request_id, started, result).await
}

pub(crate) async fn upload_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = upload_image(&state, &headers, &params, body).await;
    finish(&state, "/api/images", &request_id, started, result).await
}

async fn upload_image(
    state: &AppState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
    body: Body,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let target = parse_storage_target(params)?;
    let declared = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mime = ImageMime::parse(&declared)
        .ok_or_else(|| ApiError::unsupported_media_type(&declared))?;
    let limit = state.api.max_upload_bytes;
    if declared_content_length(headers).is_some_and(|len| len > limit as u64) {
        return Err(ApiError::payload_too_large(limit as u64));
    }
    let bytes = read_body(body, limit).await?;
    if bytes.is_empty() {
        return Err(ApiError::invalid_body("image payload is empty"));
    }
    if !mime.matches_magic(&bytes) {
        return Err(ApiError::new(
            ApiErrorCode::UnsupportedMediaType,
            "payload does not match the declared content type",
            json!({"mime_type": mime.as_str()}),
        ));
    }
    let size_bytes = bytes.len() as u64;
    let payload = match target {
        StorageTarget::Database => {
            let meta = with_store(state, move |store| store.put_image(mime, &bytes))
                .await
                .map_err(|e| store_error(e, "image", ""))?;
            json!({
                "storage": target.as_str(),
                "id": meta.id,
                "url": meta.public_url(),
                "mime_type": meta.mime_type,
                "size_bytes": meta.size_bytes,
                "sha256": meta.sha256,
            })
        }
        StorageTarget::Disk => {
            let uploads = state.uploads.clone();
            let sha256 = sha256_hex(&bytes);
            let name = run_blocking(move || uploads.save(mime, &bytes))
                .await
                .map_err(|e| store_error(e, "upload", ""))?;
            json!({
                "storage": target.as_str(),
                "id": name,
                "url": format!("{UPLOAD_ROUTE_PREFIX}{name}"),
                "mime_type": mime.as_str(),
                "size_bytes": size_bytes,
                "sha256": sha256,
            })
        }
    };
    info!(storage = target.as_str(), mime = mime.as_str(), size_bytes, "image uploaded");
    let location = payload
        .get("url")
        .and_then(|v| v.as_str())
        .and_then(|v| HeaderValue::from_str(v).ok());
    let mut resp = json_response(
        state,
        headers,
        StatusCode::CREATED,
        &ApiResponseEnvelope::new(payload),
    )?;
    if let Some(location) = location {
        resp.headers_mut().insert("location", location);
    }
    Ok(resp)
}

pub(crate) async fn list_images_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = list_images(&state, &headers).await;
    finish(&state, "/api/images", &request_id, started, result).await
}

async fn list_images(state: &AppState, headers: &HeaderMap) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let stored = with_store(state, |store| store.list_images())
        .await
        .map_err(|e| store_error(e, "image", ""))?;
    let uploads = state.uploads.clone();
    let files = run_blocking(move || uploads.list())
        .await
        .map_err(|e| store_error(e, "upload", ""))?;
    let database: Vec<_> = stored
        .iter()
        .map(|meta| {
            json!({
                "id": meta.id,
                "url": meta.public_url(),
                "mime_type": meta.mime_type,
                "size_bytes": meta.size_bytes,
                "sha256": meta.sha256,
                "created_at": meta.created_at,
            })
        })
        .collect();
    let disk: Vec<_> = files
        .iter()
        .map(|name| json!({"id": name, "url": format!("{UPLOAD_ROUTE_PREFIX}{name}")}))
        .collect();
    json_response(
        state,
        headers,
        StatusCode::OK,
        &ApiResponseEnvelope::new(json!({"database": database, "disk": disk})),
    )
}

pub(crate) async fn delete_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = delete_image(&state, &headers, id).await;
    finish(&state, "/api/images/:id", &request_id, started, result).await
}

/// Accepts a blob id or an upload file name.
async fn delete_image(state: &AppState, headers: &HeaderMap, id: String) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let deleted = if is_valid_image_id(&id) {
        let target = id.clone();
        with_store(state, move |store| store.delete_image(&target))
            .await
            .map_err(|e| store_error(e, "image", &id))?
    } else if is_valid_upload_name(&id) {
        let uploads = state.uploads.clone();
        let target = id.clone();
        run_blocking(move || uploads.delete(&target))
            .await
            .map_err(|e| store_error(e, "upload", &id))?
    } else {
        return Err(ApiError::invalid_param("id", &id));
    };
    if !deleted {
        return Err(ApiError::not_found("image", &id));
    }
    info!(id = %id, "image deleted");
    Ok(no_content())
}

use crate::auth::is_admin;
use crate::AppState;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use brotli::CompressorWriter;
use chambers_api::{map_error, ApiError, ApiErrorCode};
use chambers_core::canonical::weak_etag;
use chambers_store::{Store, StoreError, StoreErrorCode};
use flate2::{write::GzEncoder, Compression};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::error;

pub(crate) const ANONYMOUS_CLIENT: &str = "anonymous";

pub(crate) fn api_error_response(err: ApiError, request_id: &str) -> Response {
    let status = StatusCode::from_u16(map_error(&err).status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(json!({"error": err.with_request_id(request_id)}));
    (status, body).into_response()
}

/// Maps a repository failure to its wire error. Server-side failures are
/// logged here and reach the client as a bare `Internal`.
pub(crate) fn store_error(err: StoreError, resource: &str, id: &str) -> ApiError {
    match err.code {
        StoreErrorCode::NotFound => ApiError::not_found(resource, id),
        StoreErrorCode::Conflict => ApiError::conflict(format!("{resource} conflicts with an existing record")),
        StoreErrorCode::Validation => ApiError::invalid_body(err.message),
        _ => {
            error!(resource, id, code = ?err.code, error = %err, "store operation failed");
            ApiError::internal()
        }
    }
}

/// Runs blocking work (SQLite, upload directory) off the async workers.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        StoreError::new(StoreErrorCode::Io, format!("blocking task failed: {e}"))
    })?
}

pub(crate) async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    run_blocking(move || f(&store)).await
}

pub(crate) async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::payload_too_large(limit as u64))
}

pub(crate) fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::invalid_body("request body is empty"));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::invalid_body(e.to_string()))
}

pub(crate) fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if is_admin(headers, &state.auth, now_unix()) {
        Ok(())
    } else {
        Err(ApiError::unauthorized())
    }
}

pub(crate) fn request_is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    is_admin(headers, &state.auth, now_unix())
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

pub(crate) fn if_none_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get("if-none-match")
        .and_then(|v| v.to_str().ok())
        .map(std::string::ToString::to_string)
}

/// `If-None-Match` comparison: `*`, comma lists and weak prefixes.
pub(crate) fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(raw) = if_none_match(headers) else {
        return false;
    };
    let bare = etag.trim_start_matches("W/");
    raw.split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == bare)
}

pub(crate) fn put_cache_headers(headers: &mut HeaderMap, cache_control: &str, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(cache_control) {
        headers.insert("cache-control", value);
    }
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert("etag", value);
    }
}

pub(crate) fn public_cache_control(ttl: Duration) -> String {
    format!("public, max-age={}", ttl.as_secs())
}

pub(crate) fn not_modified(cache_control: &str, etag: &str) -> Response {
    let mut resp = StatusCode::NOT_MODIFIED.into_response();
    put_cache_headers(resp.headers_mut(), cache_control, etag);
    resp
}

pub(crate) fn accepted_encoding(headers: &HeaderMap) -> Option<&'static str> {
    let accept = headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())?;
    if accept.contains("br") {
        Some("br")
    } else if accept.contains("gzip") {
        Some("gzip")
    } else {
        None
    }
}

pub(crate) fn maybe_compress_response(
    headers: &HeaderMap,
    state: &AppState,
    bytes: Vec<u8>,
) -> Result<(Vec<u8>, Option<&'static str>), ApiError> {
    if !state.api.enable_response_compression || bytes.len() < state.api.compression_min_bytes {
        return Ok((bytes, None));
    }
    match accepted_encoding(headers) {
        Some("gzip") => {
            let mut encoder = GzEncoder::new(
                Vec::with_capacity((bytes.len() / 2).max(256)),
                Compression::fast(),
            );
            encoder.write_all(&bytes).map_err(|e| {
                error!(error = %e, "gzip encoding failed");
                ApiError::internal()
            })?;
            let compressed = encoder.finish().map_err(|e| {
                error!(error = %e, "gzip finalize failed");
                ApiError::internal()
            })?;
            Ok((compressed, Some("gzip")))
        }
        Some("br") => {
            let mut compressed = Vec::with_capacity((bytes.len() / 2).max(256));
            {
                let mut writer = CompressorWriter::new(&mut compressed, 4096, 4, 22);
                writer.write_all(&bytes).map_err(|e| {
                    error!(error = %e, "brotli encoding failed");
                    ApiError::internal()
                })?;
            }
            Ok((compressed, Some("br")))
        }
        _ => Ok((bytes, None)),
    }
}

fn encoded_response(
    state: &AppState,
    request_headers: &HeaderMap,
    status: StatusCode,
    content_type: &'static str,
    bytes: Vec<u8>,
) -> Result<Response, ApiError> {
    let (body, encoding) = maybe_compress_response(request_headers, state, bytes)?;
    let mut resp = (status, body).into_response();
    resp.headers_mut()
        .insert("content-type", HeaderValue::from_static(content_type));
    if let Some(encoding) = encoding {
        resp.headers_mut()
            .insert("content-encoding", HeaderValue::from_static(encoding));
        resp.headers_mut()
            .insert("vary", HeaderValue::from_static("accept-encoding"));
    }
    Ok(resp)
}

pub(crate) fn json_response<T: Serialize>(
    state: &AppState,
    request_headers: &HeaderMap,
    status: StatusCode,
    payload: &T,
) -> Result<Response, ApiError> {
    let bytes = serde_json::to_vec(payload).map_err(|e| {
        error!(error = %e, "json serialization failed");
        ApiError::internal()
    })?;
    encoded_response(state, request_headers, status, "application/json", bytes)
}

pub(crate) fn html_response(
    state: &AppState,
    request_headers: &HeaderMap,
    status: StatusCode,
    html: String,
) -> Result<Response, ApiError> {
    encoded_response(
        state,
        request_headers,
        status,
        "text/html; charset=utf-8",
        html.into_bytes(),
    )
}

/// JSON with a weak ETag; `If-None-Match` hits short-circuit to 304.
pub(crate) fn cached_json<T: Serialize>(
    state: &AppState,
    request_headers: &HeaderMap,
    payload: &T,
    public: bool,
) -> Result<Response, ApiError> {
    let etag = weak_etag(payload).map_err(|e| {
        error!(error = %e, "etag computation failed");
        ApiError::internal()
    })?;
    let cache_control = if public {
        public_cache_control(state.api.list_cache_ttl)
    } else {
        "private, no-store".to_string()
    };
    if etag_matches(request_headers, &etag) {
        return Ok(not_modified(&cache_control, &etag));
    }
    let mut resp = json_response(state, request_headers, StatusCode::OK, payload)?;
    put_cache_headers(resp.headers_mut(), &cache_control, &etag);
    Ok(resp)
}

pub(crate) fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.len() <= 128 {
            return trimmed.to_string();
        }
    }
    if let Some(raw) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.len() <= 128 {
            return format!("trace-{trimmed}");
        }
    }
    make_request_id(state)
}

fn normalized_address(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value.len() > 64 {
        return None;
    }
    if value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
    {
        Some(value.to_string())
    } else {
        None
    }
}

pub(crate) fn normalized_forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    normalized_address(raw.split(',').next()?)
}

/// Rate-limit key: first forwarded address, then `x-real-ip`, then the
/// socket peer, then a shared anonymous bucket.
pub(crate) fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    normalized_forwarded_for(headers)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(normalized_address)
        })
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

/// Common tail of every handler: error mapping, metrics, request id header.
pub(crate) async fn finish(
    state: &AppState,
    route: &str,
    request_id: &str,
    started: Instant,
    result: Result<Response, ApiError>,
) -> Response {
    let resp = match result {
        Ok(resp) => resp,
        Err(err) => {
            if err.code == ApiErrorCode::Internal {
                error!(route, request_id, "request failed with internal error");
            }
            api_error_response(err, request_id)
        }
    };
    state
        .metrics
        .observe_request(route, resp.status(), started.elapsed())
        .await;
    with_request_id(resp, request_id)
}

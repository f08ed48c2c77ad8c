use crate::http::handlers_utilities::{
    api_error_response, client_key, normalized_forwarded_for, propagated_request_id,
};
use crate::rate_limiter::RateDecision;
use crate::AppState;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chambers_api::ApiError;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{info, warn};

fn normalized_header_value(headers: &HeaderMap, name: &str, max_len: usize) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > max_len {
        return None;
    }
    Some(value.to_string())
}

/// Security headers on every response, plus the optional audit event.
pub(crate) async fn security_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id =
        normalized_header_value(req.headers(), "x-request-id", 128).unwrap_or_default();
    let client_ip =
        normalized_forwarded_for(req.headers()).unwrap_or_else(|| "unknown".to_string());

    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    if state.api.enable_audit_log {
        info!(
            target: "chambers_audit",
            method = %method,
            path = %path,
            status = resp.status().as_u16(),
            request_id = %request_id,
            client_ip = %client_ip,
            latency_ms = started.elapsed().as_millis() as u64,
            "audit"
        );
    }
    resp
}

fn origin_allowed(state: &AppState, origin: &str) -> bool {
    state
        .api
        .cors_allowed_origins
        .iter()
        .any(|x| x == origin)
}

pub(crate) async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = normalized_header_value(req.headers(), "origin", 256);
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        if let Some(origin_value) = origin.filter(|o| origin_allowed(&state, o)) {
            if let Ok(v) = HeaderValue::from_str(&origin_value) {
                resp.headers_mut().insert("access-control-allow-origin", v);
            }
            resp.headers_mut().insert(
                "access-control-allow-methods",
                HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
            );
            resp.headers_mut().insert(
                "access-control-allow-headers",
                HeaderValue::from_static("authorization,content-type,x-request-id"),
            );
            resp.headers_mut().insert(
                "access-control-max-age",
                HeaderValue::from_static("600"),
            );
            resp.headers_mut()
                .insert("vary", HeaderValue::from_static("Origin"));
        }
        return resp;
    }

    let mut resp = next.run(req).await;
    if let Some(origin_value) = origin.filter(|o| origin_allowed(&state, o)) {
        if let Ok(v) = HeaderValue::from_str(&origin_value) {
            resp.headers_mut().insert("access-control-allow-origin", v);
        }
        // Keeps any `vary: accept-encoding` set by the handler.
        resp.headers_mut()
            .append("vary", HeaderValue::from_static("Origin"));
    }
    resp
}

pub(crate) fn is_rate_limited_route(method: &Method, path: &str) -> bool {
    path.starts_with("/api/")
        || (method == Method::POST && (path == "/contact" || path == "/admin/login"))
}

fn put_rate_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_after_secs()),
    );
}

/// Fixed-window admission for the API, the contact form and the admin login.
pub(crate) async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.api.enable_rate_limit
        || req.method() == Method::OPTIONS
        || !is_rate_limited_route(req.method(), req.uri().path())
    {
        return next.run(req).await;
    }
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(req.headers(), peer);
    let decision = state.limiter.check(&key, &state.api.rate_limit).await;
    if !decision.allowed {
        state
            .metrics
            .rate_limited_total
            .fetch_add(1, Ordering::Relaxed);
        warn!(client = %key, path = %req.uri().path(), "rate limit exceeded");
        let request_id = propagated_request_id(req.headers(), &state);
        let retry_after = decision.reset_after_secs();
        let mut resp = api_error_response(ApiError::rate_limited(retry_after), &request_id);
        put_rate_headers(resp.headers_mut(), &decision);
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from(retry_after));
        return resp;
    }
    let mut resp = next.run(req).await;
    put_rate_headers(resp.headers_mut(), &decision);
    resp
}

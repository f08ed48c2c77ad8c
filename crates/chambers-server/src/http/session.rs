use crate::auth::{issue_session, session_clear_cookie, session_set_cookie, token_matches};
use crate::http::handlers_utilities::{
    finish, now_unix, parse_json, propagated_request_id, read_body,
};
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chambers_api::ApiError;
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionRequest {
    token: String,
}

/// Exchanges the admin token for a signed cookie; `None` when the token is wrong.
pub(crate) fn open_session(state: &AppState, token: &str) -> Option<String> {
    if !token_matches(&state.auth, token) {
        return None;
    }
    let key = state.auth.signing_key()?;
    let ttl = state.auth.session_ttl.as_secs();
    let expires_at = now_unix().saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX));
    let value = issue_session(key, expires_at)?;
    let secure = state.site.base_url.starts_with("https://");
    Some(session_set_cookie(&value, ttl, secure))
}

pub(crate) fn with_cookie(mut resp: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        resp.headers_mut().insert("set-cookie", value);
    }
    resp.headers_mut()
        .insert("cache-control", HeaderValue::from_static("no-store"));
    resp
}

pub(crate) async fn create_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = create_session(&state, body).await;
    finish(&state, "/api/admin/session", &request_id, started, result).await
}

async fn create_session(state: &AppState, body: Body) -> Result<Response, ApiError> {
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let request: SessionRequest = parse_json(&bytes)?;
    let Some(cookie) = open_session(state, &request.token) else {
        warn!("admin session rejected");
        return Err(ApiError::unauthorized());
    };
    info!("admin session opened");
    Ok(with_cookie(StatusCode::NO_CONTENT.into_response(), &cookie))
}

pub(crate) async fn delete_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = with_cookie(
        StatusCode::NO_CONTENT.into_response(),
        &session_clear_cookie(),
    );
    finish(&state, "/api/admin/session", &request_id, started, Ok(resp)).await
}

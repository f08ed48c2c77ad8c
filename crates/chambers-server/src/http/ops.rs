use crate::http::handlers_utilities::{
    finish, json_response, propagated_request_id, with_store,
};
use crate::{AppState, CONFIG_SCHEMA_VERSION, CRATE_NAME};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chambers_api::{openapi_v1_spec, API_VERSION};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::warn;

pub(crate) async fn healthz_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    finish(&state, "/healthz", &request_id, started, Ok(resp)).await
}

/// Ready while accepting traffic and the database answers.
pub(crate) async fn readyz_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let flagged_ready =
        state.ready.load(Ordering::Relaxed) && state.accepting_requests.load(Ordering::Relaxed);
    let store_ok = if flagged_ready {
        match with_store(&state, |store| store.ping()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "readiness check: database unavailable");
                false
            }
        }
    } else {
        false
    };
    let resp = if store_ok {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response()
    };
    finish(&state, "/readyz", &request_id, started, Ok(resp)).await
}

pub(crate) async fn version_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let payload = json!({
        "name": "chambers",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": API_VERSION,
        "build_hash": option_env!("CHAMBERS_BUILD_HASH").unwrap_or("dev"),
        "server": {
            "crate": CRATE_NAME,
            "config_schema_version": CONFIG_SCHEMA_VERSION,
        }
    });
    let result = json_response(&state, &headers, StatusCode::OK, &payload).map(|mut resp| {
        resp.headers_mut()
            .insert("cache-control", HeaderValue::from_static("public, max-age=30"));
        resp
    });
    finish(&state, "/api/version", &request_id, started, result).await
}

pub(crate) async fn openapi_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let result = json_response(&state, &headers, StatusCode::OK, &openapi_v1_spec());
    finish(&state, "/api/openapi.json", &request_id, started, result).await
}

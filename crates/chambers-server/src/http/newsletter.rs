use crate::http::handlers_utilities::{
    finish, json_response, no_content, parse_json, propagated_request_id, read_body,
    require_admin, store_error, with_store,
};
use crate::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use chambers_api::{
    parse_bool_flag, parse_id, required_email_param, ApiError, ApiResponseEnvelope, ListEnvelope,
};
use chambers_model::{NewsletterSignup, SubscribeOutcome};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn subscribe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = subscribe(&state, &headers, body).await;
    finish(&state, "/api/newsletter", &request_id, started, result).await
}

async fn subscribe(state: &AppState, headers: &HeaderMap, body: Body) -> Result<Response, ApiError> {
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let signup: NewsletterSignup = parse_json(&bytes)?;
    signup.validate()?;
    let email = signup.normalized_email();
    let (subscription, outcome) = with_store(state, move |store| store.subscribe(&email))
        .await
        .map_err(|e| store_error(e, "newsletter subscription", ""))?;
    info!(id = subscription.id, outcome = outcome.as_str(), "newsletter subscription");
    let status = if outcome == SubscribeOutcome::Created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let payload = json!({
        "email": subscription.email,
        "outcome": outcome,
        "subscribed_at": subscription.subscribed_at,
    });
    json_response(state, headers, status, &ApiResponseEnvelope::new(payload))
}

pub(crate) async fn unsubscribe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = unsubscribe(&state, &params).await;
    finish(&state, "/api/newsletter", &request_id, started, result).await
}

/// Always 204 for a well-formed address, so the endpoint cannot be used to
/// find out who is subscribed.
async fn unsubscribe(state: &AppState, params: &BTreeMap<String, String>) -> Result<Response, ApiError> {
    let email = required_email_param(params)?;
    let removed = with_store(state, move |store| store.unsubscribe(&email))
        .await
        .map_err(|e| store_error(e, "newsletter subscription", ""))?;
    if removed {
        info!("newsletter unsubscribe");
    }
    Ok(no_content())
}

pub(crate) async fn list_subscriptions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = list_subscriptions(&state, &headers, &params).await;
    finish(&state, "/api/newsletter", &request_id, started, result).await
}

async fn list_subscriptions(
    state: &AppState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let active_only = parse_bool_flag(params, "active")?;
    let subscriptions = with_store(state, move |store| store.list_subscriptions(active_only))
        .await
        .map_err(|e| store_error(e, "newsletter subscription", ""))?;
    json_response(
        state,
        headers,
        StatusCode::OK,
        &ListEnvelope::complete(subscriptions),
    )
}

pub(crate) async fn delete_subscription_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = delete_subscription(&state, &headers, &raw_id).await;
    finish(&state, "/api/newsletter/:id", &request_id, started, result).await
}

async fn delete_subscription(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let deleted = with_store(state, move |store| store.delete_subscription(id))
        .await
        .map_err(|e| store_error(e, "newsletter subscription", raw_id))?;
    if !deleted {
        return Err(ApiError::not_found("newsletter subscription", raw_id));
    }
    info!(id, "newsletter subscription deleted");
    Ok(no_content())
}

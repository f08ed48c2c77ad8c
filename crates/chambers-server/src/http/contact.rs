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
    parse_contact_status_filter, parse_id, parse_pagination, ApiError, ApiResponseEnvelope,
    ListEnvelope,
};
use chambers_model::{ContactMessage, ContactStatusUpdate, ContactSubmission};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Validates and stores a submission. Shared by the JSON API and the HTML form.
pub(crate) async fn submit_contact(
    state: &AppState,
    submission: ContactSubmission,
) -> Result<ContactMessage, ApiError> {
    submission.validate()?;
    let message = with_store(state, move |store| store.create_contact_message(&submission))
        .await
        .map_err(|e| store_error(e, "contact message", ""))?;
    info!(id = message.id, "contact message received");
    Ok(message)
}

pub(crate) async fn create_contact_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = create_contact(&state, &headers, body).await;
    finish(&state, "/api/contact", &request_id, started, result).await
}

async fn create_contact(state: &AppState, headers: &HeaderMap, body: Body) -> Result<Response, ApiError> {
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let submission: ContactSubmission = parse_json(&bytes)?;
    let message = submit_contact(state, submission).await?;
    // The public caller only gets an acknowledgement back.
    let ack = json!({
        "id": message.id,
        "status": message.status,
        "created_at": message.created_at,
    });
    json_response(state, headers, StatusCode::CREATED, &ApiResponseEnvelope::new(ack))
}

pub(crate) async fn list_contact_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = list_contact(&state, &headers, &params).await;
    finish(&state, "/api/contact", &request_id, started, result).await
}

async fn list_contact(
    state: &AppState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let page = parse_pagination(params)?;
    let status = parse_contact_status_filter(params)?;
    let found = with_store(state, move |store| {
        store.list_contact_messages(status, page.limit, page.offset)
    })
    .await
    .map_err(|e| store_error(e, "contact message", ""))?;
    json_response(
        state,
        headers,
        StatusCode::OK,
        &ListEnvelope::new(found.items, found.total, page),
    )
}

pub(crate) async fn get_contact_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = get_contact(&state, &headers, &raw_id).await;
    finish(&state, "/api/contact/:id", &request_id, started, result).await
}

async fn get_contact(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let message = with_store(state, move |store| store.get_contact_message(id))
        .await
        .map_err(|e| store_error(e, "contact message", raw_id))?
        .ok_or_else(|| ApiError::not_found("contact message", raw_id))?;
    json_response(state, headers, StatusCode::OK, &ApiResponseEnvelope::new(message))
}

pub(crate) async fn update_contact_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = update_contact(&state, &headers, &raw_id, body).await;
    finish(&state, "/api/contact/:id", &request_id, started, result).await
}

async fn update_contact(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    body: Body,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let update: ContactStatusUpdate = parse_json(&bytes)?;
    let message = with_store(state, move |store| store.update_contact_status(id, update.status))
        .await
        .map_err(|e| store_error(e, "contact message", raw_id))?;
    info!(id, status = %message.status, "contact message status changed");
    json_response(state, headers, StatusCode::OK, &ApiResponseEnvelope::new(message))
}

pub(crate) async fn delete_contact_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = delete_contact(&state, &headers, &raw_id).await;
    finish(&state, "/api/contact/:id", &request_id, started, result).await
}

async fn delete_contact(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let deleted = with_store(state, move |store| store.delete_contact_message(id))
        .await
        .map_err(|e| store_error(e, "contact message", raw_id))?;
    if !deleted {
        return Err(ApiError::not_found("contact message", raw_id));
    }
    info!(id, "contact message deleted");
    Ok(no_content())
}

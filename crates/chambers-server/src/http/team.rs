use crate::http::handlers_utilities::{
    cached_json, finish, json_response, no_content, parse_json, propagated_request_id,
    read_body, request_is_admin, require_admin, store_error, with_store,
};
use crate::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use chambers_api::{parse_bool_flag, parse_id, ApiError, ApiResponseEnvelope, ListEnvelope};
use chambers_model::{TeamMemberDraft, TeamMemberPatch};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_team_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = list_team(&state, &headers, &params).await;
    finish(&state, "/api/team", &request_id, started, result).await
}

async fn list_team(
    state: &AppState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let include_inactive = parse_bool_flag(params, "all")?;
    if include_inactive {
        require_admin(state, headers)?;
    }
    let members = with_store(state, move |store| store.list_team(!include_inactive))
        .await
        .map_err(|e| store_error(e, "team member", ""))?;
    cached_json(
        state,
        headers,
        &ListEnvelope::complete(members),
        !include_inactive,
    )
}

pub(crate) async fn get_team_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = get_team_member(&state, &headers, &raw_id).await;
    finish(&state, "/api/team/:id", &request_id, started, result).await
}

async fn get_team_member(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_id(raw_id)?;
    let member = with_store(state, move |store| store.get_team_member(id))
        .await
        .map_err(|e| store_error(e, "team member", raw_id))?
        .filter(|m| m.active || request_is_admin(state, headers))
        .ok_or_else(|| ApiError::not_found("team member", raw_id))?;
    json_response(state, headers, StatusCode::OK, &ApiResponseEnvelope::new(member))
}

pub(crate) async fn create_team_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = create_team_member(&state, &headers, body).await;
    finish(&state, "/api/team", &request_id, started, result).await
}

async fn create_team_member(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let draft: TeamMemberDraft = parse_json(&bytes)?;
    draft.validate()?;
    let member = with_store(state, move |store| store.create_team_member(&draft))
        .await
        .map_err(|e| store_error(e, "team member", ""))?;
    info!(id = member.id, slug = %member.slug, "team member created");
    json_response(state, headers, StatusCode::CREATED, &ApiResponseEnvelope::new(member))
}

pub(crate) async fn update_team_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = update_team_member(&state, &headers, &raw_id, body).await;
    finish(&state, "/api/team/:id", &request_id, started, result).await
}

async fn update_team_member(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    body: Body,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let patch: TeamMemberPatch = parse_json(&bytes)?;
    if patch.is_empty() {
        return Err(ApiError::invalid_body("patch contains no fields"));
    }
    patch.validate()?;
    let member = with_store(state, move |store| store.update_team_member(id, &patch))
        .await
        .map_err(|e| store_error(e, "team member", raw_id))?;
    info!(id = member.id, slug = %member.slug, "team member updated");
    json_response(state, headers, StatusCode::OK, &ApiResponseEnvelope::new(member))
}

pub(crate) async fn delete_team_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = delete_team_member(&state, &headers, &raw_id).await;
    finish(&state, "/api/team/:id", &request_id, started, result).await
}

async fn delete_team_member(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let deleted = with_store(state, move |store| store.delete_team_member(id))
        .await
        .map_err(|e| store_error(e, "team member", raw_id))?;
    if !deleted {
        return Err(ApiError::not_found("team member", raw_id));
    }
    info!(id, "team member deleted");
    Ok(no_content())
}

use crate::http::handlers_utilities::{
    cached_json, finish, json_response, no_content, parse_json, propagated_request_id,
    read_body, request_is_admin, require_admin, store_error, with_store,
};
use crate::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use chambers_api::{
    parse_bool_flag, parse_category, parse_id, parse_pagination, ApiError, ApiResponseEnvelope,
    ListEnvelope,
};
use chambers_model::{NewsDraft, NewsPatch};
use chambers_store::NewsQuery;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_news_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = list_news(&state, &headers, &params).await;
    finish(&state, "/api/news", &request_id, started, result).await
}

async fn list_news(
    state: &AppState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let page = parse_pagination(params)?;
    let category = parse_category(params)?;
    let include_drafts = parse_bool_flag(params, "all")?;
    if include_drafts {
        require_admin(state, headers)?;
    }
    let query = NewsQuery {
        published_only: !include_drafts,
        category,
        limit: page.limit,
        offset: page.offset,
    };
    let found = with_store(state, move |store| store.list_news(&query))
        .await
        .map_err(|e| store_error(e, "news", ""))?;
    let envelope = ListEnvelope::new(found.items, found.total, page);
    cached_json(state, headers, &envelope, !include_drafts)
}

pub(crate) async fn get_news_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = get_news(&state, &headers, &raw_id).await;
    finish(&state, "/api/news/:id", &request_id, started, result).await
}

async fn get_news(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<Response, ApiError> {
    let id = parse_id(raw_id)?;
    let news = with_store(state, move |store| store.get_news(id))
        .await
        .map_err(|e| store_error(e, "news", raw_id))?;
    // Drafts are invisible to the public.
    let news = news
        .filter(|n| n.published || request_is_admin(state, headers))
        .ok_or_else(|| ApiError::not_found("news", raw_id))?;
    json_response(state, headers, StatusCode::OK, &ApiResponseEnvelope::new(news))
}

pub(crate) async fn news_by_slug_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = news_by_slug(&state, &headers, slug).await;
    finish(&state, "/api/news/slug/:slug", &request_id, started, result).await
}

async fn news_by_slug(state: &AppState, headers: &HeaderMap, slug: String) -> Result<Response, ApiError> {
    let lookup = slug.clone();
    let news = with_store(state, move |store| store.get_news_by_slug(&lookup))
        .await
        .map_err(|e| store_error(e, "news", &slug))?
        .filter(|n| n.published)
        .ok_or_else(|| ApiError::not_found("news", &slug))?;
    cached_json(state, headers, &ApiResponseEnvelope::new(news), true)
}

pub(crate) async fn create_news_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = create_news(&state, &headers, body).await;
    finish(&state, "/api/news", &request_id, started, result).await
}

async fn create_news(state: &AppState, headers: &HeaderMap, body: Body) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let draft: NewsDraft = parse_json(&bytes)?;
    draft.validate()?;
    let news = with_store(state, move |store| store.create_news(&draft))
        .await
        .map_err(|e| store_error(e, "news", ""))?;
    info!(id = news.id, slug = %news.slug, published = news.published, "news created");
    json_response(state, headers, StatusCode::CREATED, &ApiResponseEnvelope::new(news))
}

pub(crate) async fn update_news_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Body,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = update_news(&state, &headers, &raw_id, body).await;
    finish(&state, "/api/news/:id", &request_id, started, result).await
}

async fn update_news(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    body: Body,
) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let bytes = read_body(body, state.api.max_body_bytes).await?;
    let patch: NewsPatch = parse_json(&bytes)?;
    if patch.is_empty() {
        return Err(ApiError::invalid_body("patch contains no fields"));
    }
    patch.validate()?;
    let news = with_store(state, move |store| store.update_news(id, &patch))
        .await
        .map_err(|e| store_error(e, "news", raw_id))?;
    info!(id = news.id, slug = %news.slug, "news updated");
    json_response(state, headers, StatusCode::OK, &ApiResponseEnvelope::new(news))
}

pub(crate) async fn delete_news_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = delete_news(&state, &headers, &raw_id).await;
    finish(&state, "/api/news/:id", &request_id, started, result).await
}

async fn delete_news(state: &AppState, headers: &HeaderMap, raw_id: &str) -> Result<Response, ApiError> {
    require_admin(state, headers)?;
    let id = parse_id(raw_id)?;
    let deleted = with_store(state, move |store| store.delete_news(id))
        .await
        .map_err(|e| store_error(e, "news", raw_id))?;
    if !deleted {
        return Err(ApiError::not_found("news", raw_id));
    }
    info!(id, "news deleted");
    Ok(no_content())
}

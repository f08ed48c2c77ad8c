//! Public HTML pages. Markup is assembled from escaped fragments; article
//! bodies are editor-authored HTML and are emitted as stored.

use crate::http::contact::submit_contact;
use crate::http::handlers_utilities::{
    finish, html_response, propagated_request_id, public_cache_control, store_error, with_store,
};
use crate::AppState;
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chambers_api::{ApiError, PageMetadata};
use chambers_core::images::{resolve_image_url, PLACEHOLDER_IMAGE_URL};
use chambers_core::text::{escape_html, excerpt, format_date, initials, reading_time_minutes};
use chambers_model::{non_empty, ContactSubmission, News, TeamMember, ValidationErrors};
use chambers_store::NewsQuery;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

pub(crate) const NEWS_PAGE_SIZE: u32 = 10;
const HOME_NEWS_COUNT: u32 = 3;
const HOME_TEAM_COUNT: usize = 4;
const CARD_EXCERPT_CHARS: usize = 180;

/// Wraps page content in the shared shell: head metadata, navigation, footer.
pub(crate) fn layout(state: &AppState, meta: &PageMetadata, body: &str) -> String {
    let site = &state.site;
    let name = escape_html(&site.name);
    let mut footer = String::new();
    if !site.address.is_empty() {
        let _ = write!(footer, "<p class=\"address\">{}</p>", escape_html(&site.address));
    }
    if !site.contact_phone.is_empty() {
        let _ = write!(footer, "<p>Tel: {}</p>", escape_html(&site.contact_phone));
    }
    if !site.contact_email.is_empty() {
        let email = escape_html(&site.contact_email);
        let _ = write!(footer, "<p><a href=\"mailto:{email}\">{email}</a></p>");
    }
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         {head}\n</head>\n<body>\n\
         <header><a class=\"brand\" href=\"/\">{name}</a>\
         <nav><a href=\"/\">Home</a> <a href=\"/team\">Team</a> \
         <a href=\"/news\">News</a> <a href=\"/contact\">Contact</a></nav></header>\n\
         <main>\n{body}\n</main>\n\
         <footer>{footer}<p>&copy; {name}</p></footer>\n</body>\n</html>\n",
        head = meta.render_head(),
    )
}

fn page_response(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    html: String,
    cacheable: bool,
) -> Result<Response, ApiError> {
    let mut resp = html_response(state, headers, status, html)?;
    let cache_control = if cacheable && status == StatusCode::OK {
        public_cache_control(state.api.list_cache_ttl)
    } else {
        "no-store".to_string()
    };
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        resp.headers_mut().insert("cache-control", value);
    }
    Ok(resp)
}

fn not_found_page(state: &AppState, headers: &HeaderMap, path: &str) -> Result<Response, ApiError> {
    let meta = PageMetadata::for_page(
        &state.site.identity(),
        "Page not found",
        Some("The page you were looking for does not exist."),
        path,
    );
    let body = "<h1>Page not found</h1>\n\
                <p>The page you were looking for does not exist or has moved.</p>\n\
                <p><a href=\"/\">Return to the home page</a></p>";
    page_response(
        state,
        headers,
        StatusCode::NOT_FOUND,
        layout(state, &meta, body),
        false,
    )
}

fn news_card(news: &News) -> String {
    let summary = if news.excerpt.trim().is_empty() {
        excerpt(&news.content, CARD_EXCERPT_CHARS)
    } else {
        news.excerpt.clone()
    };
    let category = news
        .category
        .as_deref()
        .map(|c| format!("<span class=\"category\">{}</span> ", escape_html(c)))
        .unwrap_or_default();
    format!(
        "<article class=\"news-card\">\
         <img src=\"{image}\" alt=\"\" loading=\"lazy\">\
         <p class=\"meta\">{category}<time>{date}</time></p>\
         <h3><a href=\"/news/{slug}\">{title}</a></h3>\
         <p>{summary}</p></article>",
        image = escape_html(&resolve_image_url(news.image_url.as_deref(), PLACEHOLDER_IMAGE_URL)),
        date = escape_html(&format_date(&news.display_date())),
        slug = escape_html(&news.slug),
        title = escape_html(&news.title),
        summary = escape_html(&summary),
    )
}

fn member_card(member: &TeamMember) -> String {
    let portrait = match member.image_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => format!(
            "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
            escape_html(&resolve_image_url(Some(url), PLACEHOLDER_IMAGE_URL)),
            escape_html(&member.name),
        ),
        _ => format!(
            "<span class=\"initials\">{}</span>",
            escape_html(&initials(&member.name))
        ),
    };
    format!(
        "<article class=\"member-card\">{portrait}\
         <h3><a href=\"/team/{slug}\">{name}</a></h3>\
         <p class=\"role\">{role}</p></article>",
        slug = escape_html(&member.slug),
        name = escape_html(&member.name),
        role = escape_html(&member.role),
    )
}

pub(crate) async fn home_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = home(&state, &headers).await;
    finish(&state, "/", &request_id, started, result).await
}

async fn home(state: &AppState, headers: &HeaderMap) -> Result<Response, ApiError> {
    let (latest, team) = with_store(state, |store| {
        let latest = store.list_news(&NewsQuery {
            published_only: true,
            category: None,
            limit: HOME_NEWS_COUNT,
            offset: 0,
        })?;
        let team = store.list_team(true)?;
        Ok((latest, team))
    })
    .await
    .map_err(|e| store_error(e, "page", "/"))?;

    let site = &state.site;
    let mut body = format!(
        "<section class=\"hero\"><h1>{}</h1><p>{}</p>\
         <p><a class=\"button\" href=\"/contact\">Book a consultation</a></p></section>\n",
        escape_html(&site.name),
        escape_html(&site.description),
    );
    if !team.is_empty() {
        body.push_str("<section class=\"team\"><h2>Our team</h2>");
        for member in team.iter().take(HOME_TEAM_COUNT) {
            body.push_str(&member_card(member));
        }
        body.push_str("<p><a href=\"/team\">Meet the whole team</a></p></section>\n");
    }
    if !latest.items.is_empty() {
        body.push_str("<section class=\"news\"><h2>Latest news</h2>");
        for news in &latest.items {
            body.push_str(&news_card(news));
        }
        body.push_str("<p><a href=\"/news\">All news</a></p></section>\n");
    }
    let meta = PageMetadata::for_page(&site.identity(), "", None, "/");
    page_response(state, headers, StatusCode::OK, layout(state, &meta, &body), true)
}

pub(crate) async fn team_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = team_page(&state, &headers).await;
    finish(&state, "/team", &request_id, started, result).await
}

async fn team_page(state: &AppState, headers: &HeaderMap) -> Result<Response, ApiError> {
    let team = with_store(state, |store| store.list_team(true))
        .await
        .map_err(|e| store_error(e, "page", "/team"))?;
    let mut body = String::from("<h1>Our team</h1>\n<section class=\"team\">");
    if team.is_empty() {
        body.push_str("<p>Team profiles are coming soon.</p>");
    }
    for member in &team {
        body.push_str(&member_card(member));
    }
    body.push_str("</section>");
    let meta = PageMetadata::for_page(
        &state.site.identity(),
        "Our team",
        Some(&format!("Meet the lawyers of {}.", state.site.name)),
        "/team",
    );
    page_response(state, headers, StatusCode::OK, layout(state, &meta, &body), true)
}

pub(crate) async fn member_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = member_page(&state, &headers, slug).await;
    finish(&state, "/team/:slug", &request_id, started, result).await
}

async fn member_page(state: &AppState, headers: &HeaderMap, slug: String) -> Result<Response, ApiError> {
    let lookup = slug.clone();
    let member = with_store(state, move |store| store.get_team_member_by_slug(&lookup))
        .await
        .map_err(|e| store_error(e, "team member", &slug))?
        .filter(|m| m.active);
    let Some(member) = member else {
        return not_found_page(state, headers, &format!("/team/{slug}"));
    };

    let mut body = format!(
        "<article class=\"member\">{card}<div class=\"bio\">{bio}</div>",
        card = member_card(&member),
        bio = paragraphs(&member.bio),
    );
    if !member.specialties.is_empty() {
        body.push_str("<h2>Practice areas</h2><ul class=\"specialties\">");
        for specialty in &member.specialties {
            let _ = write!(body, "<li>{}</li>", escape_html(specialty));
        }
        body.push_str("</ul>");
    }
    body.push_str("<ul class=\"contact\">");
    if let Some(email) = &member.email {
        let email = escape_html(email);
        let _ = write!(body, "<li><a href=\"mailto:{email}\">{email}</a></li>");
    }
    if let Some(phone) = &member.phone {
        let _ = write!(body, "<li>{}</li>", escape_html(phone));
    }
    if let Some(linkedin) = &member.linkedin_url {
        let _ = write!(
            body,
            "<li><a href=\"{}\" rel=\"noopener\">LinkedIn</a></li>",
            escape_html(linkedin)
        );
    }
    body.push_str("</ul></article>");
    let meta = PageMetadata::for_member(&state.site.identity(), &member);
    page_response(state, headers, StatusCode::OK, layout(state, &meta, &body), true)
}

/// Plain text split on blank lines into escaped `<p>` blocks.
fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p)))
        .collect()
}

pub(crate) async fn news_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = news_page(&state, &headers, &params).await;
    finish(&state, "/news", &request_id, started, result).await
}

/// 1-based `page` query parameter.
fn page_number(params: &BTreeMap<String, String>) -> Result<u32, ApiError> {
    match params.get("page").map(|v| v.trim()) {
        None | Some("") => Ok(1),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=10_000).contains(n))
            .ok_or_else(|| ApiError::invalid_param("page", raw)),
    }
}

async fn news_page(
    state: &AppState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let page = page_number(params)?;
    let category = params
        .get("category")
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let query = NewsQuery {
        published_only: true,
        category: category.clone(),
        limit: NEWS_PAGE_SIZE,
        offset: (page - 1) * NEWS_PAGE_SIZE,
    };
    let (found, categories) = with_store(state, move |store| {
        Ok((store.list_news(&query)?, store.list_news_categories()?))
    })
    .await
    .map_err(|e| store_error(e, "page", "/news"))?;

    let mut body = String::from("<h1>News</h1>\n");
    if !categories.is_empty() {
        body.push_str("<nav class=\"categories\"><a href=\"/news\">All</a>");
        for c in &categories {
            let _ = write!(
                body,
                " <a href=\"/news?category={}\">{}</a>",
                escape_html(&query_escape(c)),
                escape_html(c)
            );
        }
        body.push_str("</nav>\n");
    }
    if found.items.is_empty() {
        body.push_str("<p>No articles yet.</p>");
    }
    for news in &found.items {
        body.push_str(&news_card(news));
    }
    let pages = found.total.div_ceil(u64::from(NEWS_PAGE_SIZE)).max(1);
    if pages > 1 {
        let suffix = category
            .as_deref()
            .map(|c| format!("&category={}", query_escape(c)))
            .unwrap_or_default();
        body.push_str("<nav class=\"pagination\">");
        if page > 1 {
            let _ = write!(
                body,
                "<a rel=\"prev\" href=\"/news?page={}{}\">Newer</a> ",
                page - 1,
                escape_html(&suffix)
            );
        }
        let _ = write!(body, "<span>Page {page} of {pages}</span>");
        if u64::from(page) < pages {
            let _ = write!(
                body,
                " <a rel=\"next\" href=\"/news?page={}{}\">Older</a>",
                page + 1,
                escape_html(&suffix)
            );
        }
        body.push_str("</nav>");
    }
    let meta = PageMetadata::for_page(
        &state.site.identity(),
        "News",
        Some(&format!("News and insights from {}.", state.site.name)),
        &news_listing_path(page, category.as_deref()),
    );
    page_response(state, headers, StatusCode::OK, layout(state, &meta, &body), true)
}

/// Canonical path of one listing page; a category filter is part of its identity.
fn news_listing_path(page: u32, category: Option<&str>) -> String {
    match (category, page) {
        (None, 1) => "/news".to_string(),
        (None, _) => format!("/news?page={page}"),
        (Some(c), 1) => format!("/news?category={}", query_escape(c)),
        (Some(c), _) => format!("/news?category={}&page={page}", query_escape(c)),
    }
}

/// Percent-encodes everything outside the unreserved set.
fn query_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

pub(crate) async fn article_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = article_page(&state, &headers, slug).await;
    finish(&state, "/news/:slug", &request_id, started, result).await
}

async fn article_page(state: &AppState, headers: &HeaderMap, slug: String) -> Result<Response, ApiError> {
    let lookup = slug.clone();
    let news = with_store(state, move |store| store.get_news_by_slug(&lookup))
        .await
        .map_err(|e| store_error(e, "news", &slug))?
        .filter(|n| n.published);
    let Some(news) = news else {
        return not_found_page(state, headers, &format!("/news/{slug}"));
    };
    let author = news
        .author
        .as_deref()
        .map(|a| format!(" &middot; {}", escape_html(a)))
        .unwrap_or_default();
    let hero = news
        .image_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .map(|u| {
            format!(
                "<img class=\"hero\" src=\"{}\" alt=\"\">",
                escape_html(&resolve_image_url(Some(u), PLACEHOLDER_IMAGE_URL))
            )
        })
        .unwrap_or_default();
    let body = format!(
        "<article class=\"article\"><h1>{title}</h1>\
         <p class=\"meta\"><time>{date}</time>{author} &middot; {minutes} min read</p>\
         {hero}<div class=\"content\">{content}</div>\
         <p><a href=\"/news\">Back to news</a></p></article>",
        title = escape_html(&news.title),
        date = escape_html(&format_date(&news.display_date())),
        minutes = reading_time_minutes(&news.content),
        content = news.content,
    );
    let meta = PageMetadata::for_article(&state.site.identity(), &news);
    page_response(state, headers, StatusCode::OK, layout(state, &meta, &body), true)
}

fn contact_form(values: &BTreeMap<String, String>, errors: Option<&ValidationErrors>) -> String {
    let value = |name: &str| escape_html(values.get(name).map_or("", String::as_str));
    let mut html = String::new();
    if let Some(errors) = errors {
        html.push_str("<ul class=\"errors\" role=\"alert\">");
        for e in errors.errors() {
            let _ = write!(
                html,
                "<li>{}: {}</li>",
                escape_html(&e.field),
                escape_html(&e.reason)
            );
        }
        html.push_str("</ul>");
    }
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/contact\">\
         <label>Name <input name=\"name\" required value=\"{name}\"></label>\
         <label>Email <input name=\"email\" type=\"email\" required value=\"{email}\"></label>\
         <label>Phone <input name=\"phone\" value=\"{phone}\"></label>\
         <label>Subject <input name=\"subject\" value=\"{subject}\"></label>\
         <label>Message <textarea name=\"message\" required>{message}</textarea></label>\
         <button type=\"submit\">Send</button></form>",
        name = value("name"),
        email = value("email"),
        phone = value("phone"),
        subject = value("subject"),
        message = value("message"),
    );
    html
}

fn contact_document(state: &AppState, inner: &str) -> String {
    let meta = PageMetadata::for_page(
        &state.site.identity(),
        "Contact",
        Some(&format!("Get in touch with {}.", state.site.name)),
        "/contact",
    );
    let body = format!("<h1>Contact us</h1>\n{inner}");
    layout(state, &meta, &body)
}

pub(crate) async fn contact_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let sent = params.get("sent").is_some_and(|v| v == "1");
    let inner = if sent {
        "<p class=\"notice\" role=\"status\">Thank you. Your message has been sent and we will be \
         in touch shortly.</p>"
            .to_string()
    } else {
        contact_form(&BTreeMap::new(), None)
    };
    let html = contact_document(&state, &inner);
    let result = page_response(&state, &headers, StatusCode::OK, html, !sent);
    finish(&state, "/contact", &request_id, started, result).await
}

fn form_submission(form: &BTreeMap<String, String>) -> ContactSubmission {
    let field = |name: &str| form.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
    ContactSubmission {
        name: field("name"),
        email: field("email"),
        phone: non_empty(form.get("phone").cloned()),
        subject: non_empty(form.get("subject").cloned()),
        message: field("message"),
    }
}

pub(crate) async fn contact_form_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = contact_form_post(&state, &headers, &form).await;
    finish(&state, "/contact", &request_id, started, result).await
}

/// Post/redirect/get on success; the form comes back with its values and
/// the field errors otherwise.
async fn contact_form_post(
    state: &AppState,
    headers: &HeaderMap,
    form: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let submission = form_submission(form);
    if let Err(errors) = submission.validate() {
        let html = contact_document(state, &contact_form(form, Some(&errors)));
        return page_response(state, headers, StatusCode::BAD_REQUEST, html, false);
    }
    submit_contact(state, submission).await?;
    let mut resp = StatusCode::SEE_OTHER.into_response();
    resp.headers_mut()
        .insert("location", HeaderValue::from_static("/contact?sent=1"));
    Ok(resp)
}

pub(crate) async fn not_found_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = not_found_page(&state, &headers, uri.path());
    finish(&state, "fallback", &request_id, started, result).await
}

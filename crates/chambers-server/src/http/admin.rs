//! Server-rendered admin panel: dashboard plus a token login form that
//! trades the admin token for the session cookie.

use crate::auth::session_clear_cookie;
use crate::http::handlers_utilities::{
    finish, html_response, propagated_request_id, request_is_admin, store_error, with_store,
};
use crate::http::pages::layout;
use crate::http::session::{open_session, with_cookie};
use crate::AppState;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chambers_api::{ApiError, PageMetadata};
use chambers_core::text::{escape_html, format_date_short, truncate_words};
use chambers_model::{ContactMessage, News};
use chambers_store::NewsQuery;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;
use tracing::{info, warn};

const RECENT_ROWS: u32 = 10;

fn admin_meta(state: &AppState, title: &str) -> PageMetadata {
    PageMetadata::for_page(&state.site.identity(), title, None, "/admin")
}

fn private_html(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    html: String,
) -> Result<Response, ApiError> {
    let mut resp = html_response(state, headers, status, html)?;
    resp.headers_mut()
        .insert("cache-control", HeaderValue::from_static("no-store"));
    resp.headers_mut()
        .insert("x-robots-tag", HeaderValue::from_static("noindex"));
    Ok(resp)
}

fn login_page(state: &AppState, headers: &HeaderMap, failed: bool) -> Result<Response, ApiError> {
    let notice = if failed {
        "<p class=\"errors\" role=\"alert\">That token was not accepted.</p>"
    } else {
        ""
    };
    let body = format!(
        "<h1>Administration</h1>{notice}\
         <form method=\"post\" action=\"/admin/login\">\
         <label>Admin token <input name=\"token\" type=\"password\" required \
         autocomplete=\"current-password\"></label>\
         <button type=\"submit\">Sign in</button></form>"
    );
    let html = layout(state, &admin_meta(state, "Sign in"), &body);
    private_html(state, headers, StatusCode::UNAUTHORIZED, html)
}

fn see_other(location: &'static str) -> Response {
    let mut resp = StatusCode::SEE_OTHER.into_response();
    resp.headers_mut()
        .insert("location", HeaderValue::from_static(location));
    resp
}

pub(crate) async fn dashboard_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let result = if request_is_admin(&state, &headers) {
        dashboard(&state, &headers).await
    } else {
        login_page(&state, &headers, false)
    };
    finish(&state, "/admin", &request_id, started, result).await
}

fn message_row(message: &ContactMessage) -> String {
    format!(
        "<tr><td>{date}</td><td>{name}</td><td><a href=\"mailto:{email}\">{email}</a></td>\
         <td>{subject}</td><td>{status}</td></tr>",
        date = format_date_short(&message.created_at),
        name = escape_html(&message.name),
        email = escape_html(&message.email),
        subject = escape_html(&truncate_words(
            message.subject.as_deref().unwrap_or(&message.message),
            80
        )),
        status = message.status.as_str(),
    )
}

fn news_row(news: &News) -> String {
    let state = if news.published { "published" } else { "draft" };
    format!(
        "<tr><td>{date}</td><td>{title}</td><td>{state}</td><td>{id}</td></tr>",
        date = format_date_short(&news.display_date()),
        title = escape_html(&news.title),
        id = news.id,
    )
}

async fn dashboard(state: &AppState, headers: &HeaderMap) -> Result<Response, ApiError> {
    let (stats, messages, news) = with_store(state, |store| {
        let stats = store.stats()?;
        let messages = store.list_contact_messages(None, RECENT_ROWS, 0)?;
        let news = store.list_news(&NewsQuery {
            published_only: false,
            category: None,
            limit: RECENT_ROWS,
            offset: 0,
        })?;
        Ok((stats, messages, news))
    })
    .await
    .map_err(|e| store_error(e, "dashboard", ""))?;

    let mut body = String::from("<h1>Dashboard</h1>\n<dl class=\"stats\">");
    for (label, value) in [
        ("Articles", stats.news_total),
        ("Published", stats.news_published),
        ("Active team members", stats.team_active),
        ("Messages", stats.contact_total),
        ("Unread messages", stats.contact_new),
        ("Newsletter subscribers", stats.subscribers_active),
        ("Stored images", stats.images),
    ] {
        let _ = write!(body, "<dt>{label}</dt><dd>{value}</dd>");
    }
    body.push_str("</dl>\n<h2>Recent messages</h2>");
    if messages.items.is_empty() {
        body.push_str("<p>No messages.</p>");
    } else {
        body.push_str(
            "<table><thead><tr><th>Date</th><th>Name</th><th>Email</th><th>Subject</th>\
             <th>Status</th></tr></thead><tbody>",
        );
        for message in &messages.items {
            body.push_str(&message_row(message));
        }
        body.push_str("</tbody></table>");
    }
    body.push_str("\n<h2>Recent articles</h2>");
    if news.items.is_empty() {
        body.push_str("<p>No articles.</p>");
    } else {
        body.push_str(
            "<table><thead><tr><th>Date</th><th>Title</th><th>State</th><th>Id</th></tr>\
             </thead><tbody>",
        );
        for item in &news.items {
            body.push_str(&news_row(item));
        }
        body.push_str("</tbody></table>");
    }
    body.push_str(
        "\n<form method=\"post\" action=\"/admin/logout\"><button type=\"submit\">Sign out\
         </button></form>",
    );
    let html = layout(state, &admin_meta(state, "Dashboard"), &body);
    private_html(state, headers, StatusCode::OK, html)
}

pub(crate) async fn login_form_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let token = form.get("token").map_or("", |t| t.trim());
    let result = match open_session(&state, token) {
        Some(cookie) => {
            info!(target: "chambers_audit", event = "admin_login", "admin session opened");
            Ok(with_cookie(see_other("/admin"), &cookie))
        }
        None => {
            warn!(target: "chambers_audit", event = "admin_login_failed", "admin login rejected");
            login_page(&state, &headers, true)
        }
    };
    finish(&state, "/admin/login", &request_id, started, result).await
}

pub(crate) async fn logout_form_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = with_cookie(see_other("/admin"), &session_clear_cookie());
    finish(&state, "/admin/logout", &request_id, started, Ok(resp)).await
}

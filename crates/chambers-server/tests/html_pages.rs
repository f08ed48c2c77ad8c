mod support;

use serde_json::json;
use support::{bearer, get, quiet_api, send_json, send_raw, spawn_server, ADMIN_TOKEN};

async fn publish(addr: std::net::SocketAddr, title: &str, content: &str) {
    let (auth_name, auth_value) = bearer();
    let resp = send_json(
        addr,
        "POST",
        "/api/news",
        &[(auth_name, auth_value.as_str())],
        &json!({
            "title": title,
            "content": content,
            "category": "Employment",
            "published": true,
        }),
    )
    .await;
    assert_eq!(resp.status, 201, "{}", resp.text());
}

#[tokio::test]
async fn home_page_renders_metadata_and_latest_news() {
    let server = spawn_server(quiet_api()).await;
    publish(server.addr, "New partner joins", "<p>Welcome aboard.</p>").await;

    let home = get(server.addr, "/", &[]).await;
    assert_eq!(home.status, 200);
    assert_eq!(
        home.header("content-type").as_deref(),
        Some("text/html; charset=utf-8")
    );
    let html = home.text();
    assert!(html.contains("<title>Mercer &amp; Vale</title>"));
    assert!(html.contains("<link rel=\"canonical\" href=\"https://mercervale.example/\">"));
    assert!(html.contains("href=\"/news/new-partner-joins\""));
    assert!(html.contains("og:type\" content=\"website\""));
}

#[tokio::test]
async fn article_page_uses_article_metadata_and_hides_drafts() {
    let server = spawn_server(quiet_api()).await;
    publish(
        server.addr,
        "Holiday pay ruling",
        "<p>The tribunal ruled on <em>holiday pay</em>.</p>",
    )
    .await;

    let article = get(server.addr, "/news/holiday-pay-ruling", &[]).await;
    assert_eq!(article.status, 200);
    let html = article.text();
    assert!(html.contains("<title>Holiday pay ruling | Mercer &amp; Vale</title>"));
    assert!(html.contains("og:type\" content=\"article\""));
    assert!(html.contains("<em>holiday pay</em>"));
    assert!(html.contains("1 min read"));

    let missing = get(server.addr, "/news/no-such-article", &[]).await;
    assert_eq!(missing.status, 404);
    assert!(missing.text().contains("Page not found"));
    assert_eq!(missing.header("cache-control").as_deref(), Some("no-store"));
}

#[tokio::test]
async fn news_page_paginates_and_rejects_bad_page_numbers() {
    let server = spawn_server(quiet_api()).await;
    for i in 0..12 {
        publish(server.addr, &format!("Briefing number {i}"), "<p>Body.</p>").await;
    }
    let first = get(server.addr, "/news", &[]).await;
    assert_eq!(first.status, 200);
    let html = first.text();
    assert!(html.contains("Page 1 of 2"));
    assert!(html.contains("rel=\"next\" href=\"/news?page=2\""));
    assert!(html.contains("/news?category=Employment"));

    let second = get(server.addr, "/news?page=2", &[]).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.text().matches("class=\"news-card\"").count(), 2);
    assert!(second
        .text()
        .contains("<link rel=\"canonical\" href=\"https://mercervale.example/news?page=2\">"));

    let filtered = get(server.addr, "/news?category=Employment&page=2", &[]).await;
    assert_eq!(filtered.status, 200);
    assert!(filtered.text().contains(
        "<link rel=\"canonical\" href=\"https://mercervale.example/news?category=Employment&amp;page=2\">"
    ));
    let filtered_first = get(server.addr, "/news?category=Employment", &[]).await;
    assert!(filtered_first.text().contains(
        "<link rel=\"canonical\" href=\"https://mercervale.example/news?category=Employment\">"
    ));

    let bad = get(server.addr, "/news?page=zero", &[]).await;
    assert_eq!(bad.status, 400);
}

#[tokio::test]
async fn contact_form_redirects_on_success_and_re_renders_errors() {
    let server = spawn_server(quiet_api()).await;
    let good = b"name=Priya+Shah&email=priya%40example.com&phone=&message=I+need+advice+on+a+contract.";
    let sent = send_raw(
        server.addr,
        "POST",
        "/contact",
        &[],
        Some(("application/x-www-form-urlencoded", good)),
    )
    .await;
    assert_eq!(sent.status, 303);
    assert_eq!(sent.header("location").as_deref(), Some("/contact?sent=1"));

    let confirmation = get(server.addr, "/contact?sent=1", &[]).await;
    assert!(confirmation.text().contains("Your message has been sent"));

    let bad = b"name=%3Cb%3EEve&email=nope&message=short";
    let rejected = send_raw(
        server.addr,
        "POST",
        "/contact",
        &[],
        Some(("application/x-www-form-urlencoded", bad)),
    )
    .await;
    assert_eq!(rejected.status, 400);
    let html = rejected.text();
    assert!(html.contains("value=\"&lt;b&gt;Eve\""));
    assert!(html.contains("email: must be a valid email address"));

    let (auth_name, auth_value) = bearer();
    let stored = get(
        server.addr,
        "/api/contact",
        &[(auth_name, auth_value.as_str())],
    )
    .await;
    assert_eq!(stored.json()["total"], 1);
    assert_eq!(stored.json()["data"][0]["phone"], serde_json::Value::Null);
}

#[tokio::test]
async fn team_member_page_and_unknown_routes() {
    let server = spawn_server(quiet_api()).await;
    let (auth_name, auth_value) = bearer();
    let created = send_json(
        server.addr,
        "POST",
        "/api/team",
        &[(auth_name, auth_value.as_str())],
        &json!({"name": "Hugo Brandt", "role": "Counsel", "bio": "Shipping law.\n\nArbitration."}),
    )
    .await;
    assert_eq!(created.status, 201);

    let page = get(server.addr, "/team/hugo-brandt", &[]).await;
    assert_eq!(page.status, 200);
    let html = page.text();
    assert!(html.contains("<p>Shipping law.</p><p>Arbitration.</p>"));
    assert!(html.contains("og:type\" content=\"profile\""));
    assert!(html.contains("<span class=\"initials\">HB</span>"));

    let unknown = get(server.addr, "/does/not/exist", &[]).await;
    assert_eq!(unknown.status, 404);
    assert!(unknown.text().contains("<h1>Page not found</h1>"));
}

#[tokio::test]
async fn admin_dashboard_login_flow() {
    let server = spawn_server(quiet_api()).await;
    let anonymous = get(server.addr, "/admin", &[]).await;
    assert_eq!(anonymous.status, 401);
    assert!(anonymous.text().contains("action=\"/admin/login\""));
    assert_eq!(anonymous.header("cache-control").as_deref(), Some("no-store"));

    let wrong = send_raw(
        server.addr,
        "POST",
        "/admin/login",
        &[],
        Some(("application/x-www-form-urlencoded", b"token=guess")),
    )
    .await;
    assert_eq!(wrong.status, 401);
    assert!(wrong.text().contains("not accepted"));

    let form = format!("token={ADMIN_TOKEN}");
    let login = send_raw(
        server.addr,
        "POST",
        "/admin/login",
        &[],
        Some(("application/x-www-form-urlencoded", form.as_bytes())),
    )
    .await;
    assert_eq!(login.status, 303);
    assert_eq!(login.header("location").as_deref(), Some("/admin"));
    let cookie = login
        .header("set-cookie")
        .and_then(|c| c.split(';').next().map(str::to_string))
        .expect("session cookie");

    let dashboard = get(server.addr, "/admin", &[("Cookie", cookie.as_str())]).await;
    assert_eq!(dashboard.status, 200);
    let html = dashboard.text();
    assert!(html.contains("<h1>Dashboard</h1>"));
    assert!(html.contains("<dt>Unread messages</dt><dd>0</dd>"));

    let logout = send_raw(server.addr, "POST", "/admin/logout", &[], None).await;
    assert_eq!(logout.status, 303);
    assert!(logout
        .header("set-cookie")
        .is_some_and(|c| c.contains("Max-Age=0")));
}

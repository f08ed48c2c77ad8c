mod support;

use chambers_server::{ApiConfig, RateLimitConfig};
use std::time::Duration;
use support::{get, quiet_api, send_raw, spawn_server};

fn tight_api(max_requests: u32) -> ApiConfig {
    ApiConfig {
        rate_limit: RateLimitConfig {
            max_requests,
            window: Duration::from_secs(900),
            ..RateLimitConfig::default()
        },
        ..quiet_api()
    }
}

#[tokio::test]
async fn api_requests_beyond_the_window_cap_get_429() {
    let server = spawn_server(tight_api(3)).await;
    let client = [("X-Forwarded-For", "203.0.113.50")];

    for expected_remaining in ["2", "1", "0"] {
        let resp = get(server.addr, "/api/news", &client).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("x-ratelimit-limit").as_deref(), Some("3"));
        assert_eq!(
            resp.header("x-ratelimit-remaining").as_deref(),
            Some(expected_remaining)
        );
        let reset: u64 = resp
            .header("x-ratelimit-reset")
            .and_then(|v| v.parse().ok())
            .expect("reset seconds");
        assert!((1..=900).contains(&reset));
    }

    let limited = get(server.addr, "/api/news", &client).await;
    assert_eq!(limited.status, 429);
    assert_eq!(limited.json()["error"]["code"], "RateLimited");
    assert_eq!(limited.header("x-ratelimit-remaining").as_deref(), Some("0"));
    let retry_after: u64 = limited
        .header("retry-after")
        .and_then(|v| v.parse().ok())
        .expect("retry-after");
    assert!(retry_after >= 1);

    let other_client = get(server.addr, "/api/news", &[("X-Forwarded-For", "198.51.100.2")]).await;
    assert_eq!(other_client.status, 200);
}

#[tokio::test]
async fn pages_and_health_checks_are_not_limited() {
    let server = spawn_server(tight_api(1)).await;
    let client = [("X-Real-IP", "192.0.2.10")];
    assert_eq!(get(server.addr, "/api/team", &client).await.status, 200);
    assert_eq!(get(server.addr, "/api/team", &client).await.status, 429);

    for _ in 0..3 {
        assert_eq!(get(server.addr, "/healthz", &client).await.status, 200);
        let page = get(server.addr, "/contact", &client).await;
        assert_eq!(page.status, 200);
        assert!(page.header("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn contact_form_posts_share_the_limit() {
    let server = spawn_server(tight_api(1)).await;
    let client = [("X-Forwarded-For", "203.0.113.77")];
    let form = b"name=Sam&email=sam%40example.com&message=Please+call+me+back";
    let first = send_raw(
        server.addr,
        "POST",
        "/contact",
        &client,
        Some(("application/x-www-form-urlencoded", form)),
    )
    .await;
    assert_eq!(first.status, 303);
    let second = send_raw(
        server.addr,
        "POST",
        "/contact",
        &client,
        Some(("application/x-www-form-urlencoded", form)),
    )
    .await;
    assert_eq!(second.status, 429);
}

#[tokio::test]
async fn admin_login_attempts_are_limited_per_client() {
    let server = spawn_server(tight_api(3)).await;
    let client = [("X-Forwarded-For", "203.0.113.90")];
    let form = b"token=not-the-admin-token";
    for _ in 0..3 {
        let rejected = send_raw(
            server.addr,
            "POST",
            "/admin/login",
            &client,
            Some(("application/x-www-form-urlencoded", form)),
        )
        .await;
        assert_eq!(rejected.status, 401);
        assert!(rejected.header("x-ratelimit-limit").is_some());
    }
    let limited = send_raw(
        server.addr,
        "POST",
        "/admin/login",
        &client,
        Some(("application/x-www-form-urlencoded", form)),
    )
    .await;
    assert_eq!(limited.status, 429);
    assert!(limited.header("retry-after").is_some());

    let sign_in_page = get(server.addr, "/admin", &client).await;
    assert_eq!(sign_in_page.status, 401);
    assert!(sign_in_page.header("x-ratelimit-limit").is_none());
}

#[tokio::test]
async fn disabled_limiter_admits_everything() {
    let api = ApiConfig {
        enable_rate_limit: false,
        ..tight_api(1)
    };
    let server = spawn_server(api).await;
    for _ in 0..5 {
        let resp = get(server.addr, "/api/news", &[]).await;
        assert_eq!(resp.status, 200);
        assert!(resp.header("x-ratelimit-limit").is_none());
    }
}

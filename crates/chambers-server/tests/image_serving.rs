mod support;

use chambers_core::sha256_hex;
use rusqlite::{params, Connection};
use support::{bearer, get, quiet_api, send_raw, spawn_server, PNG_BYTES};

#[tokio::test]
async fn stored_image_is_served_with_immutable_cache_headers() {
    let server = spawn_server(quiet_api()).await;
    let (auth_name, auth_value) = bearer();
    let admin = [(auth_name, auth_value.as_str())];

    let uploaded = send_raw(
        server.addr,
        "POST",
        "/api/images?storage=db",
        &admin,
        Some(("image/png", PNG_BYTES)),
    )
    .await;
    assert_eq!(uploaded.status, 201, "{}", uploaded.text());
    let data = uploaded.json()["data"].clone();
    let id = data["id"].as_str().expect("id").to_string();
    assert_eq!(id.len(), 32);
    assert_eq!(data["storage"], "database");
    assert_eq!(
        uploaded.header("location"),
        Some(format!("/api/images/{id}"))
    );

    let served = get(server.addr, &format!("/api/images/{id}"), &[]).await;
    assert_eq!(served.status, 200);
    assert_eq!(served.body, PNG_BYTES);
    assert_eq!(served.header("content-type").as_deref(), Some("image/png"));
    assert_eq!(
        served.header("content-length"),
        Some(PNG_BYTES.len().to_string())
    );
    assert_eq!(
        served.header("cache-control").as_deref(),
        Some("public, max-age=31536000, immutable")
    );
    assert_eq!(served.header("x-content-type-options").as_deref(), Some("nosniff"));
    let etag = served.header("etag").expect("etag");
    assert_eq!(etag, format!("\"{}\"", sha256_hex(PNG_BYTES)));

    let cached = get(
        server.addr,
        &format!("/api/images/{id}"),
        &[("If-None-Match", etag.as_str())],
    )
    .await;
    assert_eq!(cached.status, 304);
    assert!(cached.body.is_empty());
    assert_eq!(cached.header("etag"), Some(etag));
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_rejected() {
    let server = spawn_server(quiet_api()).await;
    let malformed = get(server.addr, "/api/images/not-an-id", &[]).await;
    assert_eq!(malformed.status, 400);
    assert_eq!(malformed.json()["error"]["code"], "InvalidQueryParameter");

    let uppercase = get(server.addr, "/api/images/0123456789ABCDEF0123456789ABCDEF", &[]).await;
    assert_eq!(uppercase.status, 400);

    let missing = get(server.addr, "/api/images/0123456789abcdef0123456789abcdef", &[]).await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn stored_row_with_disallowed_mime_is_refused() {
    let server = spawn_server(quiet_api()).await;
    let id = "fedcba9876543210fedcba9876543210";
    let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
    {
        let conn = Connection::open(&server.db_path).expect("open db");
        conn.execute(
            "INSERT INTO images (id, mime_type, size_bytes, sha256, bytes, created_at) \
             VALUES (?1, 'image/svg+xml', ?2, ?3, ?4, '2026-01-05T10:00:00.000000Z')",
            params![id, svg.len() as i64, sha256_hex(svg), &svg[..]],
        )
        .expect("insert row");
    }
    let resp = get(server.addr, &format!("/api/images/{id}"), &[]).await;
    assert_eq!(resp.status, 415);
    assert_eq!(resp.json()["error"]["code"], "UnsupportedMediaType");
}

#[tokio::test]
async fn uploads_are_validated_before_storage() {
    let mut api = quiet_api();
    api.max_upload_bytes = 64;
    let server = spawn_server(api).await;
    let (auth_name, auth_value) = bearer();
    let admin = [(auth_name, auth_value.as_str())];

    let anonymous = send_raw(
        server.addr,
        "POST",
        "/api/images",
        &[],
        Some(("image/png", PNG_BYTES)),
    )
    .await;
    assert_eq!(anonymous.status, 401);

    let svg = send_raw(
        server.addr,
        "POST",
        "/api/images",
        &admin,
        Some(("image/svg+xml", b"<svg/>")),
    )
    .await;
    assert_eq!(svg.status, 415);

    let mismatched = send_raw(
        server.addr,
        "POST",
        "/api/images",
        &admin,
        Some(("image/jpeg", PNG_BYTES)),
    )
    .await;
    assert_eq!(mismatched.status, 415);

    let empty = send_raw(server.addr, "POST", "/api/images", &admin, Some(("image/png", b""))).await;
    assert_eq!(empty.status, 400);

    let mut oversized = PNG_BYTES.to_vec();
    oversized.resize(65, 0);
    let too_big = send_raw(
        server.addr,
        "POST",
        "/api/images",
        &admin,
        Some(("image/png", &oversized)),
    )
    .await;
    assert_eq!(too_big.status, 413);

    let bad_target = send_raw(
        server.addr,
        "POST",
        "/api/images?storage=s3",
        &admin,
        Some(("image/png", PNG_BYTES)),
    )
    .await;
    assert_eq!(bad_target.status, 400);
}

#[tokio::test]
async fn disk_uploads_are_served_and_deleted() {
    let server = spawn_server(quiet_api()).await;
    let (auth_name, auth_value) = bearer();
    let admin = [(auth_name, auth_value.as_str())];

    let uploaded = send_raw(
        server.addr,
        "POST",
        "/api/images?storage=disk",
        &admin,
        Some(("image/png", PNG_BYTES)),
    )
    .await;
    assert_eq!(uploaded.status, 201, "{}", uploaded.text());
    let data = uploaded.json()["data"].clone();
    let name = data["id"].as_str().expect("name").to_string();
    assert!(name.ends_with(".png"));
    assert!(server.upload_dir.join(&name).exists());

    let served = get(server.addr, &format!("/uploads/{name}"), &[]).await;
    assert_eq!(served.status, 200);
    assert_eq!(served.body, PNG_BYTES);
    assert_eq!(served.header("content-type").as_deref(), Some("image/png"));

    let traversal = get(server.addr, "/uploads/..%2Fsite.sqlite", &[]).await;
    assert_eq!(traversal.status, 400);

    let listing = get(server.addr, "/api/images", &admin).await;
    assert_eq!(listing.json()["data"]["disk"][0]["id"], name.as_str());

    let deleted = send_raw(
        server.addr,
        "DELETE",
        &format!("/api/images/{name}"),
        &admin,
        None,
    )
    .await;
    assert_eq!(deleted.status, 204);
    assert!(!server.upload_dir.join(&name).exists());
    let gone = get(server.addr, &format!("/uploads/{name}"), &[]).await;
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn fallback_assets_referenced_by_pages_are_served() {
    let server = spawn_server(quiet_api()).await;

    let home = get(server.addr, "/", &[]).await;
    assert_eq!(home.status, 200);
    assert!(home.text().contains("/static/og-default.png"));

    let placeholder = get(server.addr, "/static/placeholder.svg", &[]).await;
    assert_eq!(placeholder.status, 200);
    assert_eq!(
        placeholder.header("content-type").as_deref(),
        Some("image/svg+xml")
    );
    assert!(placeholder.text().starts_with("<svg"));
    assert!(placeholder
        .header("cache-control")
        .is_some_and(|v| v.starts_with("public, max-age=")));

    let og = get(server.addr, "/static/og-default.png", &[]).await;
    assert_eq!(og.status, 200);
    assert_eq!(og.header("content-type").as_deref(), Some("image/png"));
    assert_eq!(&og.body[..8], b"\x89PNG\r\n\x1a\n");

    let etag = og.header("etag").expect("etag");
    let revalidated = get(
        server.addr,
        "/static/og-default.png",
        &[("If-None-Match", etag.as_str())],
    )
    .await;
    assert_eq!(revalidated.status, 304);

    let missing = get(server.addr, "/static/site.css", &[]).await;
    assert_eq!(missing.status, 404);
}

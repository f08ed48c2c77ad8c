#![allow(dead_code)]

use chambers_server::{build_router, ApiConfig, AppState, AuthConfig, SiteConfig};
use chambers_store::{Store, UploadDir};
use std::net::SocketAddr;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const ADMIN_TOKEN: &str = "integration-admin-token-0001";
pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
];

pub struct TestServer {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

pub struct RawResponse {
    pub status: u16,
    pub head: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<String> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.head.lines().find_map(|line| {
            if line.to_ascii_lowercase().starts_with(&prefix) {
                Some(line[prefix.len()..].trim().to_string())
            } else {
                None
            }
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

pub async fn spawn_server(api: ApiConfig) -> TestServer {
    spawn_server_with(api, AuthConfig::with_token(ADMIN_TOKEN)).await
}

pub async fn spawn_server_with(api: ApiConfig, auth: AuthConfig) -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("site.sqlite");
    let upload_dir = dir.path().join("uploads");
    let store = Store::open(&db_path).expect("open store");
    let uploads = UploadDir::open(&upload_dir).expect("open uploads");
    let site = SiteConfig {
        name: "Mercer & Vale".to_string(),
        base_url: "https://mercervale.example".to_string(),
        ..SiteConfig::default()
    };
    let state = AppState::with_config(store, uploads, api, site, auth);
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve app")
    });
    TestServer {
        addr,
        db_path,
        upload_dir,
        _dir: dir,
    }
}

pub fn quiet_api() -> ApiConfig {
    ApiConfig {
        enable_response_compression: false,
        ..ApiConfig::default()
    }
}

pub fn bearer() -> (&'static str, String) {
    ("Authorization", format!("Bearer {ADMIN_TOKEN}"))
}

pub async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<(&str, &[u8])>,
) -> RawResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some((content_type, payload)) = body {
        req.push_str(&format!("Content-Type: {content_type}\r\n"));
        req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    } else if method != "GET" && method != "HEAD" {
        req.push_str("Content-Length: 0\r\n");
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    let mut bytes = req.into_bytes();
    if let Some((_, payload)) = body {
        bytes.extend_from_slice(payload);
    }
    stream.write_all(&bytes).await.expect("write request");
    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read response");
    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("http response must have separator");
    let head = String::from_utf8(response[..split].to_vec()).expect("utf8 head");
    let body = response[split + 4..].to_vec();
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    RawResponse { status, head, body }
}

pub async fn get(addr: SocketAddr, path: &str, headers: &[(&str, &str)]) -> RawResponse {
    send_raw(addr, "GET", path, headers, None).await
}

pub async fn send_json(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
) -> RawResponse {
    let payload = serde_json::to_vec(body).expect("encode json");
    send_raw(
        addr,
        method,
        path,
        headers,
        Some(("application/json", &payload)),
    )
    .await
}

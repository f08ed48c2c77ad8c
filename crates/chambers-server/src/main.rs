#![forbid(unsafe_code)]

use chambers_core::{ENV_CHAMBERS_DB_PATH, ENV_CHAMBERS_LOG_LEVEL};
use chambers_server::{
    build_router, validate_startup_config, ApiConfig, AppState, AuthConfig, RateLimitConfig,
    SiteConfig, StorageConfig,
};
use chambers_store::{Store, UploadDir};
use opentelemetry::trace::TracerProvider as _;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("signal handlers unavailable; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() -> Result<(), String> {
    let filter = EnvFilter::try_from_env(ENV_CHAMBERS_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = env_bool("CHAMBERS_LOG_JSON", true);
    if env_bool("CHAMBERS_OTEL_ENABLED", false) {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .build()
            .map_err(|e| format!("otlp exporter: {e}"))?;
        let tracer = opentelemetry_sdk::trace::TracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .build()
            .tracer("chambers-server");
        if log_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        }
    } else if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing()?;
    let bind_addr = env::var("CHAMBERS_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let storage_defaults = StorageConfig::default();
    let storage = StorageConfig {
        db_path: env_string(ENV_CHAMBERS_DB_PATH)
            .map_or(storage_defaults.db_path, PathBuf::from),
        upload_dir: env_string("CHAMBERS_UPLOAD_DIR")
            .map_or(storage_defaults.upload_dir, PathBuf::from),
    };

    let api_defaults = ApiConfig::default();
    let rate_defaults = RateLimitConfig::default();
    let api_cfg = ApiConfig {
        max_body_bytes: env_usize("CHAMBERS_MAX_BODY_BYTES", api_defaults.max_body_bytes),
        max_upload_bytes: env_usize("CHAMBERS_MAX_UPLOAD_BYTES", api_defaults.max_upload_bytes),
        rate_limit: RateLimitConfig {
            max_requests: u32::try_from(env_u64(
                "CHAMBERS_RATE_LIMIT_MAX",
                u64::from(rate_defaults.max_requests),
            ))
            .unwrap_or(u32::MAX),
            window: env_duration_ms(
                "CHAMBERS_RATE_LIMIT_WINDOW_MS",
                u64::try_from(rate_defaults.window.as_millis()).unwrap_or(u64::MAX),
            ),
            max_tracked_keys: env_usize(
                "CHAMBERS_RATE_LIMIT_MAX_KEYS",
                rate_defaults.max_tracked_keys,
            ),
            ..rate_defaults
        },
        enable_rate_limit: env_bool("CHAMBERS_ENABLE_RATE_LIMIT", api_defaults.enable_rate_limit),
        cors_allowed_origins: env_list("CHAMBERS_CORS_ORIGINS"),
        enable_audit_log: env_bool("CHAMBERS_ENABLE_AUDIT_LOG", false),
        enable_response_compression: env_bool("CHAMBERS_ENABLE_RESPONSE_COMPRESSION", true),
        compression_min_bytes: env_usize(
            "CHAMBERS_COMPRESSION_MIN_BYTES",
            api_defaults.compression_min_bytes,
        ),
        shutdown_drain: env_duration_ms("CHAMBERS_SHUTDOWN_DRAIN_MS", 5000),
        ..api_defaults
    };

    let site_defaults = SiteConfig::default();
    let site_cfg = SiteConfig {
        name: env_string("CHAMBERS_SITE_NAME").unwrap_or(site_defaults.name),
        base_url: env_string("CHAMBERS_SITE_URL").unwrap_or(site_defaults.base_url),
        description: env_string("CHAMBERS_SITE_DESCRIPTION").unwrap_or(site_defaults.description),
        contact_email: env_string("CHAMBERS_CONTACT_EMAIL").unwrap_or(site_defaults.contact_email),
        contact_phone: env_string("CHAMBERS_CONTACT_PHONE").unwrap_or(site_defaults.contact_phone),
        address: env_string("CHAMBERS_ADDRESS").unwrap_or(site_defaults.address),
    };

    let auth_defaults = AuthConfig::default();
    let auth_cfg = AuthConfig {
        admin_token: env_string("CHAMBERS_ADMIN_TOKEN"),
        session_secret: env_string("CHAMBERS_SESSION_SECRET"),
        session_ttl: Duration::from_secs(env_u64(
            "CHAMBERS_SESSION_TTL_SECS",
            auth_defaults.session_ttl.as_secs(),
        )),
    };

    validate_startup_config(&api_cfg, &site_cfg, &auth_cfg)?;
    if auth_cfg.admin_token.is_none() {
        warn!("CHAMBERS_ADMIN_TOKEN is not set; admin routes will answer 401");
    }

    let store = Store::open(&storage.db_path)
        .map_err(|e| format!("open database {}: {e}", storage.db_path.display()))?;
    let uploads = UploadDir::open(&storage.upload_dir)
        .map_err(|e| format!("open upload dir {}: {e}", storage.upload_dir.display()))?;
    info!(
        db = %storage.db_path.display(),
        uploads = %storage.upload_dir.display(),
        "storage opened"
    );

    let drain = api_cfg.shutdown_drain;
    let state = AppState::with_config(store, uploads, api_cfg, site_cfg, auth_cfg);
    let sweeper = state.spawn_background_tasks();
    let app = build_router(state.clone());

    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind failed: {e}"))?;
    info!("chambers-server listening on {bind_addr}");

    let state_for_shutdown = state.clone();
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        wait_for_shutdown_signal().await;
        state_for_shutdown.begin_shutdown();
        tokio::time::sleep(drain).await;
    })
    .await
    .map_err(|e| format!("server failed: {e}"));
    sweeper.abort();
    served
}

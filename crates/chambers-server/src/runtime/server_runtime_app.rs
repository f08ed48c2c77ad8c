use crate::http::{admin, contact, images, news, newsletter, ops, pages, session, team};
use crate::middleware::request_tracing::request_tracing_middleware;
use crate::runtime::server_runtime_core::{
    cors_middleware, rate_limit_middleware, security_middleware,
};
use crate::telemetry::metrics_endpoint::metrics_handler;
use crate::{ApiConfig, AppState, AuthConfig, RateLimiter, RequestMetrics, SiteConfig};
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use chambers_store::{Store, UploadDir};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info};

impl AppState {
    #[must_use]
    pub fn new(store: Store, uploads: UploadDir) -> Self {
        Self::with_config(
            store,
            uploads,
            ApiConfig::default(),
            SiteConfig::default(),
            AuthConfig::default(),
        )
    }

    #[must_use]
    pub fn with_config(
        store: Store,
        uploads: UploadDir,
        api: ApiConfig,
        site: SiteConfig,
        auth: AuthConfig,
    ) -> Self {
        Self {
            store,
            uploads,
            ready: Arc::new(AtomicBool::new(true)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
            limiter: Arc::new(RateLimiter::new()),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            api,
            site,
            auth,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Periodically drops expired rate-limit windows.
    pub fn spawn_background_tasks(&self) -> JoinHandle<()> {
        let limiter = Arc::clone(&self.limiter);
        let cfg = self.api.rate_limit.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cfg.sweep_interval);
            loop {
                interval.tick().await;
                let removed = limiter.purge_expired(cfg.window, Instant::now()).await;
                if removed > 0 {
                    debug!(removed, "rate limit windows purged");
                }
            }
        })
    }

    /// Stops reporting ready so load balancers drain traffic.
    pub fn begin_shutdown(&self) {
        self.accepting_requests.store(false, Ordering::Relaxed);
        self.ready.store(false, Ordering::Relaxed);
        info!("shutdown requested; readiness withdrawn");
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home_handler))
        .route("/team", get(pages::team_page_handler))
        .route("/team/:slug", get(pages::member_page_handler))
        .route("/news", get(pages::news_page_handler))
        .route("/news/:slug", get(pages::article_page_handler))
        .route(
            "/contact",
            get(pages::contact_page_handler).post(pages::contact_form_handler),
        )
        .route("/admin", get(admin::dashboard_handler))
        .route("/admin/login", post(admin::login_form_handler))
        .route("/admin/logout", post(admin::logout_form_handler))
        .route("/healthz", get(ops::healthz_handler))
        .route("/readyz", get(ops::readyz_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/openapi.json", get(ops::openapi_handler))
        .route("/api/version", get(ops::version_handler))
        .route(
            "/api/news",
            get(news::list_news_handler).post(news::create_news_handler),
        )
        .route(
            "/api/news/:id",
            get(news::get_news_handler)
                .put(news::update_news_handler)
                .delete(news::delete_news_handler),
        )
        .route("/api/news/slug/:slug", get(news::news_by_slug_handler))
        .route(
            "/api/team",
            get(team::list_team_handler).post(team::create_team_handler),
        )
        .route(
            "/api/team/:id",
            get(team::get_team_handler)
                .put(team::update_team_handler)
                .delete(team::delete_team_handler),
        )
        .route(
            "/api/contact",
            get(contact::list_contact_handler).post(contact::create_contact_handler),
        )
        .route(
            "/api/contact/:id",
            get(contact::get_contact_handler)
                .put(contact::update_contact_handler)
                .delete(contact::delete_contact_handler),
        )
        .route(
            "/api/newsletter",
            get(newsletter::list_subscriptions_handler)
                .post(newsletter::subscribe_handler)
                .delete(newsletter::unsubscribe_handler),
        )
        .route(
            "/api/newsletter/:id",
            delete(newsletter::delete_subscription_handler),
        )
        .route(
            "/api/images",
            get(images::list_images_handler).post(images::upload_image_handler),
        )
        .route(
            "/api/images/:id",
            get(images::serve_image_handler).delete(images::delete_image_handler),
        )
        .route("/uploads/:name", get(images::serve_upload_handler))
        .route("/static/:name", get(images::serve_static_handler))
        .route(
            "/api/admin/session",
            post(session::create_session_handler).delete(session::delete_session_handler),
        )
        .fallback(pages::not_found_handler)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), cors_middleware))
        .layer(from_fn_with_state(state.clone(), security_middleware))
        .layer(from_fn_with_state(state.clone(), request_tracing_middleware))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}

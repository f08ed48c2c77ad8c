#![forbid(unsafe_code)]

use axum::http::StatusCode;
use chambers_store::{Store, UploadDir};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub mod auth;
pub mod config;
mod http;
mod middleware;
pub mod rate_limiter;
mod runtime;
mod telemetry;

pub use config::{
    validate_startup_config, ApiConfig, AuthConfig, RateLimitConfig, SiteConfig, StorageConfig,
    CONFIG_SCHEMA_VERSION,
};
pub use rate_limiter::{RateDecision, RateLimiter};
pub use runtime::server_runtime_app::build_router;

pub const CRATE_NAME: &str = "chambers-server";

/// Upper bounds of the request latency histogram, in seconds.
pub(crate) const LATENCY_BUCKETS_SECS: [f64; 10] =
    [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
const LATENCY_SAMPLE_CAP: usize = 2048;

#[derive(Debug, Clone, Default)]
pub(crate) struct RouteLatency {
    pub(crate) buckets: [u64; LATENCY_BUCKETS_SECS.len()],
    pub(crate) count: u64,
    pub(crate) sum_ns: u128,
    pub(crate) recent_ns: VecDeque<u64>,
}

#[derive(Default)]
pub(crate) struct RequestMetrics {
    pub(crate) counts: Mutex<HashMap<(String, u16), u64>>,
    pub(crate) latency: Mutex<HashMap<String, RouteLatency>>,
    pub(crate) rate_limited_total: AtomicU64,
    pub(crate) image_bytes_served: AtomicU64,
    pub(crate) images_served: AtomicU64,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);

        let ns = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        let secs = latency.as_secs_f64();
        let mut map = self.latency.lock().await;
        let entry = map.entry(route.to_string()).or_default();
        for (slot, bound) in entry.buckets.iter_mut().zip(LATENCY_BUCKETS_SECS) {
            if secs <= bound {
                *slot += 1;
            }
        }
        entry.count += 1;
        entry.sum_ns += u128::from(ns);
        entry.recent_ns.push_back(ns);
        while entry.recent_ns.len() > LATENCY_SAMPLE_CAP {
            entry.recent_ns.pop_front();
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub(crate) store: Store,
    pub(crate) uploads: UploadDir,
    pub(crate) api: ApiConfig,
    pub(crate) site: SiteConfig,
    pub(crate) auth: AuthConfig,
    pub ready: Arc<AtomicBool>,
    pub accepting_requests: Arc<AtomicBool>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

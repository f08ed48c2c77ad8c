use crate::http::handlers_utilities::{finish, propagated_request_id};
use crate::{AppState, LATENCY_BUCKETS_SECS};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::fmt::Write as _;
use std::sync::atomic::Ordering;
use std::time::Instant;

const METRIC_SUBSYSTEM: &str = "chambers";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx.min(v.len() - 1)]
}

fn secs(ns: u128) -> f64 {
    ns as f64 / 1_000_000_000.0
}

pub(crate) async fn metrics_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let labels = format!("subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\"");
    let mut body = String::new();

    let mut counts: Vec<_> = state
        .metrics
        .counts
        .lock()
        .await
        .iter()
        .map(|((route, status), n)| (route.clone(), *status, *n))
        .collect();
    counts.sort();
    body.push_str("# TYPE chambers_http_requests_total counter\n");
    for (route, status, n) in counts {
        let _ = writeln!(
            body,
            "chambers_http_requests_total{{{labels},route=\"{route}\",status=\"{status}\"}} {n}"
        );
    }

    let mut latency: Vec<_> = state
        .metrics
        .latency
        .lock()
        .await
        .iter()
        .map(|(route, lat)| (route.clone(), lat.clone()))
        .collect();
    latency.sort_by(|a, b| a.0.cmp(&b.0));
    body.push_str("# TYPE chambers_http_request_duration_seconds histogram\n");
    for (route, lat) in &latency {
        for (bound, n) in LATENCY_BUCKETS_SECS.iter().zip(lat.buckets) {
            let _ = writeln!(
                body,
                "chambers_http_request_duration_seconds_bucket{{{labels},route=\"{route}\",le=\"{bound}\"}} {n}"
            );
        }
        let _ = writeln!(
            body,
            "chambers_http_request_duration_seconds_bucket{{{labels},route=\"{route}\",le=\"+Inf\"}} {}\n\
             chambers_http_request_duration_seconds_sum{{{labels},route=\"{route}\"}} {:.6}\n\
             chambers_http_request_duration_seconds_count{{{labels},route=\"{route}\"}} {}",
            lat.count,
            secs(lat.sum_ns),
            lat.count,
        );
    }
    for (route, lat) in &latency {
        let samples: Vec<u64> = lat.recent_ns.iter().copied().collect();
        let _ = writeln!(
            body,
            "chambers_http_request_latency_p50_seconds{{{labels},route=\"{route}\"}} {:.6}\n\
             chambers_http_request_latency_p95_seconds{{{labels},route=\"{route}\"}} {:.6}",
            secs(u128::from(percentile_ns(&samples, 0.50))),
            secs(u128::from(percentile_ns(&samples, 0.95))),
        );
    }

    let tracked = state.limiter.tracked_keys().await;
    let _ = write!(
        body,
        "# TYPE chambers_rate_limited_total counter\n\
         chambers_rate_limited_total{{{labels}}} {}\n\
         # TYPE chambers_rate_limit_tracked_clients gauge\n\
         chambers_rate_limit_tracked_clients{{{labels}}} {tracked}\n\
         # TYPE chambers_image_bytes_served_total counter\n\
         chambers_image_bytes_served_total{{{labels}}} {}\n\
         # TYPE chambers_images_served_total counter\n\
         chambers_images_served_total{{{labels}}} {}\n",
        state.metrics.rate_limited_total.load(Ordering::Relaxed),
        state.metrics.image_bytes_served.load(Ordering::Relaxed),
        state.metrics.images_served.load(Ordering::Relaxed),
    );

    let mut resp = (StatusCode::OK, body).into_response();
    resp.headers_mut().insert(
        "content-type",
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    finish(&state, "/metrics", &request_id, started, Ok(resp)).await
}

#[cfg(test)]
mod tests {
    use super::percentile_ns;

    #[test]
    fn percentile_picks_nearest_rank() {
        assert_eq!(percentile_ns(&[], 0.95), 0);
        let values: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile_ns(&values, 0.50), 51);
        assert_eq!(percentile_ns(&values, 0.95), 95);
        assert_eq!(percentile_ns(&[7], 0.95), 7);
    }
}

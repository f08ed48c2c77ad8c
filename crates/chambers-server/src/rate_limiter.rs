use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of one admission check, with what the client needs for the
/// `x-ratelimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl RateDecision {
    /// Whole seconds until the window resets, never zero.
    #[must_use]
    pub fn reset_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

/// In-memory fixed-window counter keyed by client identifier.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn check(&self, key: &str, cfg: &RateLimitConfig) -> RateDecision {
        self.check_at(key, cfg, Instant::now()).await
    }

    pub async fn check_at(&self, key: &str, cfg: &RateLimitConfig, now: Instant) -> RateDecision {
        let mut lock = self.windows.lock().await;
        if lock.len() >= cfg.max_tracked_keys && !lock.contains_key(key) {
            purge(&mut lock, cfg.window, now);
            evict_oldest(&mut lock, cfg.max_tracked_keys.max(1) - 1);
        }
        let window = lock.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= cfg.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }
        let reset_after = cfg
            .window
            .saturating_sub(now.duration_since(window.started));
        if window.count >= cfg.max_requests {
            return RateDecision {
                allowed: false,
                limit: cfg.max_requests,
                remaining: 0,
                reset_after,
            };
        }
        window.count += 1;
        RateDecision {
            allowed: true,
            limit: cfg.max_requests,
            remaining: cfg.max_requests - window.count,
            reset_after,
        }
    }

    /// Drops every window that has fully elapsed; returns how many were removed.
    pub async fn purge_expired(&self, window: Duration, now: Instant) -> usize {
        let mut lock = self.windows.lock().await;
        purge(&mut lock, window, now)
    }

    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

fn purge(windows: &mut HashMap<String, Window>, window: Duration, now: Instant) -> usize {
    let before = windows.len();
    windows.retain(|_, w| now.duration_since(w.started) < window);
    before - windows.len()
}

/// Removes the longest-running windows until at most `keep` remain.
fn evict_oldest(windows: &mut HashMap<String, Window>, keep: usize) {
    while windows.len() > keep {
        let Some(oldest) = windows
            .iter()
            .min_by_key(|(_, w)| w.started)
            .map(|(k, _)| k.clone())
        else {
            break;
        };
        windows.remove(&oldest);
    }
}

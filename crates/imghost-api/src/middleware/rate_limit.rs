//! Admission control: per-client fixed-window rate limiting.
//!
//! Each client key (the client IP) owns a counter and the instant its window
//! started. The first request of a key, or the first one at least one window after
//! the window started, resets the counter to 1. Otherwise the request is admitted
//! only while the counter is below the limit.
//!
//! Windows are fixed, not sliding: a client bursting right before and right after a
//! window boundary can be admitted up to twice the limit in a short span.

use crate::error::HttpAppError;
use crate::middleware::client_ip::{extract_client_ip, socket_addr, ClientIp};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use imghost_core::AppError;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

const DEFAULT_SHARDS: usize = 16;
/// Sweep runs every `SWEEP_PERIOD_WINDOWS` windows.
const SWEEP_PERIOD_WINDOWS: u32 = 5;
/// Entries whose window started more than this many windows ago are evicted.
const STALE_AFTER_WINDOWS: u32 = 2;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// Sharded fixed-window rate limiter.
///
/// Keys are hashed onto shards, each a separate map behind its own mutex, so
/// concurrent requests from different clients rarely contend.
pub struct RateLimiter {
    shards: Vec<Mutex<HashMap<String, Window>>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_shards(limit, window, DEFAULT_SHARDS)
    }

    pub fn with_shards(limit: u32, window: Duration, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect(),
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn shard(&self, key: &str) -> &Mutex<HashMap<String, Window>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Admit or reject one request from `key`.
    ///
    /// Returns the requests left in the current window, or the retry-after hint
    /// (always the full window length) when rejected.
    pub async fn admit(&self, key: &str) -> Result<u32, Duration> {
        let now = Instant::now();
        let mut windows = self.shard(key).lock().await;

        match windows.get_mut(key) {
            Some(window) if now.duration_since(window.started_at) < self.window => {
                if window.count >= self.limit {
                    return Err(self.window);
                }
                window.count += 1;
                Ok(self.limit - window.count)
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        started_at: now,
                    },
                );
                Ok(self.limit.saturating_sub(1))
            }
        }
    }

    /// Drop clients whose window went stale. Returns how many were evicted.
    pub async fn sweep_stale(&self) -> usize {
        let now = Instant::now();
        let stale_after = self.window * STALE_AFTER_WINDOWS;
        let mut evicted = 0;

        for shard in &self.shards {
            let mut windows = shard.lock().await;
            let before = windows.len();
            windows.retain(|_, window| now.duration_since(window.started_at) <= stale_after);
            evicted += before - windows.len();
        }

        if evicted > 0 {
            tracing::debug!(evicted, "Evicted stale rate limit windows");
        }
        evicted
    }

    pub async fn tracked_clients(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }

    /// Run [`RateLimiter::sweep_stale`] every five windows until `shutdown` flips.
    pub fn start_sweep(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let period = self.window * SWEEP_PERIOD_WINDOWS;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_stale().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::debug!("Rate limiter sweep stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}

fn insert_header(response: &mut Response, name: &'static str, value: u64) {
    if let Ok(header_value) = HeaderValue::from_str(&value.to_string()) {
        response.headers_mut().insert(name, header_value);
    }
}

/// HTTP admission middleware
///
/// Keys on the client IP, resolved against the configured trusted proxies and
/// stored as a [`ClientIp`] extension for the handlers. Admitted responses carry
/// `X-RateLimit-Limit` and `X-RateLimit-Remaining`; rejected ones are `429` with
/// `Retry-After`.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = socket_addr(request.extensions());
    let client = extract_client_ip(
        request.headers(),
        peer.as_ref(),
        state.config.trusted_proxies(),
    );
    let rate_limiter = &state.rate_limiter;
    let limit = u64::from(rate_limiter.limit());

    match rate_limiter.admit(&client).await {
        Ok(remaining) => {
            request
                .extensions_mut()
                .insert(ClientIp::from_resolved(client));
            let mut response = next.run(request).await;
            insert_header(&mut response, "X-RateLimit-Limit", limit);
            insert_header(&mut response, "X-RateLimit-Remaining", u64::from(remaining));
            response
        }
        Err(retry_after) => {
            tracing::warn!(
                client = %client,
                path = %request.uri().path(),
                limit,
                "Rate limit exceeded"
            );
            let mut response = HttpAppError(AppError::AdmissionRejected {
                retry_after_secs: retry_after.as_secs().max(1),
            })
            .into_response();
            insert_header(&mut response, "X-RateLimit-Limit", limit);
            insert_header(&mut response, "X-RateLimit-Remaining", 0);
            response
        }
    }
}

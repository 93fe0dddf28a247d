//! Fixed-window rate limiting middleware.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::observability::metrics;

pub const RATELIMIT: HeaderName = HeaderName::from_static("ratelimit");
pub const RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");

/// Counter for one client inside the current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

impl Decision {
    /// Seconds until reset, rounded up so clients never retry early.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs.saturating_add(1)
        } else {
            secs
        }
    }
}

/// Per-client fixed-window counters.
///
/// The map is sharded; a check holds the shard lock for its key while it
/// resets, increments and reads the counter.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    enabled: bool,
    max_requests: u32,
    window: Duration,
    trust_proxy: bool,
    policy_name: String,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            trust_proxy: config.trust_proxy,
            policy_name: format!(
                "{}-in-{}",
                config.max_requests,
                window_words(config.window_secs)
            ),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Record a request for `key` and decide whether it is admitted.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { count: 0, started: now });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.started) >= self.window {
            window.count = 0;
            window.started = now;
        }
        window.count = window.count.saturating_add(1);

        let elapsed = now.saturating_duration_since(window.started);
        Decision {
            allowed: window.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset_after: self.window.saturating_sub(elapsed),
        }
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Identify the client a request counts against.
    pub fn client_key(&self, request: &Request) -> String {
        if self.trust_proxy {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()));
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Write the draft-8 `RateLimit` and `RateLimit-Policy` headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap, decision: &Decision) {
        let policy = format!(
            "\"{}\"; q={}; w={}",
            self.policy_name,
            decision.limit,
            self.window.as_secs()
        );
        let state = format!(
            "\"{}\"; r={}; t={}",
            self.policy_name,
            decision.remaining,
            decision.reset_secs()
        );

        if let Ok(value) = HeaderValue::from_str(&policy) {
            headers.insert(RATELIMIT_POLICY, value);
        }
        if let Ok(value) = HeaderValue::from_str(&state) {
            headers.insert(RATELIMIT, value);
        }
        if !decision.allowed {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.reset_secs()));
        }
    }

    /// Periodically evict expired windows until shutdown is signalled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep_at(Instant::now());
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                tracked = self.tracked(),
                                "Expired rate limit windows evicted"
                            );
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Rate limit sweeper stopped");
        })
    }
}

fn window_words(secs: u64) -> String {
    match secs {
        s if s >= 3600 && s % 3600 == 0 => format!("{}h", s / 3600),
        s if s >= 60 && s % 60 == 0 => format!("{}min", s / 60),
        s => format!("{}s", s),
    }
}

/// Middleware function for per-client rate limiting.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.enabled() {
        return next.run(request).await;
    }

    let key = limiter.client_key(&request);
    let decision = limiter.check(&key);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %key,
            limit = decision.limit,
            reset_secs = decision.reset_secs(),
            "Rate limit exceeded"
        );
        let error = ApiError::RateLimitExceeded;
        metrics::record_rejection(&error);
        error.into_response()
    };

    limiter.apply_headers(response.headers_mut(), &decision);
    response
}

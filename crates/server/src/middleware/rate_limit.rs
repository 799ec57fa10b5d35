//! Fixed-window rate limiting keyed by client IP.
//!
//! Counters live in a process-scoped [`DashMap`]; an expired window is reset
//! when its key is next seen, and the map is swept once it grows past
//! [`SWEEP_THRESHOLD`]. Counts are per instance.
//!
//! Each request is charged against exactly one [`RateLimitPolicy`], chosen
//! from its method and path by [`RateLimitPolicy::for_request`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::error::AppError;

/// Entries kept before expired windows are swept.
const SWEEP_THRESHOLD: usize = 10_000;

const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);
const ONE_MINUTE: Duration = Duration::from_secs(60);

/// A request budget: at most `max` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub max: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const REGISTER: Self = Self::new("register", 5, FIFTEEN_MINUTES);
    pub const LOGIN: Self = Self::new("login", 10, FIFTEEN_MINUTES);
    pub const CHAT: Self = Self::new("chat", 30, ONE_MINUTE);
    pub const CART_WRITE: Self = Self::new("cart_write", 30, ONE_MINUTE);
    pub const SESSION_CREATE: Self = Self::new("session_create", 50, FIFTEEN_MINUTES);
    pub const API: Self = Self::new("api", 100, FIFTEEN_MINUTES);

    const fn new(name: &'static str, max: u32, window: Duration) -> Self {
        Self { name, max, window }
    }

    /// The budget a request is charged against. Accepts paths with or
    /// without the `/api` prefix.
    #[must_use]
    pub fn for_request(method: &Method, path: &str) -> Self {
        let path = path.strip_prefix("/api").unwrap_or(path);
        let path = path.trim_end_matches('/');

        match (method, path) {
            (&Method::POST, "/auth/register") => Self::REGISTER,
            (&Method::POST, "/auth/login") => Self::LOGIN,
            (&Method::POST, "/chat/send") => Self::CHAT,
            (&Method::POST, "/chat/sessions") => Self::SESSION_CREATE,
            (&Method::POST, "/cart" | "/cart/add") => Self::CART_WRITE,
            (&Method::PUT | &Method::DELETE, p) if is_cart_item_path(p) => Self::CART_WRITE,
            _ => Self::API,
        }
    }
}

/// `/cart/{itemId}`, excluding `/cart/count` and `/cart/add`.
fn is_cart_item_path(path: &str) -> bool {
    path.strip_prefix("/cart/")
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/') && rest != "count" && rest != "add")
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Shared fixed-window counters.
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<DashMap<(&'static str, String), Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request from `client`. Returns the seconds until the window
    /// resets when the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the `Retry-After` value when the request is over budget.
    pub fn check(&self, policy: RateLimitPolicy, client: &str) -> Result<(), u64> {
        self.check_at(policy, client, Instant::now())
    }

    fn check_at(&self, policy: RateLimitPolicy, client: &str, now: Instant) -> Result<(), u64> {
        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let mut entry = self
            .windows
            .entry((policy.name, client.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= policy.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= policy.max {
            let remaining = policy.window.saturating_sub(elapsed);
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(secs.max(1));
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop windows that can no longer limit anyone.
    fn sweep(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < FIFTEEN_MINUTES);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.windows.len()
    }
}

/// Best-effort client IP from proxy headers.
///
/// Checks Cloudflare's `CF-Connecting-IP`, the first hop of
/// `X-Forwarded-For`, `X-Real-IP` and Fly.io's `Fly-Client-IP`, in that
/// order.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .or_else(|| header("x-real-ip"))
        .or_else(|| header("fly-client-ip"))
        .unwrap_or("unknown")
        .to_string()
}

/// Reject requests over their budget with a 429 envelope.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let policy = RateLimitPolicy::for_request(request.method(), request.uri().path());
    let client = client_ip(request.headers());

    if let Err(retry_after_secs) = limiter.check(policy, &client) {
        tracing::warn!(
            client = %client,
            policy = policy.name,
            retry_after_secs,
            "Rate limit exceeded"
        );
        return AppError::RateLimited { retry_after_secs }.into_response();
    }

    next.run(request).await
}

//! Per-client fixed-window rate limiting
//!
//! Each route belongs to a scope with one or more limits. A request is
//! admitted only when every limit in its scope still has room; admitted
//! requests count against all of them.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::state::AppState;

/// At most `max_requests` per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }

    pub const fn per_hour(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60 * 60),
        }
    }

    pub const fn per_day(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

const CATEGORIZE_LIMITS: [RateLimit; 1] = [RateLimit::per_minute(10)];
const DEFAULT_LIMITS: [RateLimit; 2] = [RateLimit::per_day(200), RateLimit::per_hour(50)];

/// Expired windows are swept once the table grows past this
const SWEEP_THRESHOLD: usize = 10_000;

/// Limits that apply to `path`, with the scope they are counted under
pub fn policy_for(path: &str) -> (&'static str, &'static [RateLimit]) {
    match path {
        "/categorize-task" => ("categorize", &CATEGORIZE_LIMITS),
        _ => ("default", &DEFAULT_LIMITS),
    }
}

/// Rejection details for a request over its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub limit: RateLimit,
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    client: String,
    scope: &'static str,
    window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<WindowKey, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request from `client` at `now`, or reject it
    pub async fn check(
        &self,
        client: &str,
        scope: &'static str,
        limits: &[RateLimit],
        now: Instant,
    ) -> Result<(), RateLimitExceeded> {
        let mut windows = self.windows.lock().await;

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|key, w| now.duration_since(w.started) < key.window);
        }

        let keys: Vec<WindowKey> = limits
            .iter()
            .map(|limit| WindowKey {
                client: client.to_string(),
                scope,
                window: limit.window,
            })
            .collect();

        for (limit, key) in limits.iter().zip(&keys) {
            let window = windows.entry(key.clone()).or_insert(Window {
                started: now,
                count: 0,
            });
            let elapsed = now.duration_since(window.started);
            if elapsed >= limit.window {
                window.started = now;
                window.count = 0;
            } else if window.count >= limit.max_requests {
                return Err(RateLimitExceeded {
                    limit: *limit,
                    retry_after_secs: ceil_secs(limit.window - elapsed),
                });
            }
        }

        for key in &keys {
            if let Some(window) = windows.get_mut(key) {
                window.count += 1;
            }
        }
        Ok(())
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

/// Client identity: the peer address, or the first `X-Forwarded-For` hop
/// when the server sits behind a trusted proxy
fn client_key(request: &Request, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
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

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitResponse {
    error: &'static str,
    retry_after_seconds: u64,
    limit: u32,
    window_seconds: u64,
}

/// Middleware rejecting requests over their route's limits with 429
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(limiter) = state.limiter() else {
        return next.run(request).await;
    };

    let client = client_key(&request, state.trust_forwarded());
    let (scope, limits) = policy_for(request.uri().path());

    match limiter.check(&client, scope, limits, Instant::now()).await {
        Ok(()) => next.run(request).await,
        Err(exceeded) => {
            warn!(
                "Rate limit exceeded for {} on {} ({} per {}s)",
                client,
                scope,
                exceeded.limit.max_requests,
                exceeded.limit.window.as_secs()
            );
            let body = RateLimitResponse {
                error: "rate limit exceeded",
                retry_after_seconds: exceeded.retry_after_secs,
                limit: exceeded.limit.max_requests,
                window_seconds: exceeded.limit.window.as_secs(),
            };
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            if let Ok(value) = HeaderValue::from_str(&exceeded.retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let limits = [RateLimit::per_minute(3)];
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1", "test", &limits, now).await.is_ok());
        }
        let rejected = limiter
            .check("10.0.0.1", "test", &limits, now + Duration::from_millis(500))
            .await
            .unwrap_err();
        assert_eq!(rejected.limit, limits[0]);
        assert_eq!(rejected.retry_after_secs, 60);
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new();
        let limits = [RateLimit::per_minute(1)];
        let now = Instant::now();

        assert!(limiter.check("c", "test", &limits, now).await.is_ok());
        assert!(limiter.check("c", "test", &limits, now).await.is_err());
        assert!(limiter
            .check("c", "test", &limits, now + Duration::from_secs(60))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn clients_and_scopes_are_counted_separately() {
        let limiter = RateLimiter::new();
        let limits = [RateLimit::per_minute(1)];
        let now = Instant::now();

        assert!(limiter.check("a", "categorize", &limits, now).await.is_ok());
        assert!(limiter.check("b", "categorize", &limits, now).await.is_ok());
        assert!(limiter.check("a", "default", &limits, now).await.is_ok());
        assert!(limiter.check("a", "categorize", &limits, now).await.is_err());
    }

    #[tokio::test]
    async fn rejected_requests_do_not_consume_other_windows() {
        let limiter = RateLimiter::new();
        let limits = [RateLimit::per_hour(1), RateLimit::per_day(5)];
        let now = Instant::now();

        assert!(limiter.check("c", "default", &limits, now).await.is_ok());
        for _ in 0..10 {
            assert!(limiter.check("c", "default", &limits, now).await.is_err());
        }

        // The daily window only counted the single admitted request, so four
        // more hours each admit one before the day is used up
        let hour = Duration::from_secs(60 * 60);
        for h in 1..=4 {
            let at = now + hour * h;
            assert!(limiter.check("c", "default", &limits, at).await.is_ok());
            assert!(limiter.check("c", "default", &limits, at).await.is_err());
        }
        let rejected = limiter
            .check("c", "default", &limits, now + hour * 5)
            .await
            .unwrap_err();
        assert_eq!(rejected.limit, limits[1]);
    }

    #[test]
    fn categorize_route_has_its_own_policy() {
        assert_eq!(policy_for("/categorize-task"), ("categorize", &CATEGORIZE_LIMITS[..]));
        assert_eq!(policy_for("/"), ("default", &DEFAULT_LIMITS[..]));
        assert_eq!(policy_for("/health"), ("default", &DEFAULT_LIMITS[..]));
    }

    #[tokio::test]
    async fn other_routes_allow_fifty_requests_an_hour() {
        use axum::body::{to_bytes, Body};
        use axum::http::Request as HttpRequest;
        use tower::ServiceExt;

        let app = crate::routes::app(AppState::new(true, false));
        let peer = SocketAddr::from(([6, 6, 6, 6], 40_000));
        let health = || {
            HttpRequest::builder()
                .uri("/health")
                .extension(ConnectInfo(peer))
                .body(Body::empty())
                .unwrap()
        };

        for _ in 0..50 {
            let response = app.clone().oneshot(health()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(health()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["limit"], 50);
        assert_eq!(payload["windowSeconds"], 3600);

        // The categorize scope keeps its own budget
        let categorize = HttpRequest::builder()
            .method("POST")
            .uri("/categorize-task")
            .extension(ConnectInfo(peer))
            .body(Body::from(r#"{"text":"pay rent"}"#))
            .unwrap();
        let response = app.oneshot(categorize).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

//! Per-client rate limiting for the public account and contact routes.
//!
//! Clients are keyed by peer IP. Forwarded headers are only consulted when
//! `security.trust_forwarded_headers` is enabled, and only when they carry a
//! valid IP address, so arbitrary header values cannot mint new keys.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter as GovRateLimiter,
};
use serde_json::json;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::{Arc, Weak},
    time::Duration,
};

use crate::app::AppState;

const DEFAULT_RATE_LIMIT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// Key used when the peer address is unavailable.
const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// One keyed limiter shared by every client address.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// A zero limit falls back to 60 requests per minute.
    pub fn new(rate_limit_per_minute: u32) -> Self {
        let limit = NonZeroU32::new(rate_limit_per_minute).unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE);
        Self::with_quota(Quota::per_minute(limit), limit.get())
    }

    fn with_quota(quota: Quota, rate_limit_per_minute: u32) -> Self {
        Self {
            limiter: GovRateLimiter::keyed(quota),
            rate_limit_per_minute,
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// `Err` carries the retry-after delay in seconds (at least 1).
    pub fn check(&self, client: IpAddr) -> Result<(), u64> {
        self.limiter.check_key(&client).map_err(|not_until| {
            not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        })
    }

    /// Forgets clients whose quota has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn active_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("active_clients", &self.active_clients())
            .finish()
    }
}

/// Prunes `state` every `every` until the last strong reference is dropped.
pub fn spawn_pruning(state: &Arc<RateLimiterState>, every: Duration) {
    let state: Weak<RateLimiterState> = Arc::downgrade(state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            state.prune();
            tracing::debug!(active_clients = state.active_clients(), "Pruned rate limiters");
        }
    });
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(rate_limiter) = state.rate_limiter.as_ref() else {
        return next.run(req).await;
    };

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(
        req.headers(),
        peer,
        state.config.security.trust_forwarded_headers,
    );

    if let Err(retry_after) = rate_limiter.check(client) {
        tracing::warn!(client = %client, retry_after, "Rate limit exceeded");
        return rate_limited_response(rate_limiter.rate_limit_per_minute(), retry_after);
    }

    next.run(req).await
}

fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> IpAddr {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(client) = forwarded {
            return client;
        }
    }

    peer.map(|addr| addr.ip()).unwrap_or(UNKNOWN_CLIENT)
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(addr: &str) -> IpAddr {
        addr.parse().unwrap()
    }

    #[test]
    fn test_zero_limit_uses_default() {
        let state = RateLimiterState::new(0);
        assert_eq!(state.rate_limit_per_minute(), 60);
    }

    #[test]
    fn test_rate_limiter_exhaustion() {
        let state = RateLimiterState::new(1);

        assert!(state.check(ip("10.0.0.1")).is_ok());
        let result = state.check(ip("10.0.0.1"));
        assert!(result.unwrap_err() >= 1);
    }

    #[test]
    fn test_clients_are_independent() {
        let state = RateLimiterState::new(1);

        assert!(state.check(ip("10.0.0.1")).is_ok());
        assert!(state.check(ip("10.0.0.2")).is_ok());
        assert!(state.check(ip("10.0.0.1")).is_err());
        assert!(state.check(ip("10.0.0.2")).is_err());
    }

    #[test]
    fn test_same_client_multiple_checks() {
        let state = RateLimiterState::new(5);

        for i in 0..5 {
            assert!(state.check(ip("::1")).is_ok(), "request {} should pass", i);
        }
        assert!(state.check(ip("::1")).is_err());
    }

    #[test]
    fn test_one_entry_per_client() {
        let state = RateLimiterState::new(100);

        state.check(ip("10.0.0.1")).unwrap();
        state.check(ip("10.0.0.1")).unwrap();
        state.check(ip("10.0.0.2")).unwrap();

        assert_eq!(state.active_clients(), 2);
        assert!(format!("{:?}", state).contains("active_clients: 2"));
    }

    #[test]
    fn test_prune_forgets_replenished_clients() {
        let quota = Quota::with_period(Duration::from_millis(10)).unwrap();
        let state = RateLimiterState::with_quota(quota, 6000);

        state.check(ip("10.0.0.1")).unwrap();
        state.check(ip("10.0.0.2")).unwrap();
        assert_eq!(state.active_clients(), 2);

        std::thread::sleep(Duration::from_millis(50));
        state.prune();

        assert_eq!(state.active_clients(), 0);
    }

    #[test]
    fn test_prune_keeps_limited_clients() {
        let state = RateLimiterState::new(1);

        state.check(ip("10.0.0.1")).unwrap();
        state.prune();

        assert_eq!(state.active_clients(), 1);
        assert!(state.check(ip("10.0.0.1")).is_err());
    }

    #[tokio::test]
    async fn test_pruning_task_stops_with_state() {
        let quota = Quota::with_period(Duration::from_millis(5)).unwrap();
        let state = Arc::new(RateLimiterState::with_quota(quota, 12000));
        spawn_pruning(&state, Duration::from_millis(10));

        state.check(ip("10.0.0.1")).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(state.active_clients(), 0);

        let weak = Arc::downgrade(&state);
        drop(state);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_client_key_from_peer() {
        let peer: SocketAddr = "192.0.2.7:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.1"));

        assert_eq!(client_key(&headers, Some(peer), false), ip("192.0.2.7"));
        assert_eq!(client_key(&HeaderMap::new(), None, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_client_key_from_trusted_forwarded_headers() {
        let peer: SocketAddr = "192.0.2.7:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.1, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, Some(peer), true), ip("203.0.113.1"));

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_key(&headers, Some(peer), true), ip("198.51.100.2"));
    }

    #[test]
    fn test_unparseable_forwarded_header_falls_back_to_peer() {
        let peer: SocketAddr = "192.0.2.7:5555".parse().unwrap();
        let state = RateLimiterState::new(100);

        for i in 0..50 {
            let mut headers = HeaderMap::new();
            headers.insert(
                "x-forwarded-for",
                HeaderValue::from_str(&format!("client-{}", i)).unwrap(),
            );
            let client = client_key(&headers, Some(peer), true);
            assert_eq!(client, ip("192.0.2.7"));
            state.check(client).unwrap();
        }

        assert_eq!(state.active_clients(), 1);
    }

    #[test]
    fn test_rate_limited_response() {
        let response = rate_limited_response(100, 60);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }
}

// Rate limiting for API protection
// Token bucket per client address for every request, plus lockout limiters for
// staff sign-in and guardian lookup

use std::future::{Future, Ready, ready};
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{
    Error, HttpRequest, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    http::header::{HeaderName, HeaderValue},
};
use dashmap::DashMap;
use serde::Serialize;

use piaget_common::error::TOO_MANY_REQUESTS;

use crate::model::response::Result as ApiResult;

/// Rate limiter configuration
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window_duration: Duration,
    /// Whether rate limiting is enabled
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_duration: Duration::from_secs(60),
            enabled: true,
        }
    }
}

/// Token bucket for rate limiting
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
    max_tokens: u32,
    refill_interval: Duration,
}

impl TokenBucket {
    fn new(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_interval,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.refill_interval {
            self.tokens = self.max_tokens;
            self.last_refill = now;
        }
    }

    fn remaining(&self) -> u32 {
        self.tokens
    }
}

/// Request buckets shared by every worker
pub struct RateLimiterState {
    buckets: DashMap<String, TokenBucket>,
    config: RateLimitConfig,
    trusted_proxies: Vec<IpAddr>,
}

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
            trusted_proxies: Vec::new(),
        }
    }

    /// Peers whose forwarding headers name the real client
    pub fn with_trusted_proxies(mut self, trusted_proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = trusted_proxies;
        self
    }

    fn check_rate_limit(&self, key: &str) -> (bool, u32) {
        if !self.config.enabled {
            return (true, self.config.max_requests);
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
            TokenBucket::new(self.config.max_requests, self.config.window_duration)
        });

        let allowed = bucket.try_consume();
        let remaining = bucket.remaining();
        (allowed, remaining)
    }

    /// Drop buckets idle for two windows
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill) < self.config.window_duration * 2
        });
    }
}

/// Client address used as the limiter key.
///
/// This is the socket peer. `Forwarded` / `X-Forwarded-For` are only read
/// when the peer is one of `trusted_proxies`.
pub fn client_key(req: &HttpRequest, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = req.peer_addr().map(|addr| addr.ip()) else {
        return "unknown".to_string();
    };

    if trusted_proxies.contains(&peer)
        && let Some(forwarded) = req.connection_info().realip_remote_addr()
    {
        return forwarded.to_string();
    }

    peer.to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetryAfter {
    retry_after: u64,
}

/// 429 answer shared by the request limiter and the lockout limiters
pub fn too_many_requests(limit: u32, retry_after_secs: u64) -> HttpResponse {
    HttpResponse::build(StatusCode::TOO_MANY_REQUESTS)
        .insert_header(("X-RateLimit-Limit", limit.to_string()))
        .insert_header(("X-RateLimit-Remaining", "0"))
        .insert_header(("Retry-After", retry_after_secs.to_string()))
        .json(ApiResult::new(
            TOO_MANY_REQUESTS.code,
            "Too many requests. Please try again later.".to_string(),
            RetryAfter {
                retry_after: retry_after_secs,
            },
        ))
}

/// Rate limiting middleware factory
pub struct RateLimiter {
    state: Arc<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::from_state(Arc::new(RateLimiterState::new(config)))
    }

    /// Share one bucket map across server workers
    pub fn from_state(state: Arc<RateLimiterState>) -> Self {
        Self { state }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            state: self.state.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    state: Arc<RateLimiterState>,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client_ip = client_key(req.request(), &self.state.trusted_proxies);

        let (allowed, remaining) = self.state.check_rate_limit(&client_ip);

        if !allowed {
            tracing::warn!(client = %client_ip, "Request rate limit exceeded");
            let response = too_many_requests(
                self.state.config.max_requests,
                self.state.config.window_duration.as_secs(),
            );
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let fut = self.service.call(req);
        let max_requests = self.state.config.max_requests;

        Box::pin(async move {
            let mut res = fut.await?;

            res.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(max_requests),
            );
            res.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(remaining),
            );

            Ok(res.map_into_left_body())
        })
    }
}

// ============================================================================
// Lockout limiter
// Counts failed attempts per key and locks the key once the limit is reached
// ============================================================================

/// Lockout limiter configuration
#[derive(Clone, Debug)]
pub struct AuthRateLimitConfig {
    /// Maximum failed attempts per window
    pub max_attempts: u32,
    /// Time window duration for attempt counting
    pub window_duration: Duration,
    /// Lockout duration after exceeding max attempts
    pub lockout_duration: Duration,
    pub enabled: bool,
}

impl Default for AuthRateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_duration: Duration::from_secs(60),
            lockout_duration: Duration::from_secs(300),
            enabled: true,
        }
    }
}

/// Entry tracking failed attempts
struct AuthAttemptEntry {
    attempts: u32,
    first_attempt: Instant,
    locked_until: Option<Instant>,
}

impl AuthAttemptEntry {
    fn new() -> Self {
        Self {
            attempts: 0,
            first_attempt: Instant::now(),
            locked_until: None,
        }
    }

    fn is_locked(&self) -> bool {
        if let Some(locked_until) = self.locked_until {
            Instant::now() < locked_until
        } else {
            false
        }
    }

    fn remaining_lockout_secs(&self) -> u64 {
        if let Some(locked_until) = self.locked_until {
            let now = Instant::now();
            if now < locked_until {
                // Round up so a client never retries a moment too early
                return (locked_until - now).as_secs().max(1);
            }
        }
        0
    }

    fn reset_if_expired(&mut self, window: Duration) {
        let now = Instant::now();
        if now.duration_since(self.first_attempt) >= window && !self.is_locked() {
            self.attempts = 0;
            self.first_attempt = now;
            self.locked_until = None;
        }
    }
}

/// Lockout limiter for staff sign-in and guardian lookup
pub struct AuthRateLimiter {
    entries: DashMap<String, AuthAttemptEntry>,
    config: AuthRateLimitConfig,
}

impl AuthRateLimiter {
    pub fn new(config: AuthRateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(AuthRateLimitConfig::default())
    }

    pub fn config(&self) -> &AuthRateLimitConfig {
        &self.config
    }

    /// Check if an attempt is allowed for the given key
    /// Returns (allowed, remaining_attempts, lockout_secs)
    pub fn check_attempt(&self, key: &str) -> (bool, u32, u64) {
        if !self.config.enabled {
            return (true, self.config.max_attempts, 0);
        }

        let Some(mut entry) = self.entries.get_mut(key) else {
            return (true, self.config.max_attempts, 0);
        };

        if entry.is_locked() {
            return (false, 0, entry.remaining_lockout_secs());
        }

        entry.reset_if_expired(self.config.window_duration);

        let remaining = self.config.max_attempts.saturating_sub(entry.attempts);
        (remaining > 0, remaining, 0)
    }

    /// Record a failed attempt
    /// Returns (allowed, remaining_attempts, lockout_secs)
    pub fn record_attempt(&self, key: &str) -> (bool, u32, u64) {
        if !self.config.enabled {
            return (true, self.config.max_attempts, 0);
        }

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(AuthAttemptEntry::new);

        if entry.is_locked() {
            return (false, 0, entry.remaining_lockout_secs());
        }

        entry.reset_if_expired(self.config.window_duration);
        entry.attempts += 1;

        if entry.attempts >= self.config.max_attempts {
            entry.locked_until = Some(Instant::now() + self.config.lockout_duration);
            tracing::warn!(
                "Attempt limit exceeded for key '{}', locked for {} seconds",
                key,
                self.config.lockout_duration.as_secs()
            );
            return (false, 0, self.config.lockout_duration.as_secs());
        }

        let remaining = self.config.max_attempts.saturating_sub(entry.attempts);
        (true, remaining, 0)
    }

    /// Forget the failures of a key
    pub fn record_success(&self, key: &str) {
        if !self.config.enabled {
            return;
        }

        self.entries.remove(key);
    }

    /// Drop entries that are neither locked nor inside their window
    pub fn cleanup(&self) {
        let now = Instant::now();
        let max_age = self.config.window_duration + self.config.lockout_duration;

        self.entries.retain(|_, entry| {
            entry.is_locked() || now.duration_since(entry.first_attempt) < max_age
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

/// Cleanup interval for rate limiter entries (5 minutes)
const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Periodically drop stale limiter entries.
/// Returns a handle that can be used to abort the cleanup task.
pub fn start_cleanup_task(
    request_state: Arc<RateLimiterState>,
    lockouts: Vec<Arc<AuthRateLimiter>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            request_state.cleanup();
            for limiter in &lockouts {
                limiter.cleanup();
            }
            tracing::debug!("Rate limiter cleanup completed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lockout(max_attempts: u32, enabled: bool) -> AuthRateLimiter {
        AuthRateLimiter::new(AuthRateLimitConfig {
            max_attempts,
            window_duration: Duration::from_secs(60),
            lockout_duration: Duration::from_secs(300),
            enabled,
        })
    }

    #[test]
    fn test_token_bucket() {
        let mut bucket = TokenBucket::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(bucket.try_consume());
        }

        assert!(!bucket.try_consume());
    }

    #[test]
    fn test_rate_limiter_state() {
        let state = RateLimiterState::new(RateLimitConfig {
            max_requests: 3,
            window_duration: Duration::from_secs(60),
            enabled: true,
        });

        for _ in 0..3 {
            let (allowed, _) = state.check_rate_limit("10.0.0.1");
            assert!(allowed);
        }

        let (allowed, remaining) = state.check_rate_limit("10.0.0.1");
        assert!(!allowed);
        assert_eq!(remaining, 0);

        // Other clients keep their own bucket
        assert!(state.check_rate_limit("10.0.0.2").0);
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let state = RateLimiterState::new(RateLimitConfig {
            max_requests: 1,
            window_duration: Duration::from_secs(60),
            enabled: false,
        });

        for _ in 0..10 {
            let (allowed, _) = state.check_rate_limit("10.0.0.1");
            assert!(allowed);
        }
    }

    #[test]
    fn test_lockout_after_max_attempts() {
        let limiter = lockout(3, true);

        for i in 0..3 {
            let (allowed, remaining, _) = limiter.record_attempt("10.0.0.1");
            if i < 2 {
                assert!(allowed, "attempt {} should be allowed", i + 1);
                assert_eq!(remaining, 2 - i as u32);
            } else {
                assert!(!allowed, "3rd attempt should trigger lockout");
            }
        }

        let (allowed, remaining, lockout_secs) = limiter.check_attempt("10.0.0.1");
        assert!(!allowed);
        assert_eq!(remaining, 0);
        assert!(lockout_secs > 0);

        assert!(limiter.check_attempt("10.0.0.2").0);
    }

    #[test]
    fn test_check_does_not_track_unknown_keys() {
        let limiter = lockout(3, true);
        let (allowed, remaining, _) = limiter.check_attempt("10.0.0.1");
        assert!(allowed);
        assert_eq!(remaining, 3);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_success_resets() {
        let limiter = lockout(3, true);

        limiter.record_attempt("10.0.0.1");
        limiter.record_attempt("10.0.0.1");
        limiter.record_success("10.0.0.1");

        let (allowed, remaining, _) = limiter.check_attempt("10.0.0.1");
        assert!(allowed);
        assert_eq!(remaining, 3);
    }

    #[test]
    fn test_lockout_disabled() {
        let limiter = lockout(1, false);

        for _ in 0..10 {
            let (allowed, _, _) = limiter.record_attempt("10.0.0.1");
            assert!(allowed);
        }
    }

    #[test]
    fn test_cleanup_keeps_locked_entries() {
        let limiter = AuthRateLimiter::new(AuthRateLimitConfig {
            max_attempts: 1,
            window_duration: Duration::ZERO,
            lockout_duration: Duration::from_secs(300),
            enabled: true,
        });
        limiter.record_attempt("10.0.0.1");
        limiter.cleanup();
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(!limiter.check_attempt("10.0.0.1").0);
    }

    #[test]
    fn test_client_key_ignores_untrusted_forwarding() {
        let req = actix_web::test::TestRequest::default()
            .peer_addr("203.0.113.7:5000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "10.0.0.9"))
            .to_http_request();

        assert_eq!(client_key(&req, &[]), "203.0.113.7");
        assert_eq!(
            client_key(&req, &["198.51.100.1".parse().unwrap()]),
            "203.0.113.7"
        );
    }

    #[test]
    fn test_client_key_behind_trusted_proxy() {
        let proxy: IpAddr = "198.51.100.1".parse().unwrap();

        let forwarded = actix_web::test::TestRequest::default()
            .peer_addr("198.51.100.1:443".parse().unwrap())
            .insert_header(("X-Forwarded-For", "10.0.0.9"))
            .to_http_request();
        assert_eq!(client_key(&forwarded, &[proxy]), "10.0.0.9");

        let direct = actix_web::test::TestRequest::default()
            .peer_addr("198.51.100.1:443".parse().unwrap())
            .to_http_request();
        assert_eq!(client_key(&direct, &[proxy]), "198.51.100.1");

        let anonymous = actix_web::test::TestRequest::default().to_http_request();
        assert_eq!(client_key(&anonymous, &[proxy]), "unknown");
    }

    #[test]
    fn test_too_many_requests_response() {
        let resp = too_many_requests(5, 120);
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get("Retry-After").unwrap(), "120");
        assert_eq!(resp.headers().get("X-RateLimit-Remaining").unwrap(), "0");
    }
}

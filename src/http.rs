// 🌐 Resilient Caller - rate-limited, retrying wrapper around outbound GETs
// Transport and Clock are seams so pacing can be tested without the network

use governor::clock::Clock as GovernorClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use ureq::{Agent, AgentBuilder};

use crate::error::{FetchError, FetchResult};

/// Per-request timeout for real HTTP calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("autoilty-scraper/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// REQUEST
// ============================================================================

/// GET request description. Query values may carry credentials, so only
/// the URL is ever logged.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        HttpRequest {
            url: url.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// First query value for `key`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

pub trait Transport: Send + Sync {
    /// Perform one GET and decode the body as JSON
    fn get(&self, request: &HttpRequest) -> FetchResult<Value>;
}

/// Blocking transport backed by a shared ureq agent
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        UreqTransport { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: &HttpRequest) -> FetchResult<Value> {
        let mut call = self.agent.get(&request.url);
        for (key, value) in &request.query {
            call = call.query(key, value);
        }
        for (key, value) in &request.headers {
            call = call.set(key, value);
        }

        let response = call.call()?;
        response
            .into_json::<Value>()
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

// ============================================================================
// CLOCK
// ============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ============================================================================
// RETRY POLICY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `attempt` (1-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let multiplier = self.backoff_multiplier.powi(exponent);
        let delay = Duration::from_millis((self.base_delay.as_millis() as f64 * multiplier) as u64);

        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

// ============================================================================
// RATE LIMIT
// ============================================================================

/// `calls` requests per `period`, enforced as an evenly replenished burst
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub calls: usize,
    pub period: Duration,
}

impl RateLimit {
    /// Places API: 100 calls per minute
    pub fn google_places() -> Self {
        RateLimit {
            calls: 100,
            period: Duration::from_secs(60),
        }
    }

    /// Directory API: 500 calls per day
    pub fn yelp() -> Self {
        RateLimit {
            calls: 500,
            period: Duration::from_secs(86_400),
        }
    }

    fn quota(&self) -> Quota {
        // A zero-call limit could never be satisfied
        let calls = u32::try_from(self.calls).unwrap_or(u32::MAX);
        let burst = NonZeroU32::new(calls).unwrap_or(NonZeroU32::MIN);

        match Quota::with_period(self.period / burst.get()) {
            Some(quota) => quota.allow_burst(burst),
            None => Quota::per_second(burst),
        }
    }
}

/// Bridges the injected `Clock` into governor's clock abstraction
#[derive(Clone)]
struct LimiterClock(Arc<dyn Clock>);

impl GovernorClock for LimiterClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        self.0.now()
    }
}

type DirectLimiter =
    GovernorRateLimiter<NotKeyed, InMemoryState, LimiterClock, NoOpMiddleware<Instant>>;

/// GCRA limiter: bursts up to `calls`, then one call per `period / calls`
pub struct RateLimiter {
    clock: LimiterClock,
    limiter: DirectLimiter,
}

impl RateLimiter {
    pub fn new(limit: RateLimit, clock: Arc<dyn Clock>) -> Self {
        let clock = LimiterClock(clock);
        let limiter = GovernorRateLimiter::direct_with_clock(limit.quota(), &clock);
        RateLimiter { clock, limiter }
    }

    /// Block (via the clock) until a cell is free, then claim it
    pub fn acquire(&self) {
        while let Err(not_until) = self.limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            self.clock.0.sleep(wait);
        }
    }
}

// ============================================================================
// RESILIENT CALLER
// ============================================================================

pub struct ResilientCaller {
    name: String,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    limiter: RateLimiter,
}

impl ResilientCaller {
    pub fn new(
        name: &str,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        limit: RateLimit,
    ) -> Self {
        ResilientCaller {
            name: name.to_string(),
            transport,
            clock: clock.clone(),
            policy,
            limiter: RateLimiter::new(limit, clock),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rate-limited GET with exponential backoff on retryable failures.
    /// Never fails: exhaustion or a permanent error yields `None`.
    pub fn call(&self, request: &HttpRequest) -> Option<Value> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            self.limiter.acquire();

            match self.transport.get(request) {
                Ok(value) => return Some(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.calculate_delay(attempt);
                    warn!(
                        source = %self.name,
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    self.clock.sleep(delay);
                }
                Err(e) => {
                    warn!(
                        source = %self.name,
                        url = %request.url,
                        attempt,
                        error = %e,
                        "Request failed, giving up"
                    );
                    return None;
                }
            }
        }

        None
    }
}

// ============================================================================
// TESTS
// ============================================================================

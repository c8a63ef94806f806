//! Test doubles for the outbound seams.
//!
//! `MockTransport` answers GETs from canned JSON routed by URL prefix and
//! records every request; `FakeClock` advances virtual time instead of
//! sleeping. Used by unit tests and the integration tests under `tests/`.

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{FetchError, FetchResult};
use crate::http::{Clock, HttpRequest, Transport};

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

struct Route {
    url_prefix: String,
    param: Option<(String, String)>,
    script: VecDeque<FetchResult<Value>>,
    fallback: Option<Value>,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        if !request.url.starts_with(&self.url_prefix) {
            return false;
        }
        match &self.param {
            Some((key, needle)) => request.param(key).is_some_and(|v| v.contains(needle.as_str())),
            None => true,
        }
    }

    fn next(&mut self) -> Option<FetchResult<Value>> {
        match self.script.pop_front() {
            Some(result) => Some(result),
            None => self.fallback.clone().map(Ok),
        }
    }
}

/// Canned responses. Routes are tried in the order they were added; the
/// first one that matches and still has something to say answers.
/// Unmatched requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `response` for URLs starting with `url_prefix`
    pub fn with_route(self, url_prefix: &str, response: Value) -> Self {
        self.push(Route {
            url_prefix: url_prefix.to_string(),
            param: None,
            script: VecDeque::new(),
            fallback: Some(response),
        })
    }

    /// Like `with_route`, but only when query parameter `key` contains `needle`
    pub fn with_param_route(self, url_prefix: &str, key: &str, needle: &str, response: Value) -> Self {
        self.push(Route {
            url_prefix: url_prefix.to_string(),
            param: Some((key.to_string(), needle.to_string())),
            script: VecDeque::new(),
            fallback: Some(response),
        })
    }

    /// Answer with each scripted result once, in order
    pub fn with_script(self, url_prefix: &str, script: Vec<FetchResult<Value>>) -> Self {
        self.push(Route {
            url_prefix: url_prefix.to_string(),
            param: None,
            script: script.into(),
            fallback: None,
        })
    }

    fn push(self, route: Route) -> Self {
        self.routes.lock().unwrap_or_else(|e| e.into_inner()).push(route);
        self
    }

    /// Every request seen so far, in order
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Requests whose URL starts with `url_prefix`
    pub fn calls_to(&self, url_prefix: &str) -> Vec<HttpRequest> {
        self.calls()
            .into_iter()
            .filter(|r| r.url.starts_with(url_prefix))
            .collect()
    }
}

impl Transport for MockTransport {
    fn get(&self, request: &HttpRequest) -> FetchResult<Value> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        for route in routes.iter_mut().filter(|r| r.matches(request)) {
            if let Some(result) = route.next() {
                return result;
            }
        }

        Err(FetchError::Status {
            status: 404,
            body: format!("no route for {}", request.url),
        })
    }
}

// ============================================================================
// FAKE CLOCK
// ============================================================================

/// Virtual clock: `sleep` advances time instantly and is recorded
pub struct FakeClock {
    now: Mutex<Instant>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock {
            now: Mutex::new(Instant::now()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
    }
}

//! Scripted transport for tests.
//!
//! Routes are keyed by URL path. Unknown paths answer 404 with no body.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::ports::{HeaderList, HttpRequest, HttpResponse, TransportError, TransportPort};

#[derive(Debug, Clone)]
struct Route {
    outcome: Result<HttpResponse, TransportError>,
    delay: Option<Duration>,
}

/// In-memory [`TransportPort`] that answers from a route table and records traffic.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    /// Empty route table, no latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with `status` and `body`.
    pub fn route(&self, path: &str, status: u16, body: impl Into<Bytes>) -> &Self {
        self.insert(path, Ok(HttpResponse::new(status, body)));
        self
    }

    /// Answer `path` with a prepared response, headers included.
    pub fn route_response(&self, path: &str, response: HttpResponse) -> &Self {
        self.insert(path, Ok(response));
        self
    }

    /// Answer `path` with `status` and no body.
    pub fn route_empty(&self, path: &str, status: u16) -> &Self {
        self.insert(path, Ok(HttpResponse::empty(status)));
        self
    }

    /// Fail `path` at the transport level.
    pub fn route_error(&self, path: &str, message: &str) -> &Self {
        self.insert(path, Err(TransportError::new(message)));
        self
    }

    /// Delay answers for `path` by `delay`, overriding the global latency.
    pub fn delay(&self, path: &str, delay: Duration) -> &Self {
        if let Some(route) = lock(&self.routes).get_mut(path) {
            route.delay = Some(delay);
        }
        self
    }

    /// Delay every answer without a per-route delay.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    fn insert(&self, path: &str, outcome: Result<HttpResponse, TransportError>) {
        let mut routes = lock(&self.routes);
        let delay = routes.get(path).and_then(|r| r.delay);
        routes.insert(path.to_string(), Route { outcome, delay });
    }

    /// Requests received for `path`, including ones still in flight.
    pub fn hits(&self, path: &str) -> usize {
        lock(&self.hits).get(path).copied().unwrap_or(0)
    }

    /// Total requests received.
    pub fn total_requests(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Headers of the most recent request.
    pub fn last_headers(&self) -> Option<HeaderList> {
        lock(&self.requests).last().map(|r| r.headers.clone())
    }

    /// Highest number of requests that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportPort for ScriptedTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request.url.path().to_string();
        *lock(&self.hits).entry(path.clone()).or_insert(0) += 1;
        lock(&self.requests).push(request);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let route = lock(&self.routes).get(&path).cloned();
        let delay = route
            .as_ref()
            .and_then(|r| r.delay)
            .unwrap_or_else(|| *lock(&self.latency));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match route {
            Some(route) => route.outcome,
            None => Ok(HttpResponse::empty(404)),
        }
    }
}

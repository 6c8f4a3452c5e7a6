//! In-memory transport for driving the client and engine in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SubFetchError;
use crate::github::client::{ApiResponse, HttpTransport, ResponseMeta};

struct Route {
    prefix: String,
    response: std::result::Result<ApiResponse, SubFetchError>,
}

/// Answers each URL with the response of the longest matching prefix, and
/// 404 when nothing matches. Every requested URL is recorded.
///
/// Requests whose URL contains one of the [`track_in_flight`] patterns yield
/// to the scheduler before answering, so overlapping requests are visible in
/// [`peak_in_flight`].
///
/// [`track_in_flight`]: ScriptedTransport::track_in_flight
/// [`peak_in_flight`]: ScriptedTransport::peak_in_flight
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Vec<Route>,
    requests: Mutex<Vec<String>>,
    tracked: Vec<String>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, prefix: &str, status: u16, body: Value) -> Self {
        self.route_with_meta(prefix, status, body, ResponseMeta::default())
    }

    pub fn route_with_meta(mut self, prefix: &str, status: u16, body: Value, meta: ResponseMeta) -> Self {
        self.routes.push(Route {
            prefix: prefix.to_string(),
            response: Ok(ApiResponse {
                status,
                body: body.to_string(),
                meta,
            }),
        });
        self
    }

    pub fn fail(mut self, prefix: &str, error: SubFetchError) -> Self {
        self.routes.push(Route {
            prefix: prefix.to_string(),
            response: Err(error),
        });
        self
    }

    pub fn track_in_flight(mut self, pattern: &str) -> Self {
        self.tracked.push(pattern.to_string());
        self
    }

    /// Most tracked requests that were ever outstanding at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn hits(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str, _token: &str) -> std::result::Result<ApiResponse, SubFetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        if self.tracked.iter().any(|pattern| url.contains(pattern.as_str())) {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        let route = self
            .routes
            .iter()
            .filter(|r| url.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len());

        match route {
            Some(route) => route.response.clone(),
            None => Ok(ApiResponse {
                status: 404,
                body: r#"{"message":"Not Found"}"#.to_string(),
                meta: ResponseMeta::default(),
            }),
        }
    }
}

/// Lets a test keep a handle on the transport after the client owns it.
#[async_trait]
impl HttpTransport for std::sync::Arc<ScriptedTransport> {
    async fn get(&self, url: &str, token: &str) -> std::result::Result<ApiResponse, SubFetchError> {
        (**self).get(url, token).await
    }
}

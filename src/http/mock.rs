//! Mock remote lookup for unit testing.
//!
//! Serves canned JSON payloads keyed by URL and query parameters, without
//! making real network requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::client::{JsonFetcher, Scheduler};
use crate::error::RemoteRequestError;

/// Configuration for mock fetcher behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail every request with a transport error.
    pub fail_requests: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock fetcher serving canned payloads.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    config: MockConfig,
    responses: Arc<Mutex<HashMap<String, Value>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Create a mock fetcher with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock fetcher with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Register the payload served for `url` with exactly these parameters.
    pub fn insert(&self, url: &str, params: &[(&str, &str)], payload: Value) {
        let owned: Vec<(&str, String)> =
            params.iter().map(|(key, value)| (*key, value.to_string())).collect();
        self.responses
            .lock()
            .unwrap()
            .insert(request_key(url, &owned), payload);
    }

    /// Keys requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn request_key(url: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!("{}?{}", url, query.join("&"))
}

#[async_trait]
impl JsonFetcher for MockFetcher {
    async fn fetch_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, RemoteRequestError> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let key = request_key(url, params);
        self.requests.lock().unwrap().push(key.clone());

        if self.config.fail_requests {
            return Err(RemoteRequestError {
                url: key,
                attempts: 1,
                reason: "mock transport failure".to_string(),
            });
        }

        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| RemoteRequestError {
                url: key,
                attempts: 1,
                reason: "no canned response".to_string(),
            })
    }
}

/// Scheduler that records requested delays instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingScheduler {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingScheduler {
    /// Create an empty recording scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

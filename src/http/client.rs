//! JSON fetching over HTTP with retry and exponential backoff.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::RemoteRequestError;
use crate::metrics;

/// User agent sent with every upstream request.
const USER_AGENT: &str = "polymarket-tracker/1.0";

/// Capability to fetch a JSON document from an upstream endpoint.
///
/// The single error kind covers retry exhaustion of any failure mode;
/// callers never see individual attempts.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fetch `url` with the given query parameters.
    async fn fetch_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, RemoteRequestError>;
}

/// Injectable sleep so retry timing is testable without real delays.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Wait for `delay` before the next attempt.
    async fn sleep(&self, delay: Duration);
}

/// Production scheduler backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Exponential backoff retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts allowed after the first failure.
    pub max_retries: u32,
    /// Base backoff; the wait after attempt N is `backoff * 2^N`.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after a failure on `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt)
    }

    /// Total attempts including the initial request.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 0-based attempt number. Backoff sleeps go through the
/// scheduler; the last error is returned once retries run out.
pub(crate) async fn run_with_backoff<T, E, Op, Fut>(
    policy: &RetryPolicy,
    scheduler: &dyn Scheduler,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                debug!(attempt, error = %err, "request failed, backing off");
                metrics::inc_http_retries();
                scheduler.sleep(policy.delay(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// Failure modes of a single attempt. All of them retry with the same
/// backoff; 429 is only distinguished for logging.
#[derive(Debug)]
enum FetchFailure {
    RateLimited,
    Status(StatusCode),
    Transport(reqwest::Error),
    Decode(reqwest::Error),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::RateLimited => write!(f, "HTTP 429 rate limited"),
            FetchFailure::Status(status) => write!(f, "HTTP {status}"),
            FetchFailure::Transport(err) => write!(f, "transport error: {err}"),
            FetchFailure::Decode(err) => write!(f, "decode error: {err}"),
        }
    }
}

/// Production JSON fetcher with pooled connections and retry/backoff.
pub struct HttpFetcher {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Retry policy applied to every request.
    retry: RetryPolicy,
    /// Sleep implementation between attempts.
    scheduler: Box<dyn Scheduler>,
}

impl HttpFetcher {
    /// Create a fetcher from config with optimized HTTP settings.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            // Fast connection establishment
            .connect_timeout(Duration::from_millis(500))
            // TCP_NODELAY for low-latency (disable Nagle's algorithm)
            .tcp_nodelay(true)
            // Keep connections alive for reuse
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(config.http_pool_size)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: Duration::from_millis(config.backoff_ms),
            },
            scheduler: Box::new(TokioScheduler),
        }
    }

    /// Replace the scheduler (tests inject a recording one).
    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    async fn request_once(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchFailure> {
        let start = Instant::now();
        let response = self
            .http
            .get(url)
            .query(params)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(FetchFailure::Transport)?;
        metrics::record_http_latency(start, url);

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchFailure::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchFailure::Status(status));
        }

        response.json::<Value>().await.map_err(FetchFailure::Decode)
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    #[instrument(skip(self, params), fields(url = %url))]
    async fn fetch_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, RemoteRequestError> {
        run_with_backoff(&self.retry, self.scheduler.as_ref(), |_| {
            self.request_once(url, params)
        })
        .await
        .map_err(|failure| {
            warn!(url = %url, error = %failure, "request failed after retries");
            RemoteRequestError {
                url: url.to_string(),
                attempts: self.retry.total_attempts(),
                reason: failure.to_string(),
            }
        })
    }
}

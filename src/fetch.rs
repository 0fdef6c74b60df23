//! Conditional HTTP fetching with exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the run logic never talks to
//! `reqwest` directly:
//! - [`FeedFetcher`]: core trait performing one conditional GET
//! - [`HttpFetcher`]: `reqwest` implementation sending `If-None-Match`
//! - [`RetryFetch`]: decorator adding retries for transient failures
//!
//! # Retry Strategy
//!
//! - Only transport failures, HTTP 429 and HTTP 5xx are retried
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Tunables for the network side of a run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total time allowed for one request, including the body.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts after the first for transient failures.
    pub retries: usize,
    /// Initial backoff delay; doubles with each attempt.
    pub base_delay: Duration,
    pub user_agent: String,
}

/// Result of a conditional GET that reached the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Full content returned (HTTP 200).
    Modified { body: Vec<u8>, etag: Option<String> },
    /// The presented validator still matches (HTTP 304).
    NotModified,
}

/// Reasons a fetch produced neither content nor a not-modified answer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Transport(_) | FetchError::Body(_) => true,
            FetchError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// One conditional GET against a feed URL.
pub trait FeedFetcher {
    /// Fetch `url`, presenting `etag` as `If-None-Match` when given.
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchOutcome, FetchError>;
}

/// [`FeedFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl FeedFetcher for HttpFetcher {
    #[instrument(level = "info", skip(self), fields(conditional = etag.is_some()))]
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchOutcome, FetchError> {
        let t0 = Instant::now();
        let mut request = self.client.get(url);
        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "Response received");

        match status {
            StatusCode::OK => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let body = response.bytes().await?.to_vec();
                Ok(FetchOutcome::Modified { body, etag })
            }
            StatusCode::NOT_MODIFIED => Ok(FetchOutcome::NotModified),
            other => Err(FetchError::Status(other)),
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FeedFetcher`].
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FeedFetcher,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FeedFetcher for RetryFetch<T>
where
    T: FeedFetcher,
{
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchOutcome, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url, etag).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            %url,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let shift = (attempt - 1).min(16) as u32;
                    let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        %url,
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

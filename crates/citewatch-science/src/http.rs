use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use citewatch_core::{NetworkConfig, ThrottleConfig};
use futures::StreamExt;
use reqwest::{Response, StatusCode, Url};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{Result, ScienceError};

// ─── Pause ────────────────────────────────────────────────────────────────────

/// Blocking-style waits between requests. Swapped out in tests so backoff can
/// be asserted without sleeping.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

// ─── RetryPolicy ──────────────────────────────────────────────────────────────

/// Rate-limit responses back off linearly (`step`, `2*step`, ...); transport
/// faults back off by a flat interval. Everything else fails at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub rate_limit_retries: u32,
    pub rate_limit_step: Duration,
    pub transport_retries: u32,
    pub transport_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_throttle(throttle: &ThrottleConfig) -> Self {
        Self {
            rate_limit_retries: throttle.rate_limit_retries,
            rate_limit_step: Duration::from_secs(throttle.rate_limit_step_secs),
            transport_retries: throttle.transport_retries,
            transport_backoff: Duration::from_secs(throttle.transport_backoff_secs),
        }
    }

    pub fn none() -> Self {
        Self {
            rate_limit_retries: 0,
            rate_limit_step: Duration::ZERO,
            transport_retries: 0,
            transport_backoff: Duration::ZERO,
        }
    }

    /// Wait before the `retry`-th retry (1-based) after a rate-limit response.
    pub fn rate_limit_delay(&self, retry: u32) -> Duration {
        self.rate_limit_step * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_throttle(&ThrottleConfig::default())
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// retry budget for its error kind is spent.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, pause: &dyn Pause, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut rate_limited = 0u32;
    let mut transport_faults = 0u32;
    loop {
        match attempt().await {
            Err(ScienceError::RateLimit(source)) if rate_limited < policy.rate_limit_retries => {
                rate_limited += 1;
                let wait = policy.rate_limit_delay(rate_limited);
                warn!(%source, wait_secs = wait.as_secs(), "rate limited, backing off");
                pause.pause(wait).await;
            }
            Err(ScienceError::Http(e)) if transport_faults < policy.transport_retries => {
                transport_faults += 1;
                warn!(error = %e, "request failed, retrying");
                pause.pause(policy.transport_backoff).await;
            }
            other => return other,
        }
    }
}

// ─── HttpClient ───────────────────────────────────────────────────────────────

pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryPolicy,
    pause: Arc<dyn Pause>,
}

impl HttpClient {
    /// Build a client from explicit transport settings. The proxy, if any,
    /// comes from `network` and nowhere else.
    pub fn new(
        network: &NetworkConfig,
        timeout: Duration,
        retry: RetryPolicy,
        pause: Arc<dyn Pause>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(network.user_agent.as_str())
            .timeout(timeout)
            .gzip(true);
        if let Some(proxy) = network.active_proxy() {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
            retry,
            pause,
        })
    }

    pub fn pause(&self) -> &Arc<dyn Pause> {
        &self.pause
    }

    pub async fn get_text(&self, url: &Url) -> Result<String> {
        with_retry(&self.retry, self.pause.as_ref(), move || self.get_once(url)).await
    }

    pub async fn get_json(&self, url: &Url) -> Result<Value> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| ScienceError::Parse(e.to_string()))
    }

    async fn get_once(&self, url: &Url) -> Result<String> {
        let resp = self.client.get(url.clone()).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.text().await?)
    }

    /// Stream the body at `url` into `dest`, creating parent directories.
    /// A partially written file is removed on failure.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let resp = self.client.get(url).send().await?;
        let resp = check_status(resp).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let result = stream_to_file(resp, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }
}

async fn stream_to_file(resp: Response, dest: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(ScienceError::RateLimit(
            resp.url().host_str().unwrap_or("server").to_string(),
        )),
        StatusCode::NOT_FOUND => Err(ScienceError::NotFound(url)),
        _ => {
            let body = resp.text().await.unwrap_or_default();
            Err(ScienceError::ApiError(
                url,
                format!("HTTP {}: {}", status.as_u16(), body.trim()),
            ))
        }
    }
}

//! Plain-HTTP fetcher for enrichment passes
//!
//! Enrichment never needs a rendered DOM, only the server HTML, so it goes
//! through reqwest directly with a governor rate limiter in front. One
//! fetcher is shared by a whole enrichment run.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::Client;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use async_trait::async_trait;

use crate::infrastructure::config::EnrichmentPolicy;
use crate::infrastructure::{HarvestError, HarvestResult};

/// Minimal fetch capability the enricher consumes. Kept as a trait so the
/// enrichment pass can run against canned bodies in tests.
#[async_trait]
pub trait TextFetch: Send + Sync {
    async fn get_text(&self, url: &str, cancel: &CancellationToken) -> HarvestResult<String>;
}

pub struct HttpFetcher {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl HttpFetcher {
    pub fn new(policy: &EnrichmentPolicy, user_agent: &str) -> HarvestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(policy.request_timeout_ms))
            .user_agent(user_agent)
            .cookie_store(true)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(HarvestError::Http)?;

        let quota = Quota::per_second(
            NonZeroU32::new(policy.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN),
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            max_retries: policy.max_retries,
            retry_delay_ms: policy.retry_delay_ms,
        })
    }

    /// Fetch with bounded retry. Attempt N sleeps `N × retry_delay_ms`
    /// first; cancellation cuts both the sleep and the request short.
    async fn fetch_body(&self, url: &str, cancel: &CancellationToken) -> HarvestResult<String> {
        if cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }

        let mut last_err = HarvestError::navigation(url, "no fetch attempted");
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(u64::from(attempt) * self.retry_delay_ms);
                tokio::select! {
                    _ = sleep(backoff) => {}
                    _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
                }
            }
            match self.try_fetch(url, cancel).await {
                Ok(body) => return Ok(body),
                Err(HarvestError::Cancelled) => return Err(HarvestError::Cancelled),
                Err(e) => {
                    debug!("Fetch attempt {} for {} failed: {}", attempt + 1, url, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    async fn try_fetch(&self, url: &str, cancel: &CancellationToken) -> HarvestResult<String> {
        tokio::select! {
            _ = self.rate_limiter.until_ready() => {}
            _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
        }

        let response = tokio::select! {
            result = self.client.get(url).send() => result.map_err(HarvestError::Http)?,
            _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
        };

        if !response.status().is_success() {
            return Err(HarvestError::navigation(url, format!("HTTP status {}", response.status())));
        }

        let body = tokio::select! {
            result = response.text() => result.map_err(HarvestError::Http)?,
            _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
        };

        debug!("Fetched {} ({} chars)", url, body.len());
        Ok(body)
    }
}

#[async_trait]
impl TextFetch for HttpFetcher {
    /// Fetch a page body with bounded retry, honoring the rate limiter and
    /// the harvest's cancellation token at every await point.
    async fn get_text(&self, url: &str, cancel: &CancellationToken) -> HarvestResult<String> {
        self.fetch_body(url, cancel).await
    }
}

//! Rendering-proxy backend
//!
//! Fetches server-rendered HTML through a third-party rendering proxy.
//! No live DOM exists on our side, so `evaluate` is unsupported and the
//! engines fall back to snapshot-only heuristics. This is the backend of
//! last resort for deployments that cannot run a browser at all.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;
use tracing::info;

use crate::infrastructure::backend::{PageFetchBackend, PageSession};
use crate::infrastructure::config::{BackendConfig, BackendKind};
use crate::infrastructure::{HarvestError, HarvestResult};

pub struct ProxyBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ProxyBackend {
    pub fn new(config: &BackendConfig) -> HarvestResult<Self> {
        let endpoint = config.proxy_endpoint.clone().ok_or_else(|| {
            HarvestError::Config("proxy_endpoint is required for the proxy backend".to_string())
        })?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.nav_timeout_ms))
            .gzip(true)
            .build()
            .map_err(|e| HarvestError::backend_init(format!("Proxy client build failed: {e}")))?;

        info!("Using rendering proxy at {}", endpoint);
        Ok(Self { client, endpoint, api_key: config.proxy_api_key.clone() })
    }
}

#[async_trait]
impl PageFetchBackend for ProxyBackend {
    async fn open_session(&self) -> HarvestResult<Box<dyn PageSession>> {
        Ok(Box::new(ProxySession {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            html: None,
            url: None,
        }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::ProxyFetch
    }

    async fn shutdown(&self) {}
}

pub struct ProxySession {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    html: Option<String>,
    url: Option<String>,
}

#[async_trait]
impl PageSession for ProxySession {
    async fn navigate(&mut self, url: &str) -> HarvestResult<()> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url), ("render", "true")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HarvestError::navigation(url, e.to_string()))?;
        if !response.status().is_success() {
            return Err(HarvestError::navigation(url, format!("proxy returned {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| HarvestError::navigation(url, e.to_string()))?;
        self.html = Some(body);
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn content(&mut self) -> HarvestResult<String> {
        self.html
            .clone()
            .ok_or_else(|| HarvestError::Snapshot("no page loaded yet".to_string()))
    }

    async fn evaluate(&mut self, _script: &str) -> HarvestResult<Value> {
        Err(HarvestError::InteractionUnsupported)
    }

    async fn current_url(&mut self) -> HarvestResult<Option<String>> {
        Ok(self.url.clone())
    }

    async fn wait(&mut self, ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }

    async fn close(&mut self) -> HarvestResult<()> {
        self.html = None;
        self.url = None;
        Ok(())
    }

    fn supports_interaction(&self) -> bool {
        false
    }
}

//! Page-fetch backend abstraction
//!
//! The engine is written once against these traits. Three adapters satisfy
//! them: a locally launched headless Chromium, a remote Chromium reached
//! over a CDP websocket, and a rendering proxy that returns plain HTML.
//! Only the adapters know which one is in play; the crawl logic asks for
//! capabilities, not implementations.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::infrastructure::config::{BackendConfig, BackendKind};
use crate::infrastructure::{HarvestError, HarvestResult};

/// One loaded-page handle. Sessions are serially reused: navigate, inspect,
/// navigate again. Dropping a session without `close` leaks the underlying
/// page until the backend shuts down.
#[async_trait]
pub trait PageSession: Send {
    /// Load a URL and wait for the document to settle.
    async fn navigate(&mut self, url: &str) -> HarvestResult<()>;

    /// Serialized HTML of the current document.
    async fn content(&mut self) -> HarvestResult<String>;

    /// Run a script in page context and return its JSON value.
    ///
    /// Non-interactive backends return [`HarvestError::InteractionUnsupported`];
    /// callers gate script-driven loops on [`supports_interaction`].
    ///
    /// [`supports_interaction`]: PageSession::supports_interaction
    async fn evaluate(&mut self, script: &str) -> HarvestResult<Value>;

    /// URL the session currently points at, after redirects.
    async fn current_url(&mut self) -> HarvestResult<Option<String>>;

    /// Timed pause; a suspension point, never a busy wait.
    async fn wait(&mut self, ms: u64);

    /// Release the underlying page. Idempotent.
    async fn close(&mut self) -> HarvestResult<()>;

    /// Whether `evaluate` can mutate the page (scroll, click).
    fn supports_interaction(&self) -> bool;
}

/// Factory for page sessions. One backend instance serves a whole harvest;
/// worker slots each open their own session.
#[async_trait]
pub trait PageFetchBackend: Send + Sync {
    async fn open_session(&self) -> HarvestResult<Box<dyn PageSession>>;

    fn kind(&self) -> BackendKind;

    /// Tear down shared resources (browser process, websocket).
    async fn shutdown(&self);
}

/// Resolution base for a session's current page. Redirects are common on
/// catalog sites, so the session's own URL wins over the task URL when it
/// parses.
pub(crate) async fn page_base(session: &mut Box<dyn PageSession>, fallback: &url::Url) -> url::Url {
    if let Ok(Some(current)) = session.current_url().await {
        if let Ok(parsed) = url::Url::parse(&current) {
            return parsed;
        }
    }
    fallback.clone()
}

/// Build the backend selected by configuration.
///
/// Failures here are the only fatal errors of a harvest: without a working
/// backend there is nothing to do, so the caller receives the error instead
/// of an empty result.
pub async fn create_backend(config: &BackendConfig) -> HarvestResult<Arc<dyn PageFetchBackend>> {
    match config.kind {
        BackendKind::LocalBrowser => {
            let backend = super::browser_backend::BrowserBackend::launch(config).await?;
            Ok(Arc::new(backend))
        }
        BackendKind::CloudBrowser => {
            let ws_url = config.cloud_ws_url.as_deref().ok_or_else(|| {
                HarvestError::Config("cloud_ws_url is required for the cloud browser backend".to_string())
            })?;
            let backend = super::browser_backend::BrowserBackend::connect(config, ws_url).await?;
            Ok(Arc::new(backend))
        }
        BackendKind::ProxyFetch => {
            let backend = super::proxy_backend::ProxyBackend::new(config)?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cloud_backend_without_ws_url_is_a_config_error() {
        let config = BackendConfig { kind: BackendKind::CloudBrowser, ..BackendConfig::default() };
        let err = create_backend(&config).await.err().unwrap();
        assert!(matches!(err, HarvestError::Config(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn proxy_backend_without_endpoint_is_a_config_error() {
        let config = BackendConfig { kind: BackendKind::ProxyFetch, ..BackendConfig::default() };
        let err = create_backend(&config).await.err().unwrap();
        assert!(matches!(err, HarvestError::Config(_)));
    }
}

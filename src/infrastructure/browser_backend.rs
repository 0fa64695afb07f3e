//! Headless Chromium backend
//!
//! One adapter covers both browser-driven modes: a locally launched
//! Chromium and a remote Chromium reached over its CDP websocket. Past the
//! construction path they are the same thing, a [`chromiumoxide::Browser`]
//! handing out pages.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::infrastructure::backend::{PageFetchBackend, PageSession};
use crate::infrastructure::config::{BackendConfig, BackendKind};
use crate::infrastructure::{HarvestError, HarvestResult};

pub struct BrowserBackend {
    browser: Mutex<Option<Browser>>,
    kind: BackendKind,
    config: BackendConfig,
}

impl BrowserBackend {
    /// Launch a local headless Chromium.
    pub async fn launch(config: &BackendConfig) -> HarvestResult<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", config.user_agent))
            .window_size(1920, 1080);
        for arg in &config.extra_chrome_args {
            builder = builder.arg(arg);
        }

        let browser_cfg = builder
            .build()
            .map_err(|e| HarvestError::backend_init(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_cfg)
            .await
            .map_err(|e| HarvestError::backend_init(format!("Browser launch failed: {e}")))?;

        // Drain CDP events for the lifetime of the browser.
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        info!("Launched local headless browser");
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            kind: BackendKind::LocalBrowser,
            config: config.clone(),
        })
    }

    /// Attach to a remote Chromium over its CDP websocket. The remote
    /// service owns process lifecycle and user agent; we only drive pages.
    pub async fn connect(config: &BackendConfig, ws_url: &str) -> HarvestResult<Self> {
        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| HarvestError::backend_init(format!("Browser connect failed: {e}")))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        info!("Connected to remote browser");
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            kind: BackendKind::CloudBrowser,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl PageFetchBackend for BrowserBackend {
    async fn open_session(&self) -> HarvestResult<Box<dyn PageSession>> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| HarvestError::backend_init("Browser already shut down".to_string()))?;

        let page = timeout(
            Duration::from_millis(self.config.nav_timeout_ms),
            browser.new_page("about:blank"),
        )
        .await
        .map_err(|_| HarvestError::timeout("opening a page", self.config.nav_timeout_ms))?
        .map_err(|e| HarvestError::backend_init(format!("Failed to open page: {e}")))?;

        Ok(Box::new(BrowserSession {
            page: Some(page),
            nav_timeout: Duration::from_millis(self.config.nav_timeout_ms),
            eval_timeout: Duration::from_millis(self.config.eval_timeout_ms),
            settle: Duration::from_millis(self.config.settle_ms),
        }))
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn shutdown(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Browser close error");
            }
        }
    }
}

pub struct BrowserSession {
    page: Option<Page>,
    nav_timeout: Duration,
    eval_timeout: Duration,
    settle: Duration,
}

impl BrowserSession {
    fn page(&self) -> HarvestResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| HarvestError::Snapshot("session is closed".to_string()))
    }
}

#[async_trait]
impl PageSession for BrowserSession {
    async fn navigate(&mut self, url: &str) -> HarvestResult<()> {
        let page = self.page()?;

        timeout(self.nav_timeout, page.goto(url))
            .await
            .map_err(|_| HarvestError::timeout("navigation", self.nav_timeout.as_millis() as u64))?
            .map_err(|e| HarvestError::navigation(url, e.to_string()))?;

        // Best-effort: some sites never fire the load event.
        let _ = timeout(self.nav_timeout, page.wait_for_navigation()).await;

        if !self.settle.is_zero() {
            sleep(self.settle).await;
        }
        Ok(())
    }

    async fn content(&mut self) -> HarvestResult<String> {
        let page = self.page()?;
        timeout(self.nav_timeout, page.content())
            .await
            .map_err(|_| HarvestError::timeout("content snapshot", self.nav_timeout.as_millis() as u64))?
            .map_err(|e| HarvestError::Snapshot(format!("Failed to get content: {e}")))
    }

    async fn evaluate(&mut self, script: &str) -> HarvestResult<Value> {
        let page = self.page()?;
        let result = timeout(self.eval_timeout, page.evaluate(script))
            .await
            .map_err(|_| HarvestError::timeout("script evaluation", self.eval_timeout.as_millis() as u64))?
            .map_err(|e| HarvestError::Evaluation(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn current_url(&mut self) -> HarvestResult<Option<String>> {
        let page = self.page()?;
        page.url()
            .await
            .map_err(|e| HarvestError::Evaluation(format!("Failed to read page URL: {e}")))
    }

    async fn wait(&mut self, ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }

    async fn close(&mut self) -> HarvestResult<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Page close error (tab leak)");
            }
        }
        Ok(())
    }

    fn supports_interaction(&self) -> bool {
        true
    }
}

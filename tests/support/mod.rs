//! In-memory page-fetch backend for pipeline tests.
//!
//! Serves canned HTML by exact URL, records every navigation and script
//! evaluation, and optionally plays back scripted evaluation results so
//! scroll loops can be exercised without a browser.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use catalog_harvester::infrastructure::backend::{PageFetchBackend, PageSession};
use catalog_harvester::infrastructure::config::BackendKind;
use catalog_harvester::infrastructure::{HarvestError, HarvestResult};

#[derive(Default)]
struct FixtureState {
    pages: HashMap<String, String>,
    fetch_log: Mutex<Vec<String>>,
    evaluate_log: Mutex<Vec<String>>,
    script_values: Mutex<VecDeque<Value>>,
}

pub struct FixtureBackend {
    state: Arc<FixtureState>,
    interactive: bool,
}

impl FixtureBackend {
    pub fn new(interactive: bool) -> Self {
        Self {
            state: Arc::new(FixtureState::default()),
            interactive,
        }
    }

    /// Register a page. Only exact URL matches are served.
    pub fn page(mut self, url: &str, html: &str) -> Self {
        let state = Arc::get_mut(&mut self.state).expect("register pages before opening sessions");
        state.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Queue results returned by successive `evaluate` calls. Once the
    /// queue is empty, `Null` is returned.
    pub fn script_values(self, values: Vec<Value>) -> Self {
        self.state.script_values.lock().unwrap().extend(values);
        self
    }

    pub fn fetch_log(&self) -> Vec<String> {
        self.state.fetch_log.lock().unwrap().clone()
    }

    pub fn fetches_of(&self, url: &str) -> usize {
        self.state.fetch_log.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn evaluate_calls(&self) -> usize {
        self.state.evaluate_log.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetchBackend for FixtureBackend {
    async fn open_session(&self) -> HarvestResult<Box<dyn PageSession>> {
        Ok(Box::new(FixtureSession {
            state: Arc::clone(&self.state),
            interactive: self.interactive,
            current: None,
        }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::LocalBrowser
    }

    async fn shutdown(&self) {}
}

struct FixtureSession {
    state: Arc<FixtureState>,
    interactive: bool,
    current: Option<String>,
}

#[async_trait]
impl PageSession for FixtureSession {
    async fn navigate(&mut self, url: &str) -> HarvestResult<()> {
        self.state.fetch_log.lock().unwrap().push(url.to_string());
        if self.state.pages.contains_key(url) {
            self.current = Some(url.to_string());
            Ok(())
        } else {
            self.current = None;
            Err(HarvestError::navigation(url, "no fixture page"))
        }
    }

    async fn content(&mut self) -> HarvestResult<String> {
        let current = self
            .current
            .as_ref()
            .ok_or_else(|| HarvestError::Snapshot("no page loaded".to_string()))?;
        self.state
            .pages
            .get(current)
            .cloned()
            .ok_or_else(|| HarvestError::Snapshot(format!("no fixture page for {current}")))
    }

    async fn evaluate(&mut self, script: &str) -> HarvestResult<Value> {
        if !self.interactive {
            return Err(HarvestError::InteractionUnsupported);
        }
        self.state.evaluate_log.lock().unwrap().push(script.to_string());
        Ok(self.state.script_values.lock().unwrap().pop_front().unwrap_or(Value::Null))
    }

    async fn current_url(&mut self) -> HarvestResult<Option<String>> {
        Ok(self.current.clone())
    }

    async fn wait(&mut self, _ms: u64) {}

    async fn close(&mut self) -> HarvestResult<()> {
        self.current = None;
        Ok(())
    }

    fn supports_interaction(&self) -> bool {
        self.interactive
    }
}

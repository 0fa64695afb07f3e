//! Harvest orchestration
//!
//! Routes a seed URL to the matching pipeline, owns the backend lifecycle
//! for one run, and drives the session registry for callers that prefer
//! fire-and-poll over awaiting the outcome inline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::application::progress::{ProgressChannel, ProgressSink};
use crate::domain::{HarvestOutcome, SessionRegistry};
use crate::infrastructure::HarvestResult;
use crate::infrastructure::aggregator_engine::AggregatorEngine;
use crate::infrastructure::backend::{PageFetchBackend, create_backend};
use crate::infrastructure::config::HarvesterConfig;
use crate::infrastructure::generic_engine::GenericEngine;
use crate::infrastructure::selectors::SelectorLibrary;

/// Entry point for harvest runs. One service instance serves many harvests;
/// each run opens and tears down its own backend.
pub struct HarvestService {
    config: HarvesterConfig,
    selectors: SelectorLibrary,
    registry: Arc<SessionRegistry>,
}

impl HarvestService {
    pub fn new(config: HarvesterConfig) -> Self {
        Self::with_selectors(config, SelectorLibrary::default())
    }

    pub fn with_selectors(config: HarvesterConfig, selectors: SelectorLibrary) -> Self {
        Self {
            config,
            selectors,
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Route and run one harvest to completion.
    ///
    /// Seeds on the aggregator platform get the specialized pipeline;
    /// everything else goes through the generic one. The backend is shut
    /// down before the result is returned, success or not.
    pub async fn harvest(&self, url: &str, progress: &ProgressChannel) -> HarvestResult<HarvestOutcome> {
        let backend = create_backend(&self.config.backend).await?;
        let result = self.run_routed(Arc::clone(&backend), url, progress).await;
        backend.shutdown().await;
        result
    }

    /// Run the generic pipeline regardless of the seed host.
    pub async fn harvest_generic(
        &self,
        url: &str,
        progress: &ProgressChannel,
    ) -> HarvestResult<HarvestOutcome> {
        let backend = create_backend(&self.config.backend).await?;
        let result = self.run_generic(Arc::clone(&backend), url, progress).await;
        backend.shutdown().await;
        result
    }

    /// Run the aggregator pipeline regardless of the seed host.
    pub async fn harvest_aggregator(
        &self,
        url: &str,
        progress: &ProgressChannel,
    ) -> HarvestResult<HarvestOutcome> {
        let backend = create_backend(&self.config.backend).await?;
        let result = self.run_aggregator(Arc::clone(&backend), url, progress).await;
        backend.shutdown().await;
        result
    }

    async fn run_routed(
        &self,
        backend: Arc<dyn PageFetchBackend>,
        url: &str,
        progress: &ProgressChannel,
    ) -> HarvestResult<HarvestOutcome> {
        if self.config.aggregator.matches_host(url) {
            info!("Routing {} to the aggregator pipeline", url);
            self.run_aggregator(backend, url, progress).await
        } else {
            info!("Routing {} to the generic pipeline", url);
            self.run_generic(backend, url, progress).await
        }
    }

    async fn run_generic(
        &self,
        backend: Arc<dyn PageFetchBackend>,
        url: &str,
        progress: &ProgressChannel,
    ) -> HarvestResult<HarvestOutcome> {
        GenericEngine::new(backend, &self.config, &self.selectors)?.run(url, progress).await
    }

    async fn run_aggregator(
        &self,
        backend: Arc<dyn PageFetchBackend>,
        url: &str,
        progress: &ProgressChannel,
    ) -> HarvestResult<HarvestOutcome> {
        AggregatorEngine::new(backend, &self.config, &self.selectors)?.run(url, progress).await
    }

    /// Start a harvest in the background and return its session id.
    ///
    /// Progress and the final outcome land in the registry; poll
    /// [`SessionRegistry::snapshot`] with the returned id. A cancelled run
    /// still records its partial outcome.
    pub async fn start(self: &Arc<Self>, url: &str) -> String {
        let (id, token) = self.registry.begin(url).await;

        // Progress sinks are synchronous; a channel bridges them into the
        // async registry.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink: ProgressSink = Arc::new(move |update| {
            let _ = tx.send(update);
        });
        let channel = ProgressChannel::new(Some(sink), token);

        let registry = Arc::clone(&self.registry);
        let forward_id = id.clone();
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                registry.update_progress(&forward_id, &update).await;
            }
        });

        let service = Arc::clone(self);
        let run_id = id.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            match service.harvest(&url, &channel).await {
                Ok(outcome) => service.registry.complete(&run_id, outcome).await,
                Err(e) => service.registry.fail(&run_id, &e.to_string()).await,
            }
        });

        id
    }

    /// Request cooperative cancellation of a background harvest.
    pub async fn cancel(&self, id: &str) -> bool {
        self.registry.cancel(id).await
    }
}

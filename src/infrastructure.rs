//! Infrastructure layer for page fetching, DOM heuristics, and the crawl
//! pipelines.
//!
//! Backends (local browser, remote browser, rendering proxy) live behind
//! the traits in [`backend`]; everything page-structural is split into
//! small heuristic modules the two engines compose.

pub mod aggregator_engine; // Architonic-style specialized pipeline
pub mod backend;
pub mod blocking; // block detection and adaptive back-off
pub mod browser_backend;
pub mod classifier; // repeating-container scoring
pub mod config;
pub mod dedup;
pub mod enricher; // post-harvest description enrichment
pub mod extractor;
pub mod generic_engine; // heuristic pipeline for arbitrary vendor sites
pub mod harvest_error;
pub mod http_client;
pub mod link_discovery;
pub mod logging;
pub mod proxy_backend;
pub mod selectors;

// Re-export commonly used items
pub use backend::{PageFetchBackend, PageSession, create_backend};
pub use config::{ConfigManager, HarvesterConfig};
pub use harvest_error::{HarvestError, HarvestResult};
pub use logging::{init_logging, init_logging_with_config};
pub use selectors::SelectorLibrary;

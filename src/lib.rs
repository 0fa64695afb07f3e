//! Catalog Harvester - product catalog extraction for furniture vendor sites
//!
//! Two pipelines share one backend abstraction: a generic heuristic crawler
//! for arbitrary vendor sites and a specialized crawler for the Architonic
//! aggregator platform. Output is a normalized product document set plus
//! detected brand identity.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the surface most callers need
pub use application::{HarvestService, ProgressChannel};
pub use domain::{BrandInfo, HarvestOutcome, HarvestSummary, Product, SessionRegistry};
pub use infrastructure::{HarvestError, HarvestResult, HarvesterConfig};

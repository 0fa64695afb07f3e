//! Domain module - Core data model for harvest runs
//!
//! This module contains the output data model, the crawl/progress vocabulary,
//! and the in-memory session registry the orchestration layer polls.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod events;
pub mod product;
pub mod session;

// Re-export commonly used items for convenience
pub use events::{
    CrawlPhase, CrawlTask, HarvestStatus, ProgressState, ProgressUpdate, stage_labels,
};
pub use product::{BrandInfo, HarvestOutcome, HarvestSummary, Product};
pub use session::{HarvestSession, SessionRegistry};

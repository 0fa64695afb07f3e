//! Application layer module
//!
//! Orchestration for harvest runs: pipeline routing, the progress and
//! cancellation contract, and the background-session API.

pub mod harvester;
pub mod progress;

// Re-export commonly used items for convenience
pub use harvester::HarvestService;
pub use progress::{ProgressChannel, ProgressSink};

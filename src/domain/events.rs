//! Phase and progress vocabulary shared by the engines and the session layer.

use serde::{Deserialize, Serialize};

/// Crawl phase a task belongs to.
///
/// The generic pipeline uses `Discovery` and `Category`; the
/// aggregator-specialized pipeline uses `Start`, `Collection` and `Product`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Aggregator seed page (collections view).
    Start,
    /// Generic seed page: link discovery plus best-effort homepage extraction.
    Discovery,
    /// Generic category/listing page, repeatable via pagination.
    Category,
    /// Aggregator collection page, may recurse into sub-collections.
    Collection,
    /// Aggregator product detail page.
    Product,
}

impl std::fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::Discovery => "DISCOVERY",
            Self::Category => "CATEGORY",
            Self::Collection => "COLLECTION",
            Self::Product => "PRODUCT",
        };
        write!(f, "{name}")
    }
}

/// One unit of crawl work. Created when a page yields candidate links,
/// consumed exactly once (the visited-URL set guards re-enqueues), never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
    pub phase: CrawlPhase,
    /// Brand name inherited from the page that produced this task.
    pub brand: String,
    /// Category or collection label the task was discovered under.
    pub label: String,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, phase: CrawlPhase) -> Self {
        Self {
            url: url.into(),
            phase,
            brand: String::new(),
            label: String::new(),
        }
    }

    pub fn with_context(mut self, brand: impl Into<String>, label: impl Into<String>) -> Self {
        self.brand = brand.into();
        self.label = label.into();
        self
    }
}

/// Terminal and non-terminal harvest states tracked by the session registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HarvestStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl HarvestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One progress notification pushed through the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// 0–100. Monotonic non-decreasing by convention, not enforced.
    pub percent: u8,
    /// Human-readable stage label.
    pub stage: String,
    /// Brand name once detection has something to report.
    pub detected_brand: Option<String>,
}

/// Latest progress snapshot owned by the orchestration layer. The engine
/// never stores this itself; it only pushes `ProgressUpdate`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub percent: u8,
    pub stage: String,
    pub detected_brand: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            percent: 0,
            stage: stage_labels::INITIALIZING.to_string(),
            detected_brand: None,
        }
    }
}

impl ProgressState {
    pub fn apply(&mut self, update: &ProgressUpdate) {
        self.percent = update.percent.min(100);
        self.stage = update.stage.clone();
        if update.detected_brand.is_some() {
            self.detected_brand = update.detected_brand.clone();
        }
    }
}

/// Stage strings surfaced to API consumers. Kept identical to what the
/// original service reported so existing dashboards keep working.
pub mod stage_labels {
    pub const INITIALIZING: &str = "Initializing...";
    pub const LOADING_BRAND_PAGE: &str = "Loading brand page...";
    pub const DISCOVERING: &str = "Discovering collections and products...";
    pub const EXTRACTING: &str = "Extracting products...";
    pub const ENRICHING: &str = "Enriching descriptions...";
    pub const COMPLETE: &str = "Complete!";

    pub fn processing_collection(name: &str) -> String {
        format!("Processing collection: {name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_state_keeps_last_brand() {
        let mut state = ProgressState::default();
        state.apply(&ProgressUpdate {
            percent: 15,
            stage: "Brand detected".into(),
            detected_brand: Some("Vitra".into()),
        });
        state.apply(&ProgressUpdate {
            percent: 40,
            stage: stage_labels::EXTRACTING.into(),
            detected_brand: None,
        });
        assert_eq!(state.detected_brand.as_deref(), Some("Vitra"));
        assert_eq!(state.percent, 40);
    }

    #[test]
    fn percent_is_clamped() {
        let mut state = ProgressState::default();
        state.apply(&ProgressUpdate {
            percent: 250,
            stage: "x".into(),
            detected_brand: None,
        });
        assert_eq!(state.percent, 100);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!HarvestStatus::Running.is_terminal());
        assert!(HarvestStatus::Completed.is_terminal());
        assert!(HarvestStatus::Cancelled.is_terminal());
    }
}

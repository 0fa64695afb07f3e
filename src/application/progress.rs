//! Progress reporting and cooperative cancellation
//!
//! One [`ProgressChannel`] is handed to the engine per harvest. It carries
//! both capabilities of the orchestration contract: pushing progress updates
//! out and observing cancellation requests coming in. The engine polls
//! cancellation at phase boundaries; an in-flight page load is allowed to
//! finish before the next poll notices.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::ProgressUpdate;
use crate::infrastructure::{HarvestError, HarvestResult};

/// Callback invoked for every progress update.
pub type ProgressSink = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Progress sink plus cancellation token for one harvest.
#[derive(Clone)]
pub struct ProgressChannel {
    sink: Option<ProgressSink>,
    cancel: CancellationToken,
}

impl ProgressChannel {
    pub fn new(sink: Option<ProgressSink>, cancel: CancellationToken) -> Self {
        Self { sink, cancel }
    }

    /// Channel that reports nowhere and is never cancelled externally.
    pub fn detached() -> Self {
        Self { sink: None, cancel: CancellationToken::new() }
    }

    /// Channel wrapping a plain closure, for callers without a token.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        Self { sink: Some(Arc::new(f)), cancel: CancellationToken::new() }
    }

    pub fn emit(&self, percent: u8, stage: &str) {
        self.push(ProgressUpdate { percent: percent.min(100), stage: stage.to_string(), detected_brand: None });
    }

    pub fn emit_with_brand(&self, percent: u8, stage: &str, brand: &str) {
        self.push(ProgressUpdate {
            percent: percent.min(100),
            stage: stage.to_string(),
            detected_brand: Some(brand.to_string()),
        });
    }

    fn push(&self, update: ProgressUpdate) {
        if let Some(sink) = &self.sink {
            sink(update);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Poll point used at the start of phase handlers.
    pub fn ensure_active(&self) -> HarvestResult<()> {
        if self.cancel.is_cancelled() {
            Err(HarvestError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl fmt::Debug for ProgressChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressChannel")
            .field("has_sink", &self.sink.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn detached_channel_swallows_updates() {
        let channel = ProgressChannel::detached();
        channel.emit(10, "Initializing...");
        assert!(!channel.is_cancelled());
        assert!(channel.ensure_active().is_ok());
    }

    #[test]
    fn updates_reach_the_sink_in_order() {
        let seen: Arc<Mutex<Vec<(u8, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let channel = ProgressChannel::from_fn(move |u| {
            sink_seen.lock().unwrap().push((u.percent, u.stage));
        });

        channel.emit(5, "Initializing...");
        channel.emit_with_brand(20, "Discovering collections and products...", "Vitra");
        channel.emit(130, "overflow is clamped");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (5, "Initializing...".to_string()));
        assert_eq!(seen[1].0, 20);
        assert_eq!(seen[2].0, 100);
    }

    #[test]
    fn cancellation_flips_ensure_active() {
        let token = CancellationToken::new();
        let channel = ProgressChannel::new(None, token.clone());
        assert!(channel.ensure_active().is_ok());

        token.cancel();
        assert!(channel.is_cancelled());
        assert!(matches!(channel.ensure_active(), Err(HarvestError::Cancelled)));
    }
}

//! In-memory harvest session state.
//!
//! The engine itself never persists anything; this registry is the piece the
//! orchestration layer polls for progress and uses to request cancellation.
//! One registry instance serves many concurrent harvests.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::events::{HarvestStatus, ProgressState, ProgressUpdate};
use crate::domain::product::HarvestOutcome;

/// Snapshot of one harvest as seen by API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestSession {
    pub id: String,
    pub url: String,
    pub status: HarvestStatus,
    pub progress: ProgressState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<HarvestOutcome>,
}

impl HarvestSession {
    fn new(url: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            status: HarvestStatus::Running,
            progress: ProgressState::default(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            outcome: None,
        }
    }

    /// Persisted-artifact document for a completed session, mirroring
    /// `{id, brandInfo, products, productCount, completedAt, sourceUrl}`.
    pub fn to_document(&self) -> Option<serde_json::Value> {
        let outcome = self.outcome.as_ref()?;
        let completed_at = self.completed_at.unwrap_or_else(Utc::now);
        Some(outcome.to_document(&self.id, &self.url, completed_at))
    }
}

/// Thread-safe registry of live and finished harvests.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, HarvestSession>>>,
    tokens: Arc<RwLock<HashMap<String, CancellationToken>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running harvest. Returns the session id and the
    /// cancellation token the harvest should poll.
    pub async fn begin(&self, url: &str) -> (String, CancellationToken) {
        let session = HarvestSession::new(url);
        let id = session.id.clone();
        let token = CancellationToken::new();

        self.sessions.write().await.insert(id.clone(), session);
        self.tokens.write().await.insert(id.clone(), token.clone());

        tracing::info!(session_id = %id, url, "harvest session started");
        (id, token)
    }

    pub async fn snapshot(&self, id: &str) -> Option<HarvestSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Apply a progress update to a running session. Updates against
    /// terminal sessions are ignored.
    pub async fn update_progress(&self, id: &str, update: &ProgressUpdate) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(id) {
            if session.status == HarvestStatus::Running {
                session.progress.apply(update);
            }
        }
    }

    pub async fn complete(&self, id: &str, outcome: HarvestOutcome) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(id) {
            // A cancel that raced completion keeps its cancelled status and
            // timestamp; the partial outcome is still recorded.
            if session.status == HarvestStatus::Running {
                session.status = HarvestStatus::Completed;
                session.progress.percent = 100;
            }
            session.completed_at.get_or_insert_with(Utc::now);
            session.outcome = Some(outcome);
            tracing::info!(session_id = %id, status = ?session.status, "harvest session finished");
        }
        drop(sessions);
        self.tokens.write().await.remove(id);
    }

    pub async fn fail(&self, id: &str, error: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(id) {
            // A cancel that raced the failure keeps its cancelled status.
            if session.status == HarvestStatus::Running {
                session.status = HarvestStatus::Failed;
                session.completed_at = Some(Utc::now());
                session.error = Some(error.to_string());
                tracing::warn!(session_id = %id, error, "harvest session failed");
            }
        }
        drop(sessions);
        self.tokens.write().await.remove(id);
    }

    /// Mark a session cancelled and fire its token. The harvest observes the
    /// token at its next poll point; cancellation is cooperative.
    pub async fn cancel(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };
        if session.status.is_terminal() {
            return false;
        }
        session.status = HarvestStatus::Cancelled;
        session.completed_at = Some(Utc::now());
        drop(sessions);

        if let Some(token) = self.tokens.read().await.get(id) {
            token.cancel();
        }
        tracing::info!(session_id = %id, "harvest session cancelled");
        true
    }

    pub async fn remove(&self, id: &str) -> Option<HarvestSession> {
        self.tokens.write().await.remove(id);
        self.sessions.write().await.remove(id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.status == HarvestStatus::Running)
            .count()
    }
}

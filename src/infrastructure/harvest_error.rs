//! Error types for harvest operations.
//!
//! Only fatal initialization failures are meant to escape a harvest; every
//! other variant is absorbed along the way into lower product counts and the
//! run summary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("backend initialization failed: {message}")]
    BackendInit { message: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    #[error("page snapshot failed: {0}")]
    Snapshot(String),

    #[error("this backend cannot run page interactions")]
    InteractionUnsupported,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid CSS selector '{0}'")]
    Selector(String),

    #[error("{what} timed out after {ms}ms")]
    Timeout { what: String, ms: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("harvest cancelled")]
    Cancelled,
}

impl HarvestError {
    pub fn backend_init(message: impl Into<String>) -> Self {
        Self::BackendInit {
            message: message.into(),
        }
    }

    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(what: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            ms,
        }
    }

    /// Fatal errors abort the whole harvest; everything else is logged and
    /// absorbed by the calling phase.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BackendInit { .. } | Self::Config(_))
    }
}

pub type HarvestResult<T> = Result<T, HarvestError>;

//! Error types for scraping, persistence and pipeline stages.
//!
//! Errors are split by the layer that recovers them:
//! - [`ScrapeError`]: raised by sessions and adapters, recovered per candidate
//!   inside an adapter or per source inside the orchestrator
//! - [`PersistError`]: raised by the seen-URL store writer, logged and swallowed
//! - [`StageError`]: raised by a pipeline stage, fatal to the run

use std::time::Duration;
use thiserror::Error;

/// Failure while navigating or extracting from a source.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} did not load within {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("no candidate articles found on {url}")]
    NoCandidates { url: String },

    #[error("no content matched `{selector}` on {url}")]
    MissingContent { url: String, selector: String },

    #[error("no adapter registered for {0}")]
    NoAdapterFound(String),

    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("browsing session is closed")]
    SessionClosed,

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while writing the seen-URL ledger.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single pipeline stage. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("precondition not met: {0}")]
    Precondition(String),

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("unusable model response: {0}")]
    InvalidResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} rejected the request with HTTP {status}: {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session error: {0}")]
    Session(#[from] ScrapeError),
}

//! Error taxonomy for the pipeline.
//!
//! The split mirrors the control-flow rules: [`EnumerationError`] is fatal and
//! aborts a run before any item is dispatched, while [`ProcessingError`] and
//! [`StorageError`] are contained inside the dispatch loop and become a
//! single item's failure outcome. [`RateLimitExceeded`] can only occur when a
//! maximum permit wait is configured.

use std::time::Duration;

use thiserror::Error;

/// Candidate enumeration failed. There is nothing to process, so the run
/// stops here and surfaces the cause to the operator.
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The catalog service answered with a non-success HTTP status.
    #[error("catalog query failed with status {status}")]
    Status { status: u16 },

    /// The catalog answered but the body could not be decoded.
    #[error("malformed catalog response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Underlying network failure (DNS, connection refused, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Writing the catalog index next to the outputs failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single item could not be processed. Never aborts the batch.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The remote service rejected the item.
    #[error("remote returned status {status}: {detail}")]
    RemoteStatus { status: u16, detail: String },

    /// Underlying network failure for this item only.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Persisting an artifact failed. Treated exactly like a processing failure:
/// recorded against the item, logged, and the loop continues.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// No permit became available within the configured maximum wait.
#[derive(Debug, Error)]
#[error("no rate-limiter permit within {max_wait:?}")]
pub struct RateLimitExceeded {
    pub max_wait: Duration,
}

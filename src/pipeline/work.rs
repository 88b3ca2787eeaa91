//! Data model for one batch run: work items, outcomes, and the summary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of work. The `id` is the idempotency key: two items with the same
/// id are the same unit of work. The `locator` carries whatever the processor
/// needs to act (a remote key, a file path); for article downloads both are
/// the DOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub locator: String,
}

impl WorkItem {
    /// Item whose locator is its identity (the common case).
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let locator = id.clone();
        Self { id, locator }
    }

    pub fn with_locator(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
        }
    }
}

/// What a processor produces for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Bytes(Vec<u8>),
    Text(String),
}

impl Artifact {
    pub fn len(&self) -> usize {
        match self {
            Artifact::Bytes(b) => b.len(),
            Artifact::Text(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Artifact::Bytes(b) => b,
            Artifact::Text(t) => t.into_bytes(),
        }
    }
}

/// Terminal status of one item within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Success,
    Failure,
    Skipped,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "success"),
            OutcomeStatus::Failure => write!(f, "failure"),
            OutcomeStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Append-only record of one item's fate. Produced exactly once per
/// dispatched item; skips are recorded without dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub item_id: String,
    pub status: OutcomeStatus,
    /// Where the artifact landed, when the item succeeded.
    pub artifact_ref: Option<String>,
    /// Enough context for a manual rerun, when the item failed.
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingOutcome {
    pub fn success(item_id: impl Into<String>, artifact_ref: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Success,
            artifact_ref: Some(artifact_ref.into()),
            error_detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(item_id: impl Into<String>, error_detail: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Failure,
            artifact_ref: None,
            error_detail: Some(error_detail.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn skipped(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Skipped,
            artifact_ref: None,
            error_detail: None,
            timestamp: Utc::now(),
        }
    }
}

/// Counts folded over a run's outcomes. For a run that was not cancelled,
/// `success + failure + skipped` equals the number of candidate items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
}

impl BatchSummary {
    pub fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Success => self.success_count += 1,
            OutcomeStatus::Failure => self.failure_count += 1,
            OutcomeStatus::Skipped => self.skipped_count += 1,
        }
    }

    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a ProcessingOutcome>,
    {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome.status);
        }
        summary
    }

    pub fn merge(&mut self, other: BatchSummary) {
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.skipped_count += other.skipped_count;
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count + self.skipped_count
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.success_count, self.skipped_count, self.failure_count
        )
    }
}

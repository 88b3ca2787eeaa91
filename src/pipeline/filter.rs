//! Skips work whose output already exists, making reruns idempotent.
//!
//! The caller injects a deterministic naming function from item identity to
//! the expected output location; existence of that location is the sole
//! completeness signal. Stricter checks (non-empty, well-formed) belong in
//! the naming function's caller, not here.

use std::path::PathBuf;

use super::work::{ProcessingOutcome, WorkItem};

type NamingFn = Box<dyn Fn(&WorkItem) -> PathBuf + Send + Sync>;

pub struct CompletionFilter {
    naming: NamingFn,
}

impl CompletionFilter {
    pub fn new(naming: impl Fn(&WorkItem) -> PathBuf + Send + Sync + 'static) -> Self {
        Self {
            naming: Box::new(naming),
        }
    }

    /// Where the item's output is expected to land.
    pub fn expected_output(&self, item: &WorkItem) -> PathBuf {
        (self.naming)(item)
    }

    /// Query-only: true when an equivalent output already exists.
    pub fn is_complete(&self, item: &WorkItem) -> bool {
        self.expected_output(item).exists()
    }

    /// Split candidates, preserving input order, into items still pending
    /// and `Skipped` outcomes for those already complete. Applied once, before
    /// anything is enqueued.
    pub fn partition(&self, candidates: Vec<WorkItem>) -> (Vec<WorkItem>, Vec<ProcessingOutcome>) {
        let mut pending = Vec::new();
        let mut skipped = Vec::new();
        for item in candidates {
            if self.is_complete(&item) {
                skipped.push(ProcessingOutcome::skipped(&item.id));
            } else {
                pending.push(item);
            }
        }
        (pending, skipped)
    }
}

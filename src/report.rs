//! Outcome reporting — tallies, terminal progress, and the final summary.
//!
//! Everything here observes the outcome stream through
//! [`OutcomeObserver`]; the dispatch loop never talks to a progress bar or a
//! logger directly. Uses `indicatif` for the progress bar and `console` for
//! colored output.

use std::sync::{Mutex, PoisonError};

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::pipeline::{BatchSummary, OutcomeObserver, OutcomeStatus, ProcessingOutcome};

/// Folds the outcome stream into running counts.
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: Mutex<BatchSummary>,
}

impl Aggregator {
    pub fn summary(&self) -> BatchSummary {
        *self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutcomeObserver for Aggregator {
    fn on_outcome(&self, outcome: &ProcessingOutcome) {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(outcome.status);
    }
}

/// Writes one log line per outcome so every failure is discoverable in the
/// audit trail with enough context for a manual rerun.
pub struct LogObserver;

impl OutcomeObserver for LogObserver {
    fn on_batch_start(&self, pending: usize) {
        info!(pending, "starting dispatch");
    }

    fn on_outcome(&self, outcome: &ProcessingOutcome) {
        match outcome.status {
            OutcomeStatus::Success => {
                info!(
                    item = %outcome.item_id,
                    artifact = outcome.artifact_ref.as_deref().unwrap_or(""),
                    "processed"
                );
            }
            OutcomeStatus::Failure => {
                error!(
                    item = %outcome.item_id,
                    detail = outcome.error_detail.as_deref().unwrap_or("unknown"),
                    "failed"
                );
            }
            OutcomeStatus::Skipped => {
                info!(item = %outcome.item_id, "skipped, output already exists");
            }
        }
    }
}

/// Terminal progress bar over the pending items, advanced per dispatched
/// outcome. Skips are decided before dispatch and don't move the bar.
pub struct BatchProgress {
    pb: ProgressBar,
}

impl BatchProgress {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("invalid template"),
        );
        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeObserver for BatchProgress {
    fn on_batch_start(&self, pending: usize) {
        self.pb.set_length(pending as u64);
    }

    fn on_outcome(&self, outcome: &ProcessingOutcome) {
        if outcome.status != OutcomeStatus::Skipped {
            self.pb.inc(1);
        }
    }
}

/// Print the final human-readable summary. A non-zero failure count is a
/// reportable condition, not a crash; the run still completed.
pub fn print_summary(summary: &BatchSummary) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow();

    println!(
        "  {} {} succeeded, {} skipped, {} failed",
        green.apply_to("✓"),
        summary.success_count,
        yellow.apply_to(summary.skipped_count),
        red.apply_to(summary.failure_count),
    );
    info!(
        success = summary.success_count,
        skipped = summary.skipped_count,
        failed = summary.failure_count,
        "run complete"
    );
}

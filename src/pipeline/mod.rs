//! The rate-limited batch pipeline.
//!
//! Control flow for one run: the source enumerates candidates (fatal on
//! failure), the completion filter prunes items whose output already exists,
//! the dispatcher drains the survivors under the shared rate limiter, and
//! the outcomes fold into a [`BatchSummary`].

pub mod dispatcher;
pub mod filter;
pub mod limiter;
pub mod queue;
pub mod work;

pub use dispatcher::{CancelToken, Dispatcher, OutcomeObserver, Processor, ResultSink, Source};
pub use filter::CompletionFilter;
pub use limiter::{LimiterPolicy, RateLimiter};
pub use queue::WorkQueue;
pub use work::{Artifact, BatchSummary, OutcomeStatus, ProcessingOutcome, WorkItem};

use std::sync::Arc;

use tracing::info;

use crate::error::EnumerationError;

/// Run one batch end to end.
///
/// Enumeration failure aborts the run before any dispatch — there is nothing
/// to process. Everything after that point is per-item and isolated: the
/// returned summary always accounts for every candidate (skipped, succeeded,
/// or failed) unless the run was cancelled mid-flight.
pub async fn run_batch<Src, P, S>(
    source: &Src,
    filter: &CompletionFilter,
    dispatcher: &Dispatcher,
    processor: Arc<P>,
    sink: Arc<S>,
) -> Result<BatchSummary, EnumerationError>
where
    Src: Source,
    P: Processor + 'static,
    S: ResultSink + 'static,
{
    let candidates = source.enumerate().await?;
    info!(candidates = candidates.len(), "enumeration complete");

    let (pending, skipped) = filter.partition(candidates);
    let mut summary = BatchSummary::default();
    for outcome in &skipped {
        dispatcher.notify(outcome);
        summary.record(outcome.status);
    }

    let dispatched = dispatcher.run(pending, processor, sink).await;
    summary.merge(dispatched);
    Ok(summary)
}

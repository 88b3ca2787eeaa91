//! The dispatch engine: drains the work queue under rate-limiter control.
//!
//! One worker (the plain sequential case) or a small bounded pool share a
//! single queue and a single limiter. Every item gets exactly one
//! [`ProcessingOutcome`]; a per-item failure is converted into a `Failure`
//! outcome and never crosses the loop boundary. Outcome order matches
//! enqueue order only when a single worker runs.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{error, info, warn};

use super::limiter::RateLimiter;
use super::queue::WorkQueue;
use super::work::{Artifact, BatchSummary, ProcessingOutcome, WorkItem};
use crate::error::{EnumerationError, ProcessingError, StorageError};

/// Enumerates the run's candidate items. A failure here is fatal: the run
/// aborts before anything is dispatched.
pub trait Source {
    fn enumerate(&self) -> impl Future<Output = Result<Vec<WorkItem>, EnumerationError>> + Send;
}

/// The injected capability performing the actual external call per item.
/// Must signal per-item problems through its error, never by panicking.
pub trait Processor: Send + Sync {
    fn process(
        &self,
        item: &WorkItem,
    ) -> impl Future<Output = Result<Artifact, ProcessingError>> + Send;
}

/// Persists one artifact and returns a reference to where it landed.
/// Assumed append-only per distinct item id, so concurrent stores for
/// different items never collide.
pub trait ResultSink: Send + Sync {
    fn store(
        &self,
        item: &WorkItem,
        artifact: Artifact,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;
}

/// Observes the outcome stream. Logging and progress reporting hang off this
/// so the dispatch loop itself stays free of presentation concerns.
pub trait OutcomeObserver: Send + Sync {
    /// Called once before dispatch with the number of pending items.
    fn on_batch_start(&self, _pending: usize) {}

    fn on_outcome(&self, outcome: &ProcessingOutcome);
}

/// Cooperative cancellation signal shared between the operator-facing side
/// and the workers. Takes effect at the next suspension point: in-flight
/// processor calls finish, but no new permits are acquired and no new items
/// are dequeued.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow_and_update() {
            return;
        }
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a batch of items through the processor under the shared limiter.
pub struct Dispatcher {
    limiter: Arc<RateLimiter>,
    worker_count: usize,
    observers: Vec<Arc<dyn OutcomeObserver>>,
    cancel: CancelToken,
}

impl Dispatcher {
    pub fn new(limiter: Arc<RateLimiter>, worker_count: usize) -> Self {
        Self {
            limiter,
            worker_count: worker_count.max(1),
            observers: Vec::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn OutcomeObserver>) {
        self.observers.push(observer);
    }

    /// Handle for cancelling the run from outside (e.g. an interrupt handler).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Surface an outcome produced outside the dispatch loop (skips) to the
    /// same observers that see dispatched outcomes.
    pub fn notify(&self, outcome: &ProcessingOutcome) {
        for observer in &self.observers {
            observer.on_outcome(outcome);
        }
    }

    /// Process every item and fold the outcomes into a summary.
    ///
    /// With `worker_count == 1` the worker loop runs inline; otherwise each
    /// worker is a spawned task pulling from the shared queue. Either way a
    /// single item's failure never aborts the batch.
    pub async fn run<P, S>(
        &self,
        items: Vec<WorkItem>,
        processor: Arc<P>,
        sink: Arc<S>,
    ) -> BatchSummary
    where
        P: Processor + 'static,
        S: ResultSink + 'static,
    {
        let pending = items.len();
        for observer in &self.observers {
            observer.on_batch_start(pending);
        }
        info!(pending, workers = self.worker_count, "dispatching batch");

        let ctx = Arc::new(WorkerCtx {
            queue: WorkQueue::from_items(items),
            limiter: Arc::clone(&self.limiter),
            processor,
            sink,
            observers: self.observers.clone(),
            outcomes: Mutex::new(Vec::with_capacity(pending)),
            cancel: self.cancel.clone(),
        });

        if self.worker_count == 1 {
            worker(Arc::clone(&ctx)).await;
        } else {
            let mut handles = Vec::with_capacity(self.worker_count);
            for _ in 0..self.worker_count {
                handles.push(tokio::spawn(worker(Arc::clone(&ctx))));
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    error!("worker task failed: {err}");
                }
            }
        }

        let outcomes = ctx
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        BatchSummary::from_outcomes(outcomes.iter())
    }
}

struct WorkerCtx<P, S> {
    queue: WorkQueue,
    limiter: Arc<RateLimiter>,
    processor: Arc<P>,
    sink: Arc<S>,
    observers: Vec<Arc<dyn OutcomeObserver>>,
    outcomes: Mutex<Vec<ProcessingOutcome>>,
    cancel: CancelToken,
}

impl<P, S> WorkerCtx<P, S> {
    fn record(&self, outcome: ProcessingOutcome) {
        for observer in &self.observers {
            observer.on_outcome(&outcome);
        }
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
    }
}

async fn worker<P, S>(ctx: Arc<WorkerCtx<P, S>>)
where
    P: Processor,
    S: ResultSink,
{
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let Some(item) = ctx.queue.dequeue() else {
            break;
        };

        let granted = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            granted = ctx.limiter.acquire() => granted,
        };
        if let Err(err) = granted {
            warn!(item = %item.id, "{err}");
            ctx.record(ProcessingOutcome::failure(&item.id, err.to_string()));
            continue;
        }

        let outcome = dispatch_one(&ctx, &item).await;
        ctx.record(outcome);
    }
}

/// The sole point where collaborator failures surface; everything is
/// converted into an outcome here.
async fn dispatch_one<P, S>(ctx: &WorkerCtx<P, S>, item: &WorkItem) -> ProcessingOutcome
where
    P: Processor,
    S: ResultSink,
{
    match ctx.processor.process(item).await {
        Ok(artifact) => match ctx.sink.store(item, artifact).await {
            Ok(artifact_ref) => ProcessingOutcome::success(&item.id, artifact_ref),
            Err(err) => ProcessingOutcome::failure(&item.id, err.to_string()),
        },
        Err(err) => ProcessingOutcome::failure(&item.id, err.to_string()),
    }
}

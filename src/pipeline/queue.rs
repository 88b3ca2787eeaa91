//! FIFO queue of pending work, safe for concurrent dequeue.
//!
//! Owned by the dispatcher and handed to its workers; never a process-wide
//! global. `dequeue` on an exhausted queue returns `None` as the explicit
//! no-more-work signal instead of blocking.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::work::WorkItem;

#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue pre-filled in input order.
    pub fn from_items(items: Vec<WorkItem>) -> Self {
        Self {
            items: Mutex::new(items.into()),
        }
    }

    pub fn enqueue(&self, item: WorkItem) {
        self.lock().push_back(item);
    }

    /// Next item in enqueue order, or `None` once the queue is drained.
    pub fn dequeue(&self) -> Option<WorkItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_drained(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<WorkItem>> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

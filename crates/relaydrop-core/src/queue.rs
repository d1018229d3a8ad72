//! Pending-job queue drained by the worker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::job::Job;

/// FIFO of jobs waiting for dispatch. Cheap to clone; clones share the queue.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    pending: Arc<Mutex<VecDeque<Job>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, job: Job) {
        self.lock().push_back(job);
    }

    /// Removes and returns everything pending, in submission order.
    pub fn dequeue_all_pending(&self) -> Vec<Job> {
        self.lock().drain(..).collect()
    }

    /// Drops all pending jobs (used by reset).
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

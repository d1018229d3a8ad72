//! Dispatcher loop that drains the job queue onto a bounded pool of relays.
//!
//! Each wake-up (poll interval or submission signal) moves everything pending
//! into a local backlog and starts relays in submission order until
//! `max_concurrent` are in flight. The rest wait in the backlog. Finished jobs
//! are persisted before their slot is reused; a failed write is kept and
//! retried on the next pass.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::{self, JoinError, JoinSet};

use crate::config::RelayConfig;
use crate::job::{Job, JobId};
use crate::queue::JobQueue;
use crate::relay::Relay;
use crate::store::JobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Polling,
    Dispatching,
}

pub struct Worker {
    queue: JobQueue,
    store: JobStore,
    relay: Relay,
    signal: Arc<Notify>,
    max_concurrent: usize,
    poll_interval: Duration,
    backlog: VecDeque<Job>,
    running: JoinSet<Job>,
    /// Job id of each running task, read back when a relay panics.
    task_jobs: HashMap<task::Id, JobId>,
    unsaved: Vec<Job>,
    state: watch::Sender<WorkerState>,
}

impl Worker {
    pub fn new(queue: JobQueue, store: JobStore, relay: Relay, signal: Arc<Notify>) -> Self {
        let defaults = RelayConfig::default();
        Self {
            queue,
            store,
            relay,
            signal,
            max_concurrent: defaults.max_concurrent_jobs,
            poll_interval: Duration::from_secs(defaults.poll_interval_secs),
            backlog: VecDeque::new(),
            running: JoinSet::new(),
            task_jobs: HashMap::new(),
            unsaved: Vec::new(),
            state: watch::channel(WorkerState::Idle).0,
        }
    }

    /// At least one relay always runs.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Observe state transitions (e.g. for a health endpoint).
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn in_flight(&self) -> usize {
        self.running.len()
    }

    /// Process until the queue, the backlog and the pool are all empty.
    /// Returns the number of relays that ran.
    pub async fn run_until_idle(&mut self) -> u32 {
        let mut finished = 0u32;
        loop {
            self.poll_and_dispatch().await;
            if self.running.is_empty() {
                if self.backlog.is_empty() && self.queue.is_empty() {
                    break;
                }
                continue;
            }
            if let Some(res) = self.running.join_next_with_id().await {
                self.finish(res).await;
                finished += 1;
            }
        }
        self.retry_unsaved().await;
        finished
    }

    /// Process until `shutdown` resolves, then wait for in-flight relays
    /// (they cannot be cancelled) and return. Jobs still in the backlog stay
    /// `queued` in the store.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u32
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut finished = 0u32;
        loop {
            self.poll_and_dispatch().await;
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.signal.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
                Some(res) = self.running.join_next_with_id(), if !self.running.is_empty() => {
                    self.finish(res).await;
                    finished += 1;
                }
            }
        }

        tracing::info!(in_flight = self.running.len(), "worker stopping");
        while let Some(res) = self.running.join_next_with_id().await {
            self.finish(res).await;
            finished += 1;
        }
        self.retry_unsaved().await;
        finished
    }

    /// Serve loop with no shutdown.
    pub async fn run_forever(&mut self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    async fn poll_and_dispatch(&mut self) {
        self.set_state(WorkerState::Polling);
        self.backlog.extend(self.queue.dequeue_all_pending());
        self.retry_unsaved().await;

        if !self.backlog.is_empty() && self.running.len() < self.max_concurrent {
            self.set_state(WorkerState::Dispatching);
            while self.running.len() < self.max_concurrent {
                let Some(job) = self.backlog.pop_front() else {
                    break;
                };
                tracing::debug!(job_id = %job.id, "dispatching");
                let relay = self.relay.clone();
                let job_id = job.id.clone();
                let handle = self.running.spawn(async move { relay.run(job).await });
                self.task_jobs.insert(handle.id(), job_id);
            }
            if !self.backlog.is_empty() {
                tracing::debug!(waiting = self.backlog.len(), "pool saturated");
            }
        }
        self.set_state(WorkerState::Idle);
    }

    async fn finish(&mut self, res: Result<(task::Id, Job), JoinError>) {
        match res {
            Ok((id, job)) => {
                self.task_jobs.remove(&id);
                tracing::info!(job_id = %job.id, status = %job.status, "job finished");
                self.persist_terminal(job).await;
            }
            Err(e) => {
                let Some(job_id) = self.task_jobs.remove(&e.id()) else {
                    tracing::error!("relay task failed: {}", e);
                    return;
                };
                tracing::error!(job_id = %job_id, "relay task failed: {}", e);
                let failed = self
                    .store
                    .update(&job_id, |job| {
                        job.fail(format!("relay task failed: {e}"));
                    })
                    .await;
                if let Err(err) = failed {
                    tracing::warn!(job_id = %job_id, "persisting failed job failed: {:#}", err);
                }
            }
        }
    }

    async fn persist_terminal(&mut self, job: Job) {
        match self.store.put(&job).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(job_id = %job.id, "finished job was reset away"),
            Err(e) => {
                tracing::warn!(job_id = %job.id, "persisting finished job failed: {:#}", e);
                self.unsaved.push(job);
            }
        }
    }

    async fn retry_unsaved(&mut self) {
        for job in std::mem::take(&mut self.unsaved) {
            self.persist_terminal(job).await;
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }
}

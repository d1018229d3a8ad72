//! Submission and status facade used by the CLI and the HTTP API.

use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::RelayError;
use crate::job::{Job, JobStatus, StatusView};
use crate::queue::JobQueue;
use crate::source;
use crate::store::JobStore;

/// Error recorded on jobs that were mid-transfer when the process stopped.
pub const INTERRUPTED: &str = "interrupted before completion";

/// Outcome of [`Tracker::recover`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recovery {
    /// Queued jobs put back on the queue.
    pub requeued: usize,
    /// Jobs failed because their transfer was cut off.
    pub interrupted: usize,
}

#[derive(Clone)]
pub struct Tracker {
    store: JobStore,
    queue: JobQueue,
    signal: Arc<Notify>,
}

impl Tracker {
    pub fn new(store: JobStore, queue: JobQueue) -> Self {
        Self {
            store,
            queue,
            signal: Arc::new(Notify::new()),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Woken on every successful submission; hand this to the worker.
    pub fn signal(&self) -> Arc<Notify> {
        Arc::clone(&self.signal)
    }

    /// Creates one queued job per non-blank line of `urls`. Invalid input is
    /// rejected before anything is stored.
    pub async fn submit(
        &self,
        urls: &str,
        notify_email: Option<&str>,
    ) -> Result<Vec<Job>, RelayError> {
        let urls = source::parse_submission(urls)?;
        let email = match notify_email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(e) if !e.contains('@') => {
                return Err(RelayError::Validation(format!(
                    "{e}: not an email address"
                )))
            }
            other => other.map(str::to_string),
        };

        let jobs: Vec<Job> = urls
            .into_iter()
            .map(|url| Job::new(url, email.clone()))
            .collect();
        let queue = self.queue.clone();
        let created = self
            .store
            .append_all_then(jobs, |jobs| {
                for job in &jobs {
                    queue.enqueue(job.clone());
                }
                jobs
            })
            .await
            .map_err(persistence)?;

        for job in &created {
            tracing::info!(job_id = %job.id, url = %job.source_url, "job submitted");
        }
        self.signal.notify_one();
        Ok(created)
    }

    /// Polling view of one job; unknown ids report "not found".
    pub async fn status(&self, id: &str) -> Result<StatusView, RelayError> {
        let job = self.store.get(id).await.map_err(persistence)?;
        Ok(job
            .as_ref()
            .map(StatusView::from)
            .unwrap_or_else(StatusView::not_found))
    }

    /// All jobs in submission order.
    pub async fn list(&self) -> Result<Vec<Job>, RelayError> {
        self.store.load().await.map_err(persistence)
    }

    /// Drops every job, persisted and pending. Relays already running finish
    /// but their results are discarded.
    pub async fn reset(&self) -> Result<(), RelayError> {
        let queue = self.queue.clone();
        self.store
            .clear_then(|| queue.clear())
            .await
            .map_err(persistence)?;
        tracing::info!("job store reset");
        Ok(())
    }

    /// Startup pass over the store: jobs caught mid-transfer are failed (no
    /// resumable downloads), queued jobs are put back on the queue.
    pub async fn recover(&self) -> Result<Recovery, RelayError> {
        let mut interrupted = 0;
        let all = self
            .store
            .update_all(|job| {
                if matches!(job.status, JobStatus::Downloading | JobStatus::Uploading) {
                    job.fail(INTERRUPTED);
                    interrupted += 1;
                }
            })
            .await
            .map_err(persistence)?;

        let mut requeued = 0;
        for job in all.into_iter().filter(|j| j.status == JobStatus::Queued) {
            self.queue.enqueue(job);
            requeued += 1;
        }
        if requeued > 0 {
            self.signal.notify_one();
        }
        Ok(Recovery {
            requeued,
            interrupted,
        })
    }
}

fn persistence(e: anyhow::Error) -> RelayError {
    RelayError::Persistence(format!("{e:#}"))
}

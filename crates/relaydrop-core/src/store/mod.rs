//! Job persistence.
//!
//! `JobStore` wraps a backend (JSON document or SQLite) behind one
//! process-wide lock. Every read-modify-write (`append`, `update`, `put`,
//! `clear`) holds that lock for exactly one load+save pair and never across
//! network I/O. Plain `load`/`get` skip the lock; both backends make saves
//! atomic, so readers never observe a partial write.

mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{RelayConfig, StoreBackend};
use crate::job::Job;

#[derive(Clone)]
enum Backend {
    Json(JsonFileStore),
    Sqlite(SqliteStore),
}

#[derive(Clone)]
pub struct JobStore {
    backend: Backend,
    lock: Arc<Mutex<()>>,
}

impl JobStore {
    /// Open the store selected by `cfg.store_backend` at its resolved path.
    pub async fn open(cfg: &RelayConfig) -> Result<Self> {
        let path = cfg.resolved_store_path()?;
        match cfg.store_backend {
            StoreBackend::Json => Ok(Self::json_at(path)),
            StoreBackend::Sqlite => Self::sqlite_at(path).await,
        }
    }

    pub fn json_at(path: impl AsRef<Path>) -> Self {
        Self::with_backend(Backend::Json(JsonFileStore::new(path.as_ref())))
    }

    pub async fn sqlite_at(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_backend(Backend::Sqlite(
            SqliteStore::open_at(path).await?,
        )))
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// All jobs in submission order.
    pub async fn load(&self) -> Result<Vec<Job>> {
        match &self.backend {
            Backend::Json(s) => s.load().await,
            Backend::Sqlite(s) => s.load().await,
        }
    }

    /// Overwrite the whole persisted collection.
    pub async fn save(&self, jobs: &[Job]) -> Result<()> {
        match &self.backend {
            Backend::Json(s) => s.save(jobs).await,
            Backend::Sqlite(s) => s.save(jobs).await,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.load().await?.into_iter().find(|j| j.id == id))
    }

    pub async fn append(&self, job: Job) -> Result<()> {
        self.append_all_then(vec![job], |_| ()).await
    }

    /// Append `jobs`, then run `then` with them while the lock is still held,
    /// so a caller can enqueue them as part of the same unit. `then` only runs
    /// if the save succeeded.
    pub async fn append_all_then<F, R>(&self, jobs: Vec<Job>, then: F) -> Result<R>
    where
        F: FnOnce(Vec<Job>) -> R,
    {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        all.extend(jobs.iter().cloned());
        self.save(&all).await?;
        Ok(then(jobs))
    }

    /// Apply `mutate` to the job with `id` and persist. Returns the updated
    /// job, or None if no such job exists (nothing is written).
    pub async fn update<F>(&self, id: &str, mutate: F) -> Result<Option<Job>>
    where
        F: FnOnce(&mut Job),
    {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        let Some(job) = all.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        mutate(job);
        let updated = job.clone();
        self.save(&all).await?;
        Ok(Some(updated))
    }

    /// Apply `mutate` to every job in one load+save pair and return the result.
    pub async fn update_all<F>(&self, mut mutate: F) -> Result<Vec<Job>>
    where
        F: FnMut(&mut Job),
    {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        all.iter_mut().for_each(|j| mutate(j));
        self.save(&all).await?;
        Ok(all)
    }

    /// Replace the stored record that has `job.id` with `job`. Returns false
    /// (and writes nothing) if the record is gone, e.g. after a reset.
    pub async fn put(&self, job: &Job) -> Result<bool> {
        Ok(self.update(&job.id, |stored| *stored = job.clone()).await?.is_some())
    }

    pub async fn clear(&self) -> Result<()> {
        self.clear_then(|| ()).await
    }

    /// Empty the store, then run `then` under the same lock.
    pub async fn clear_then<F, R>(&self, then: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        let _guard = self.lock.lock().await;
        self.save(&[]).await?;
        Ok(then())
    }
}

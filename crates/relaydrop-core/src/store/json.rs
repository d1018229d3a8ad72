//! Single JSON document holding every job, rewritten atomically on save.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::job::Job;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file loads as empty. So does malformed content (logged).
    pub async fn load(&self) -> Result<Vec<Job>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(decode(&bytes, &self.path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path.display())),
        }
    }

    pub async fn save(&self, jobs: &[Job]) -> Result<()> {
        let data = serde_json::to_vec_pretty(jobs).context("encode jobs")?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &data))
            .await
            .context("store writer task")?
    }
}

fn decode(bytes: &[u8], path: &Path) -> Vec<Job> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Vec::new();
    }
    match serde_json::from_slice(bytes) {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring malformed job store: {}", e);
            Vec::new()
        }
    }
}

/// Write to a temp file in the same directory, fsync, then rename over `path`,
/// so readers see either the old or the new document.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("jobs.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, b"{ not json ]").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());

        std::fs::write(&path, b"   \n").unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_creates_parent_and_uses_spec_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("jobs.json");
        let store = JsonFileStore::new(&path);
        let mut job = Job::new("http://example.com/a.bin", None);
        job.begin_download();
        job.fail("boom");
        store.save(&[job.clone()]).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let rec = &raw[0];
        assert_eq!(rec["id"], job.id.as_str());
        assert_eq!(rec["source_url"], "http://example.com/a.bin");
        assert_eq!(rec["status"], "failed");
        assert_eq!(rec["error"], "boom");
        assert!(rec["result_link"].is_null());
        assert!(rec["created_at"].is_i64());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, vec![job]);
        assert_eq!(loaded[0].status, JobStatus::Failed);
    }
}

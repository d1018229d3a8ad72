//! Job record and its lifecycle.
//!
//! A job moves `queued → downloading → uploading → completed | failed`.
//! The transition methods below are the only mutators; each returns whether
//! the record changed, and terminal jobs ignore everything.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::source;

/// Opaque job identifier (UUID v4, never reused).
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Uploading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Uploading => "uploading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Unknown strings map to `Failed` so a corrupt row never looks runnable.
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => JobStatus::Queued,
            "downloading" => JobStatus::Downloading,
            "uploading" => JobStatus::Uploading,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub source_url: String,
    pub status: JobStatus,
    pub progress: u8,
    pub result_link: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
    /// Address for long-running / completion notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
    /// Name used for the uploaded file.
    #[serde(default)]
    pub file_name: String,
}

impl Job {
    /// New queued job for an already-validated URL.
    pub fn new(source_url: impl Into<String>, notify_email: Option<String>) -> Self {
        let source_url = source_url.into();
        let file_name = source::upload_file_name(&source_url);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_url,
            status: JobStatus::Queued,
            progress: 0,
            result_link: None,
            error: None,
            created_at: unix_timestamp(),
            notify_email: notify_email.filter(|s| !s.trim().is_empty()),
            file_name,
        }
    }

    pub fn begin_download(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Downloading;
        self.progress = 0;
        true
    }

    /// Raises progress while downloading. Values are clamped to 100 and
    /// never move backwards.
    pub fn set_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if self.status != JobStatus::Downloading || percent <= self.progress {
            return false;
        }
        self.progress = percent;
        true
    }

    pub fn begin_upload(&mut self) -> bool {
        if self.status != JobStatus::Downloading {
            return false;
        }
        self.status = JobStatus::Uploading;
        true
    }

    pub fn complete(&mut self, link: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result_link = Some(link.into());
        self.error = None;
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.result_link = None;
        self.error = Some(message.into());
        true
    }
}

/// Polling view of one job. Unknown ids produce `status = "not found"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub status: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusView {
    pub const NOT_FOUND: &'static str = "not found";

    pub fn not_found() -> Self {
        Self {
            status: Self::NOT_FOUND.to_string(),
            progress: 0,
            result_link: None,
            error: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Self::NOT_FOUND
    }
}

impl From<&Job> for StatusView {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status.as_str().to_string(),
            progress: job.progress,
            result_link: job.result_link.clone(),
            error: job.error.clone(),
        }
    }
}

/// Current time as Unix seconds.
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

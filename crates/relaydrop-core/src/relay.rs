//! Download-then-forward for a single job.
//!
//! The source is streamed with curl on a blocking thread into a scoped temp
//! file. Progress snapshots travel over a channel to an async loop that
//! persists percent increases and decides on the long-running notice. The
//! temp file is removed on every exit path when it goes out of scope.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::destination::{self, Destination};
use crate::error::RelayError;
use crate::http;
use crate::job::Job;
use crate::notify::{self, Notice, Notifier};
use crate::progress::ProgressStats;
use crate::store::JobStore;

/// Minimum spacing between progress snapshots when the percentage is unchanged.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct Relay {
    store: JobStore,
    destination: Arc<dyn Destination>,
    notifier: Arc<dyn Notifier>,
    temp_dir: Option<PathBuf>,
    long_running_threshold: Duration,
}

impl Relay {
    pub fn new(
        store: JobStore,
        destination: Arc<dyn Destination>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            destination,
            notifier,
            temp_dir: None,
            long_running_threshold: Duration::from_secs(
                RelayConfig::default().long_running_threshold_secs,
            ),
        }
    }

    /// Relay wired to the destination and notifier selected in `cfg`.
    pub fn from_config(cfg: &RelayConfig, store: JobStore) -> Self {
        Self::new(store, destination::from_config(cfg), notify::from_config(cfg))
            .with_temp_dir(cfg.temp_dir.clone())
            .with_long_running_threshold(Duration::from_secs(cfg.long_running_threshold_secs))
    }

    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn with_long_running_threshold(mut self, threshold: Duration) -> Self {
        self.long_running_threshold = threshold;
        self
    }

    /// Runs `job` to a terminal state and returns it. Failures of any kind end
    /// up in `job.error`; this never returns an error. Intermediate
    /// transitions are persisted here; persisting the terminal record is left
    /// to the caller so it can retry a failed write.
    ///
    /// The job is claimed through the store first. A job that was reset away
    /// or is no longer `queued` there is returned without any transfer.
    pub async fn run(&self, job: Job) -> Job {
        let mut job = match self.claim(job).await {
            Ok(job) => job,
            Err(skipped) => return skipped,
        };
        tracing::info!(job_id = %job.id, url = %job.source_url, "relay started");

        let mut long_running_notice = None;
        match self.transfer(&mut job, &mut long_running_notice).await {
            Ok(link) => {
                tracing::info!(job_id = %job.id, link = %link, "relay completed");
                job.complete(link);
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job.id,
                    retryable = e.is_retryable(),
                    "relay failed: {}",
                    e
                );
                job.fail(e.to_string());
            }
        }

        // The long-running notice always goes out before the finish notice.
        if let Some(sent) = long_running_notice {
            if let Err(e) = sent.await {
                tracing::warn!(job_id = %job.id, "notification task failed: {}", e);
            }
        }
        self.notify(&job, Notice::Finished).await;
        job
    }

    /// Moves the stored record from `queued` to `downloading` under the store
    /// lock. Returns the job to run, or `Err` with the record to hand back when
    /// it must not run.
    async fn claim(&self, job: Job) -> Result<Job, Job> {
        let mut claimed = false;
        let stored = self
            .store
            .update(&job.id, |stored| claimed = stored.begin_download())
            .await;
        match stored {
            Ok(Some(stored)) if claimed => Ok(stored),
            Ok(Some(stored)) => {
                tracing::warn!(job_id = %stored.id, status = %stored.status, "job not runnable, skipping");
                Err(stored)
            }
            Ok(None) => {
                tracing::info!(job_id = %job.id, "job was reset before it started, skipping");
                Err(job)
            }
            Err(e) => {
                // The store is unavailable; run from the in-memory record and
                // let later writes catch up.
                tracing::warn!(job_id = %job.id, "claiming job failed: {:#}", e);
                let mut job = job;
                if job.begin_download() {
                    Ok(job)
                } else {
                    Err(job)
                }
            }
        }
    }

    async fn transfer(
        &self,
        job: &mut Job,
        long_running_notice: &mut Option<JoinHandle<()>>,
    ) -> Result<String, RelayError> {
        let sink = self.temp_sink()?;
        let writer = sink.reopen()?;

        let (tx, rx) = mpsc::channel::<ProgressStats>(16);
        let url = job.source_url.clone();
        let download = tokio::task::spawn_blocking(move || download_to(&url, writer, tx));
        *long_running_notice = self.track_progress(job, rx).await;
        let bytes = download.await.map_err(task_failed)??;
        tracing::debug!(job_id = %job.id, bytes, "download finished");

        job.begin_upload();
        self.persist(job).await;

        let destination = Arc::clone(&self.destination);
        let path = sink.path().to_path_buf();
        let file_name = job.file_name.clone();
        tracing::debug!(job_id = %job.id, destination = destination.name(), "upload started");
        let link = tokio::task::spawn_blocking(move || destination.upload(&path, &file_name))
            .await
            .map_err(task_failed)??;

        drop(sink);
        Ok(link)
    }

    /// Consumes snapshots until the download side hangs up. Returns the
    /// long-running notice task if one was started.
    async fn track_progress(
        &self,
        job: &mut Job,
        mut rx: mpsc::Receiver<ProgressStats>,
    ) -> Option<JoinHandle<()>> {
        let mut long_running_notice = None;
        while let Some(stats) = rx.recv().await {
            if job.set_progress(stats.percent()) {
                self.persist(job).await;
            }
            if long_running_notice.is_some() {
                continue;
            }
            if let Some(eta) = stats.eta_secs() {
                if eta > self.long_running_threshold.as_secs_f64() {
                    tracing::info!(job_id = %job.id, eta_secs = eta, "download is long-running");
                    let notifier = Arc::clone(&self.notifier);
                    let snapshot = job.clone();
                    long_running_notice = Some(tokio::task::spawn_blocking(move || {
                        notify::deliver(
                            notifier.as_ref(),
                            &snapshot,
                            Notice::LongRunning { eta_secs: eta },
                        )
                    }));
                }
            }
        }
        long_running_notice
    }

    async fn notify(&self, job: &Job, notice: Notice) {
        if job.notify_email.is_none() {
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        let snapshot = job.clone();
        let sent =
            tokio::task::spawn_blocking(move || notify::deliver(notifier.as_ref(), &snapshot, notice))
                .await;
        if let Err(e) = sent {
            tracing::warn!(job_id = %job.id, "notification task failed: {}", e);
        }
    }

    /// Best effort: a failed write is logged and the next transition writes
    /// the full in-memory record again.
    async fn persist(&self, job: &Job) {
        match self.store.put(job).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(job_id = %job.id, "job no longer in store"),
            Err(e) => tracing::warn!(job_id = %job.id, "persisting job failed: {:#}", e),
        }
    }

    fn temp_sink(&self) -> Result<NamedTempFile, RelayError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("relaydrop-").suffix(".part");
        let sink = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(sink)
    }
}

fn task_failed(e: tokio::task::JoinError) -> RelayError {
    RelayError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("transfer task failed: {e}"),
    ))
}

/// Streams `url` into `file`, sending progress snapshots on `tx`. Returns the
/// number of bytes written. Runs on the current thread.
fn download_to(
    url: &str,
    file: File,
    tx: mpsc::Sender<ProgressStats>,
) -> Result<u64, RelayError> {
    let mut writer = BufWriter::new(file);
    // Reset on every status line so only the final response (after redirects) counts.
    let status = Cell::new(0u32);
    let total = Cell::new(None::<u64>);
    let bytes_done = Cell::new(0u64);
    let write_error: RefCell<Option<std::io::Error>> = RefCell::new(None);
    let started = Instant::now();
    let mut last_sent: Option<(Instant, u8)> = None;

    let mut easy = http::easy(url)?;
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = str::from_utf8(data) {
                parse_header_line(line.trim_end(), &status, &total);
            }
            true
        })?;
        transfer.write_function(|data| {
            if !(200..300).contains(&status.get()) {
                // Error page body; discard it.
                return Ok(data.len());
            }
            if let Err(e) = writer.write_all(data) {
                write_error.replace(Some(e));
                return Ok(0); // abort transfer
            }
            let done = bytes_done.get() + data.len() as u64;
            bytes_done.set(done);
            let stats = ProgressStats {
                bytes_done: done,
                total_bytes: total.get(),
                elapsed_secs: started.elapsed().as_secs_f64(),
            };
            let pct = stats.percent();
            let due = match last_sent {
                None => true,
                Some((at, prev)) => pct > prev || at.elapsed() >= PROGRESS_INTERVAL,
            };
            if due {
                last_sent = Some((Instant::now(), pct));
                let _ = tx.try_send(stats);
            }
            Ok(data.len())
        })?;
        if let Err(e) = transfer.perform() {
            if e.is_write_error() {
                if let Some(io_err) = write_error.take() {
                    return Err(RelayError::Io(io_err));
                }
            }
            return Err(RelayError::Network(e));
        }
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(RelayError::http_status("source", code));
    }
    writer.flush()?;

    let received = bytes_done.get();
    if let Some(expected) = total.get() {
        if received != expected {
            return Err(RelayError::rejected(
                "source",
                format!("sent {received} of {expected} bytes"),
            ));
        }
    }
    let _ = tx.blocking_send(ProgressStats {
        bytes_done: received,
        total_bytes: total.get(),
        elapsed_secs: started.elapsed().as_secs_f64(),
    });
    Ok(received)
}

/// Tracks the status code and `Content-Length` of the current response.
fn parse_header_line(line: &str, status: &Cell<u32>, total: &Cell<Option<u64>>) {
    if line.starts_with("HTTP/") {
        let code = line
            .split_whitespace()
            .nth(1)
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        status.set(code);
        total.set(None);
        return;
    }
    if let Some((name, value)) = line.split_once(':') {
        if name.trim().eq_ignore_ascii_case("content-length") {
            total.set(value.trim().parse().ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lines_track_final_response() {
        let status = Cell::new(0);
        let total = Cell::new(None);
        parse_header_line("HTTP/1.1 302 Found", &status, &total);
        parse_header_line("Content-Length: 12", &status, &total);
        assert_eq!((status.get(), total.get()), (302, Some(12)));

        parse_header_line("HTTP/2 200", &status, &total);
        assert_eq!((status.get(), total.get()), (200, None));
        parse_header_line("content-length:  1000", &status, &total);
        parse_header_line("X-Other: 5", &status, &total);
        assert_eq!(total.get(), Some(1000));
    }

    #[test]
    fn bad_content_length_is_unknown() {
        let status = Cell::new(200);
        let total = Cell::new(Some(5));
        parse_header_line("Content-Length: lots", &status, &total);
        assert_eq!(total.get(), None);
    }
}

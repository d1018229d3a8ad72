//! Email notifications about job progress.
//!
//! Delivery is best effort: failures are logged and never affect the job.

use std::sync::Arc;

use crate::config::{MailjetConfig, RelayConfig};
use crate::error::RelayError;
use crate::http;
use crate::job::Job;

pub trait Notifier: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), RelayError>;
}

/// Used when no mail service is configured; records the notice in the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), RelayError> {
        tracing::info!(to, subject, "notification (mail not configured)");
        Ok(())
    }
}

/// Mailjet v3.1 send API.
pub struct Mailjet {
    endpoint: String,
    api_key: String,
    api_secret: String,
    sender_email: String,
    sender_name: String,
}

impl Mailjet {
    /// None unless key, secret and sender are all configured.
    pub fn from_config(cfg: &MailjetConfig) -> Option<Self> {
        Some(Self {
            endpoint: format!("{}/v3.1/send", cfg.base_url.trim_end_matches('/')),
            api_key: cfg.api_key.clone()?,
            api_secret: cfg.api_secret.clone()?,
            sender_email: cfg.sender_email.clone()?,
            sender_name: cfg.sender_name.clone(),
        })
    }

    fn payload(&self, to: &str, subject: &str, body: &str) -> serde_json::Value {
        serde_json::json!({
            "Messages": [{
                "From": { "Email": self.sender_email, "Name": self.sender_name },
                "To": [{ "Email": to }],
                "Subject": subject,
                "TextPart": body,
            }]
        })
    }
}

impl Notifier for Mailjet {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), RelayError> {
        let mut easy = http::easy(&self.endpoint)?;
        easy.username(&self.api_key)?;
        easy.password(&self.api_secret)?;
        let resp = http::post_json(easy, &self.payload(to, subject, body), Vec::new())?;
        if !resp.is_success() {
            return Err(RelayError::http_status("mailjet", resp.status));
        }
        Ok(())
    }
}

pub fn from_config(cfg: &RelayConfig) -> Arc<dyn Notifier> {
    match Mailjet::from_config(&cfg.mailjet) {
        Some(m) => Arc::new(m),
        None => Arc::new(LogNotifier),
    }
}

/// Which notice to send for a job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notice {
    /// Projected download time exceeded the configured threshold.
    LongRunning { eta_secs: f64 },
    /// Job reached a terminal state.
    Finished,
}

/// Subject and body for `notice` about `job`.
pub fn compose(job: &Job, notice: Notice) -> (String, String) {
    match notice {
        Notice::LongRunning { eta_secs } => (
            format!("Your upload of {} is taking a while", job.file_name),
            format!(
                "The download of {} is expected to take about {} more minutes.\n\
                 You will get another message when it finishes.\n\nJob: {}",
                job.source_url,
                (eta_secs / 60.0).ceil() as u64,
                job.id
            ),
        ),
        Notice::Finished => match (&job.result_link, &job.error) {
            (Some(link), _) => (
                format!("Upload complete: {}", job.file_name),
                format!(
                    "{} has been uploaded.\n\nLink: {}\n\nJob: {}",
                    job.source_url, link, job.id
                ),
            ),
            (None, error) => (
                format!("Upload failed: {}", job.file_name),
                format!(
                    "{} could not be relayed.\n\nError: {}\n\nJob: {}",
                    job.source_url,
                    error.as_deref().unwrap_or("unknown error"),
                    job.id
                ),
            ),
        },
    }
}

/// Sends `notice` to the job's address, if it has one. Errors are logged.
pub fn deliver(notifier: &dyn Notifier, job: &Job, notice: Notice) {
    let Some(to) = job.notify_email.as_deref() else {
        return;
    };
    let (subject, body) = compose(job, notice);
    if let Err(e) = notifier.send(to, &subject, &body) {
        tracing::warn!(job_id = %job.id, "notification to {} failed: {}", to, e);
    }
}

//! `relaydrop submit <url>...` – queue jobs.

use anyhow::Result;
use relaydrop_core::tracker::Tracker;

pub async fn run_submit(tracker: &Tracker, urls: &[String], notify: Option<&str>) -> Result<()> {
    let jobs = tracker.submit(&urls.join("\n"), notify).await?;
    for job in jobs {
        println!("Queued job {} for URL: {}", job.id, job.source_url);
    }
    Ok(())
}

//! `relaydrop list` – show all jobs.

use anyhow::Result;
use relaydrop_core::tracker::Tracker;

pub async fn run_list(tracker: &Tracker) -> Result<()> {
    let jobs = tracker.list().await?;
    if jobs.is_empty() {
        println!("No jobs.");
        return Ok(());
    }
    println!("{:<36} {:<11} {:>4} {}", "ID", "STATUS", "PCT", "URL / RESULT");
    for j in jobs {
        let detail = j
            .result_link
            .as_deref()
            .or(j.error.as_deref())
            .unwrap_or(&j.source_url);
        println!("{:<36} {:<11} {:>3}% {}", j.id, j.status, j.progress, detail);
    }
    Ok(())
}

//! `relaydrop status <id>` – show one job.

use anyhow::Result;
use relaydrop_core::tracker::Tracker;

pub async fn run_status(tracker: &Tracker, id: &str) -> Result<()> {
    let view = tracker.status(id).await?;
    println!("status:   {}", view.status);
    println!("progress: {}%", view.progress);
    if let Some(link) = &view.result_link {
        println!("link:     {link}");
    }
    if let Some(error) = &view.error {
        println!("error:    {error}");
    }
    Ok(())
}

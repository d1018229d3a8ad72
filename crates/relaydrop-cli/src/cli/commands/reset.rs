//! `relaydrop reset --yes` – delete every job.

use anyhow::{bail, Result};
use relaydrop_core::tracker::Tracker;

pub async fn run_reset(tracker: &Tracker, yes: bool) -> Result<()> {
    if !yes {
        bail!("reset deletes every job; pass --yes to confirm");
    }
    tracker.reset().await?;
    println!("All jobs deleted.");
    Ok(())
}

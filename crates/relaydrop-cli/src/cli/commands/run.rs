//! `relaydrop run` – process queued jobs, then exit.

use anyhow::Result;
use relaydrop_core::config::RelayConfig;
use relaydrop_core::relay::Relay;
use relaydrop_core::tracker::Tracker;
use relaydrop_core::worker::Worker;
use std::time::Duration;

/// Recovers jobs left over by a previous process and builds a worker for them.
pub async fn build_worker(tracker: &Tracker, cfg: &RelayConfig) -> Result<Worker> {
    let recovery = tracker.recover().await?;
    if recovery.requeued > 0 || recovery.interrupted > 0 {
        tracing::info!(
            requeued = recovery.requeued,
            interrupted = recovery.interrupted,
            "recovered jobs from previous run"
        );
    }
    let relay = Relay::from_config(cfg, tracker.store().clone());
    Ok(Worker::new(
        tracker.queue().clone(),
        tracker.store().clone(),
        relay,
        tracker.signal(),
    )
    .with_max_concurrent(cfg.max_concurrent_jobs)
    .with_poll_interval(Duration::from_secs(cfg.poll_interval_secs.max(1))))
}

pub async fn run_worker(tracker: &Tracker, cfg: &RelayConfig) -> Result<()> {
    let mut worker = build_worker(tracker, cfg).await?;
    let ran = worker.run_until_idle().await;
    println!("Processed {ran} job(s).");
    Ok(())
}

//! `relaydrop serve` – worker loop plus the HTTP API, until ctrl-c.

use anyhow::{Context, Result};
use relaydrop_core::config::RelayConfig;
use relaydrop_core::tracker::Tracker;
use tokio::sync::watch;

use super::build_worker;
use crate::api;

pub async fn run_serve(tracker: Tracker, cfg: &RelayConfig, bind: &str) -> Result<()> {
    let mut worker = build_worker(&tracker, cfg).await?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP API listening");
    println!("Listening on {addr}");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("listening for ctrl-c failed: {}", e);
            return;
        }
        tracing::info!("ctrl-c received, shutting down");
        let _ = stop_tx.send(true);
    });

    let worker_task = tokio::spawn({
        let stop = stop_rx.clone();
        async move { worker.run_until(stopped(stop)).await }
    });

    axum::serve(listener, api::router(tracker))
        .with_graceful_shutdown(stopped(stop_rx))
        .await
        .context("HTTP server")?;

    // In-flight relays run to completion before the worker returns.
    match worker_task.await {
        Ok(ran) => tracing::info!(ran, "worker stopped"),
        Err(e) => tracing::error!("worker task failed: {}", e),
    }
    Ok(())
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

//! CLI for the relaydrop job tracker.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relaydrop_core::config::{self, RelayConfig};
use relaydrop_core::queue::JobQueue;
use relaydrop_core::store::JobStore;
use relaydrop_core::tracker::Tracker;

use commands::{run_list, run_reset, run_serve, run_status, run_submit, run_worker};

/// Top-level CLI for relaydrop.
#[derive(Debug, Parser)]
#[command(name = "relaydrop")]
#[command(about = "relaydrop: download files and relay them to a file host", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue one job per source URL.
    Submit {
        /// Direct HTTP/HTTPS URLs to relay.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Email address notified when the jobs finish.
        #[arg(long, value_name = "EMAIL")]
        notify: Option<String>,
    },

    /// Show status, progress and link of one job.
    Status {
        /// Job identifier.
        id: String,
    },

    /// List all jobs in submission order.
    List,

    /// Delete every job and its history.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },

    /// Process queued jobs until none are left.
    Run {
        /// Run up to N relays concurrently (defaults to max_concurrent_jobs from the config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Run the worker and the HTTP API until interrupted.
    Serve {
        /// Address the HTTP API listens on.
        #[arg(long, default_value = "0.0.0.0:10000", value_name = "ADDR")]
        bind: String,
        /// Run up to N relays concurrently (defaults to max_concurrent_jobs from the config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!(
            store = ?cfg.store_backend,
            destination = ?cfg.destination,
            "loaded config"
        );
        let store = JobStore::open(&cfg).await.context("open job store")?;
        let tracker = Tracker::new(store, JobQueue::new());

        match cli.command {
            CliCommand::Submit { urls, notify } => {
                run_submit(&tracker, &urls, notify.as_deref()).await?
            }
            CliCommand::Status { id } => run_status(&tracker, &id).await?,
            CliCommand::List => run_list(&tracker).await?,
            CliCommand::Reset { yes } => run_reset(&tracker, yes).await?,
            CliCommand::Run { jobs } => {
                apply_jobs(&mut cfg, jobs);
                run_worker(&tracker, &cfg).await?
            }
            CliCommand::Serve { bind, jobs } => {
                apply_jobs(&mut cfg, jobs);
                run_serve(tracker, &cfg, &bind).await?
            }
        }

        Ok(())
    }
}

fn apply_jobs(cfg: &mut RelayConfig, jobs: Option<usize>) {
    if let Some(n) = jobs {
        cfg.max_concurrent_jobs = n;
    }
}

#[cfg(test)]
mod tests;

//! HTTP API served by `relaydrop serve`.

mod error;
mod handlers;

use axum::routing::{get, post};
use axum::Router;
use relaydrop_core::tracker::Tracker;

/// Create the API router.
pub fn router(tracker: Tracker) -> Router {
    Router::new()
        .route("/submit", post(handlers::submit))
        .route("/job_status/:job_id", get(handlers::job_status))
        .route("/jobs", get(handlers::list_jobs))
        .route("/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .with_state(tracker)
}

#[cfg(test)]
mod tests;

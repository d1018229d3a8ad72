//! Request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use relaydrop_core::job::{Job, StatusView};
use relaydrop_core::tracker::Tracker;
use serde::{Deserialize, Serialize};

use super::error::ApiResult;

/// `urls` is either newline-separated text or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Urls {
    Text(String),
    List(Vec<String>),
}

impl Urls {
    fn into_text(self) -> String {
        match self {
            Urls::Text(text) => text,
            Urls::List(list) => list.join("\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub urls: Urls,
    #[serde(default)]
    pub notify_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
}

pub async fn submit(
    State(tracker): State<Tracker>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<JobsResponse>)> {
    let jobs = tracker
        .submit(&req.urls.into_text(), req.notify_email.as_deref())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(JobsResponse { jobs })))
}

/// Unknown ids answer 200 with status "not found".
pub async fn job_status(
    State(tracker): State<Tracker>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusView>> {
    Ok(Json(tracker.status(&job_id).await?))
}

pub async fn list_jobs(State(tracker): State<Tracker>) -> ApiResult<Json<JobsResponse>> {
    Ok(Json(JobsResponse {
        jobs: tracker.list().await?,
    }))
}

pub async fn reset(State(tracker): State<Tracker>) -> ApiResult<StatusCode> {
    tracker.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

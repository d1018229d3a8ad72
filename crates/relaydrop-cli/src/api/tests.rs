use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use relaydrop_core::queue::JobQueue;
use relaydrop_core::store::JobStore;
use relaydrop_core::tracker::Tracker;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::router;

fn tracker(dir: &std::path::Path) -> Tracker {
    Tracker::new(JobStore::json_at(dir.join("jobs.json")), JobQueue::new())
}

async fn call(tracker: &Tracker, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router(tracker.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn submit_text_creates_queued_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let t = tracker(dir.path());
    let (status, body) = call(
        &t,
        post_json(
            "/submit",
            json!({ "urls": "https://example.com/a.iso\n\nhttps://example.com/b.iso" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["status"], "queued");
    assert_eq!(jobs[0]["progress"], 0);
    assert_eq!(t.queue().len(), 2);
}

#[tokio::test]
async fn submit_list_with_notify_email() {
    let dir = tempfile::tempdir().unwrap();
    let t = tracker(dir.path());
    let (status, body) = call(
        &t,
        post_json(
            "/submit",
            json!({ "urls": ["https://example.com/a.iso"], "notify_email": "me@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["jobs"][0]["notify_email"], "me@example.com");
}

#[tokio::test]
async fn invalid_submission_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let t = tracker(dir.path());
    for urls in [json!(""), json!("ftp://example.com/x"), json!([])] {
        let (status, body) = call(&t, post_json("/submit", json!({ "urls": urls }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{urls}");
        assert!(body["error"].as_str().unwrap().contains("invalid submission"));
    }
    assert!(t.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn job_status_reports_known_and_unknown_ids() {
    let dir = tempfile::tempdir().unwrap();
    let t = tracker(dir.path());
    let job = t.submit("https://example.com/a", None).await.unwrap().remove(0);

    let (status, body) = call(&t, get(&format!("/job_status/{}", job.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "queued", "progress": 0 }));

    let (status, body) = call(&t, get("/job_status/nope")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "not found", "progress": 0 }));
}

#[tokio::test]
async fn list_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let t = tracker(dir.path());
    t.submit("https://example.com/a\nhttps://example.com/b", None)
        .await
        .unwrap();

    let (_, body) = call(&t, get("/jobs")).await;
    assert_eq!(body["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(body["jobs"][1]["source_url"], "https://example.com/b");

    let reset = Request::post("/reset").body(Body::empty()).unwrap();
    let (status, _) = call(&t, reset).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call(&t, get("/jobs")).await;
    assert!(body["jobs"].as_array().unwrap().is_empty());
    assert!(t.queue().is_empty());
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = call(&tracker(dir.path()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

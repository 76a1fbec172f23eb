//! Integration tests for photosong-ai API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use helpers::*;
use http_body_util::BodyExt;
use photosong_ai::types::Collaborators;
use photosong_ai::AppState;
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Test helper: app over a memory store with scripted collaborators
fn create_test_app(
    collaborators: Collaborators,
    dir: &tempfile::TempDir,
) -> (axum::Router, Arc<photosong_ai::services::PipelineOrchestrator>) {
    let orch = orchestrator(collaborators, dir.path(), 1);
    let app = photosong_ai::build_router(AppState::new(orch.clone()));
    (app, orch)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn post_job(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: String) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _orch) = create_test_app(Collaborators::unconfigured(), &dir);

    let response = app.oneshot(get("/health".to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "photosong-ai");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_submit_returns_accepted_with_job_id() {
    let dir = tempfile::tempdir().unwrap();
    let (app, orch) = create_test_app(
        ScriptedCollaborators::into_collaborators(Script::default()),
        &dir,
    );

    let response = app
        .oneshot(post_job(json!({
            "photos": ["beach.jpg", "picnic.jpg", "sunset.jpg"],
            "genre": "pop",
            "mood": "happy"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let job_id: Uuid = json["job_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(json["stage"], "CREATED");

    let job = wait_for_terminal(&orch, job_id).await;
    assert_eq!(job.artifacts.captions.unwrap().len(), 3);
}

#[tokio::test]
async fn test_submit_rejects_missing_photos() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _orch) = create_test_app(Collaborators::unconfigured(), &dir);

    let response = app
        .oneshot(post_job(json!({ "photos": [], "genre": "pop", "mood": "happy" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_submit_rejects_missing_genre() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _orch) = create_test_app(Collaborators::unconfigured(), &dir);

    let response = app
        .oneshot(post_job(json!({ "photos": ["a.jpg"], "mood": "happy" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_rejects_malformed_json_with_error_body() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _orch) = create_test_app(Collaborators::unconfigured(), &dir);

    let request = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("content-type", "application/json")
        .body(Body::from("{\"photos\": [\"a.jpg\""))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(!json["error"]["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _orch) = create_test_app(Collaborators::unconfigured(), &dir);

    let response = app
        .oneshot(get(format!("/jobs/{}", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_result_and_audio_after_completion() {
    let dir = tempfile::tempdir().unwrap();
    let (app, orch) = create_test_app(
        ScriptedCollaborators::into_collaborators(Script::default()),
        &dir,
    );

    let job_id = orch.submit(inputs(&["a.jpg", "b.jpg"])).await.unwrap();
    wait_for_terminal(&orch, job_id).await;

    let response = app
        .clone()
        .oneshot(get(format!("/jobs/{}", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["stage"], "COMPLETED");
    assert_eq!(status["status"], "completed");
    assert!(status.get("failure_reason").is_none());

    let response = app
        .clone()
        .oneshot(get(format!("/jobs/{}/result", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["genre"], "pop");
    assert_eq!(result["captions"].as_array().unwrap().len(), 2);
    assert_eq!(result["summary"], GOOD_SUMMARY);
    assert_eq!(result["vocals_only"], false);

    let response = app
        .oneshot(get(format!("/jobs/{}/audio", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..4], b"RIFF");
}

#[tokio::test]
async fn test_result_before_completion_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (app, orch) = create_test_app(Collaborators::unconfigured(), &dir);

    // Created but never executed
    let job_id = orch.create(inputs(&["a.jpg"])).await.unwrap();

    let response = app
        .clone()
        .oneshot(get(format!("/jobs/{}/result", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(get(format!("/jobs/{}/audio", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_job_status_carries_reason() {
    let dir = tempfile::tempdir().unwrap();
    let (app, orch) = create_test_app(Collaborators::unconfigured(), &dir);

    let mut bad = inputs(&["a.jpg"]);
    bad.mood = String::new();
    let job_id = orch.create(bad).await.unwrap();
    orch.execute(job_id).await.unwrap();

    let response = app
        .oneshot(get(format!("/jobs/{}", job_id)))
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["stage"], "FAILED");
    assert_eq!(status["status"], "failed");
    assert_eq!(status["failure_reason"]["stage"], "CREATED");
    assert_eq!(status["failure_reason"]["kind"], "validation");
}

#[tokio::test]
async fn test_event_stream_is_sse() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _orch) = create_test_app(Collaborators::unconfigured(), &dir);

    let response = app
        .oneshot(get(format!("/events?job_id={}", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}

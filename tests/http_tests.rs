// Tests for the local recording control API
//
// Requests go straight into the router; the session records from a scripted
// backend.

mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{session_config, small_policy, BackendProbe, ScriptedBackend};
use practice_recorder::api::ApiClient;
use practice_recorder::http::{create_router, AppState};
use practice_recorder::session::{CaptureSession, CaptureState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    session: Arc<CaptureSession>,
    probe: BackendProbe,
}

fn test_app(api: Option<ApiClient>) -> TestApp {
    let probe = BackendProbe::default();
    let backend = ScriptedBackend::new(probe.clone());
    let session = CaptureSession::new(session_config(small_policy()), Box::new(backend)).unwrap();

    let state = AppState::new(session, api);
    let session = Arc::clone(&state.session);

    TestApp {
        router: create_router(state),
        session,
        probe,
    }
}

async fn send(router: &Router, method: &str, uri: &str) -> Result<(StatusCode, Option<String>, Vec<u8>)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())?;

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await?;

    Ok((status, content_type, body.to_vec()))
}

async fn send_json(router: &Router, method: &str, uri: &str) -> Result<(StatusCode, Value)> {
    let (status, _, body) = send(router, method, uri).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let app = test_app(None);

    let (status, _, body) = send(&app.router, "GET", "/health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    Ok(())
}

#[tokio::test]
async fn test_status_when_idle() -> Result<()> {
    let app = test_app(None);

    let (status, json) = send_json(&app.router, "GET", "/recording/status").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "idle");
    assert_eq!(json["is_recording"], false);
    assert_eq!(json["buffered_bytes"], 0);
    assert!(json["artifact"].is_null());

    Ok(())
}

#[tokio::test]
async fn test_record_playback_and_clear() -> Result<()> {
    let app = test_app(None);

    let (status, json) = send_json(&app.router, "POST", "/recording/start").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "recording");

    app.probe.push(vec![5u8; 120]).await;
    app.probe.push(vec![6u8; 80]).await;

    let (status, json) = send_json(&app.router, "POST", "/recording/stop").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["artifact"]["size_bytes"], 200);
    assert_eq!(json["artifact"]["mime_type"], "audio/webm");

    let playback = json["playback_path"].as_str().unwrap().to_string();
    assert!(playback.starts_with("/recordings/"));

    let (status, content_type, body) = send(&app.router, "GET", &playback).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("audio/webm"));
    assert_eq!(body.len(), 200);
    assert_eq!(body[0], 5);
    assert_eq!(body[199], 6);

    let (status, json) = send_json(&app.router, "POST", "/recording/clear").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(json["artifact"].is_null());

    let (status, _, _) = send(&app.router, "GET", &playback).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "Cleared recording is no longer served");

    Ok(())
}

#[tokio::test]
async fn test_stop_without_recording_conflicts() -> Result<()> {
    let app = test_app(None);

    let (status, json) = send_json(&app.router, "POST", "/recording/stop").await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "No recording in progress");

    Ok(())
}

#[tokio::test]
async fn test_permission_denied_is_unavailable() -> Result<()> {
    let app = test_app(None);
    app.probe.set_deny(true);

    let (status, json) = send_json(&app.router, "POST", "/recording/start").await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to access microphone"));
    assert_eq!(app.session.state(), CaptureState::Idle);

    let (_, json) = send_json(&app.router, "GET", "/recording/status").await?;
    assert!(json["error"].as_str().is_some());

    Ok(())
}

#[tokio::test]
async fn test_oversized_recording_is_rejected() -> Result<()> {
    let app = test_app(None);

    send(&app.router, "POST", "/recording/start").await?;
    app.probe.push_many(3, 400).await;

    let (status, json) = send_json(&app.router, "POST", "/recording/stop").await?;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["error"].as_str().unwrap().contains("too large"));
    assert!(app.session.artifact().is_none());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_warning() -> Result<()> {
    let app = test_app(None);

    send(&app.router, "POST", "/recording/start").await?;
    app.probe.push(vec![0u8; 600]).await;

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let (_, json) = send_json(&app.router, "GET", "/recording/status").await?;

    assert_eq!(json["warning"]["kind"], "soft_size");
    assert_eq!(json["warning"]["severity"], "soft");
    assert!(json["warning"]["message"].as_str().is_some());

    Ok(())
}

#[tokio::test]
async fn test_submit_without_backend_is_unavailable() -> Result<()> {
    let app = test_app(None);

    let (status, json) = send_json(&app.router, "POST", "/questions/q-1/responses").await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "Practice backend not configured");

    Ok(())
}

#[tokio::test]
async fn test_submit_without_recording_conflicts() -> Result<()> {
    // Nothing listens here; the handler must fail before any request
    let app = test_app(Some(ApiClient::new("http://127.0.0.1:9", 1024)));

    let (status, json) = send_json(&app.router, "POST", "/questions/q-1/responses").await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "No finished recording to submit");

    Ok(())
}

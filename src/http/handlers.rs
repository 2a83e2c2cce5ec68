use super::state::AppState;
use crate::api::{ApiError, ResponseRecord};
use crate::session::{ArtifactInfo, CaptureError, ObjectUrlRegistry, SessionSnapshot, URL_PREFIX};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub message: String,
    pub artifact: ArtifactInfo,
    /// Path on this server serving the recording for playback
    pub playback_path: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn capture_error_response(err: &CaptureError) -> Response {
    let status = match err {
        CaptureError::Permission { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CaptureError::SizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        CaptureError::InvalidPolicy(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn api_error_response(err: &ApiError) -> Response {
    let status = match err {
        ApiError::ArtifactTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ApiError::InvalidJobDescription(_) => StatusCode::BAD_REQUEST,
        ApiError::Status { status, .. } if *status == 404 => StatusCode::NOT_FOUND,
        ApiError::Status { .. } | ApiError::Http(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

fn playback_path(info: &ArtifactInfo) -> String {
    let id = info.url.strip_prefix(URL_PREFIX).unwrap_or(&info.url);
    format!("/recordings/{}", id)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /recording/start
/// Acquire the microphone and start recording
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start requested");

    match state.session.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StartRecordingResponse {
                status: state.session.state().to_string(),
                message: "Recording started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            capture_error_response(&e)
        }
    }
}

/// POST /recording/stop
/// Stop recording and finalize the artifact
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested");

    match state.session.stop().await {
        Ok(Some(artifact)) => {
            let info = artifact.info();
            (
                StatusCode::OK,
                Json(StopRecordingResponse {
                    status: "stopped".to_string(),
                    message: format!("Recording finalized ({} bytes)", info.size_bytes),
                    playback_path: playback_path(&info),
                    artifact: info,
                }),
            )
                .into_response()
        }
        Ok(None) => error_response(StatusCode::CONFLICT, "No recording in progress"),
        Err(e) => {
            warn!("Recording discarded: {}", e);
            capture_error_response(&e)
        }
    }
}

/// POST /recording/clear
/// Discard the finished recording, error and warning
pub async fn clear_recording(State(state): State<AppState>) -> Json<SessionSnapshot> {
    state.session.clear_recording();
    Json(state.session.snapshot())
}

/// GET /recording/status
pub async fn get_recording_status(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// GET /recordings/:id
/// Serve a finalized recording until its URL is revoked
pub async fn get_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.resolve(&ObjectUrlRegistry::url_for_id(&id)) {
        Some((blob, mime_type)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime_type)],
            blob.to_vec(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Recording {} not found", id)),
    }
}

/// POST /questions/:question_id/responses
/// Submit the finished recording for transcription and scoring
pub async fn submit_response(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> impl IntoResponse {
    let Some(api) = state.api.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Practice backend not configured");
    };

    let Some(artifact) = state.session.artifact() else {
        return error_response(StatusCode::CONFLICT, "No finished recording to submit");
    };

    match api.submit_response(&question_id, &artifact).await {
        Ok(record) => {
            info!("Response {} scored", record.response_id);
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(e) => {
            error!("Failed to submit response: {}", e);
            api_error_response(&e)
        }
    }
}

/// GET /questions/:question_id/responses
/// Previous attempts, newest first
pub async fn list_responses(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> impl IntoResponse {
    let Some(api) = state.api.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Practice backend not configured");
    };

    match api.list_responses(&question_id).await {
        Ok(records) => (StatusCode::OK, Json::<Vec<ResponseRecord>>(records)).into_response(),
        Err(e) => {
            error!("Failed to list responses: {}", e);
            api_error_response(&e)
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

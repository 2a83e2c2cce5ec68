use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording control
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/clear", post(handlers::clear_recording))
        .route("/recording/status", get(handlers::get_recording_status))
        // Playback
        .route("/recordings/:id", get(handlers::get_recording))
        // Scoring
        .route(
            "/questions/:question_id/responses",
            post(handlers::submit_response).get(handlers::list_responses),
        )
        // Browser UIs run on another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

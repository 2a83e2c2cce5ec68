//! HTTP API for a practice UI
//!
//! This module provides a REST API around one capture session:
//! - POST /recording/start - Acquire the microphone and record
//! - POST /recording/stop - Stop and finalize the recording
//! - POST /recording/clear - Discard the finished recording
//! - GET /recording/status - Query session state, warning and error
//! - GET /recordings/:id - Play back a finalized recording
//! - POST|GET /questions/:id/responses - Submit for scoring, list attempts
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;

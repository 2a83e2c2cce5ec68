use crate::api::ApiClient;
use crate::session::{CaptureSession, ObjectUrlRegistry};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The capture session driven by this API
    pub session: Arc<CaptureSession>,

    /// Playback URLs minted by the session
    pub registry: ObjectUrlRegistry,

    /// Practice backend, if configured
    pub api: Option<Arc<ApiClient>>,
}

impl AppState {
    pub fn new(session: CaptureSession, api: Option<ApiClient>) -> Self {
        let registry = session.registry().clone();
        Self {
            session: Arc::new(session),
            registry,
            api: api.map(Arc::new),
        }
    }
}

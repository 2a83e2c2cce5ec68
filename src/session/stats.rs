use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::artifact::ArtifactInfo;
use super::error::{CaptureError, LimitWarning, WarningSeverity};

/// Lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Initializing,
    Recording,
    Stopped,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Initializing => "initializing",
            CaptureState::Recording => "recording",
            CaptureState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Notifications published by a capture session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(CaptureState),
    WarningChanged(Option<LimitWarning>),
    ArtifactReady(ArtifactInfo),
    Failed(CaptureError),
}

/// Warning as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningView {
    pub severity: WarningSeverity,
    pub message: String,
    #[serde(flatten)]
    pub detail: LimitWarning,
}

impl From<&LimitWarning> for WarningView {
    fn from(warning: &LimitWarning) -> Self {
        Self {
            severity: warning.severity(),
            message: warning.to_string(),
            detail: warning.clone(),
        }
    }
}

/// Point-in-time view of a capture session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Current lifecycle state
    pub state: CaptureState,

    /// Whether the device is capturing
    pub is_recording: bool,

    /// When the device confirmed the current recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Whole minutes elapsed, as of the last monitor tick
    pub elapsed_minutes: u64,

    /// Bytes buffered for the current recording
    pub buffered_bytes: u64,

    /// Number of chunks buffered for the current recording
    pub chunk_count: usize,

    /// Active warning, if any
    pub warning: Option<WarningView>,

    /// Error from the last attempt, if any
    pub error: Option<String>,

    /// Finalized recording, if one is live
    pub artifact: Option<ArtifactInfo>,
}

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::config::MEGABYTE;

pub(crate) fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / MEGABYTE as f64
}

/// Errors that end a recording attempt
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("Failed to access microphone. Please ensure microphone permissions are granted. ({reason})")]
    Permission { reason: String },

    #[error(
        "Recording is too large ({:.1}MB, about {estimated_minutes} minutes). Maximum size is {:.0}MB (~{max_duration_minutes} minutes). Please record a shorter answer.",
        megabytes(.size_bytes),
        megabytes(.max_size_bytes)
    )]
    SizeExceeded {
        size_bytes: u64,
        max_size_bytes: u64,
        estimated_minutes: u64,
        max_duration_minutes: f64,
    },

    #[error("Invalid session configuration: {0}")]
    InvalidPolicy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    /// Recording may continue
    Soft,
    /// User should stop immediately
    Hard,
}

/// Advisory raised by the monitor while recording
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimitWarning {
    HardSize {
        size_bytes: u64,
        max_size_bytes: u64,
    },
    SoftSize {
        size_bytes: u64,
        max_size_bytes: u64,
    },
    HardDuration {
        elapsed_minutes: u64,
        max_duration_minutes: f64,
    },
    SoftDuration {
        elapsed_minutes: u64,
        max_duration_minutes: f64,
    },
}

impl LimitWarning {
    pub fn severity(&self) -> WarningSeverity {
        match self {
            LimitWarning::HardSize { .. } | LimitWarning::HardDuration { .. } => WarningSeverity::Hard,
            LimitWarning::SoftSize { .. } | LimitWarning::SoftDuration { .. } => WarningSeverity::Soft,
        }
    }

    pub fn is_size(&self) -> bool {
        matches!(self, LimitWarning::HardSize { .. } | LimitWarning::SoftSize { .. })
    }
}

impl fmt::Display for LimitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitWarning::HardSize { size_bytes, max_size_bytes } => write!(
                f,
                "Recording has reached {:.1}MB, the maximum is {:.0}MB. Stop recording now or it will be discarded.",
                megabytes(size_bytes),
                megabytes(max_size_bytes)
            ),
            LimitWarning::SoftSize { size_bytes, max_size_bytes } => write!(
                f,
                "Recording is {:.1}MB, approaching the {:.0}MB limit. Consider wrapping up your answer.",
                megabytes(size_bytes),
                megabytes(max_size_bytes)
            ),
            LimitWarning::HardDuration { elapsed_minutes, max_duration_minutes } => write!(
                f,
                "Recording has run {} minutes, the maximum is {} minutes. Stop recording now.",
                elapsed_minutes, max_duration_minutes
            ),
            LimitWarning::SoftDuration { elapsed_minutes, max_duration_minutes } => write!(
                f,
                "Recording has run {} minutes, approaching the {}-minute limit. Consider wrapping up your answer.",
                elapsed_minutes, max_duration_minutes
            ),
        }
    }
}

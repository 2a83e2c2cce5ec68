//! Audio capture session
//!
//! This module provides the `CaptureSession` abstraction that manages:
//! - Exclusive access to the capture device
//! - Chunk accumulation in arrival order
//! - A 1 Hz monitor raising soft and hard size/duration warnings
//! - Finalization into a playable artifact, or a size-exceeded error
//! - Revocation of playback URLs on clear, restart and teardown

mod artifact;
mod config;
mod error;
mod monitor;
mod session;
mod stats;

pub use artifact::{ArtifactInfo, AudioArtifact, ChunkBuffer, ObjectUrlRegistry, URL_PREFIX};
pub use config::{LimitPolicy, SessionConfig, MEGABYTE};
pub use error::{CaptureError, LimitWarning, WarningSeverity};
pub use session::CaptureSession;
pub use stats::{CaptureState, SessionEvent, SessionSnapshot, WarningView};

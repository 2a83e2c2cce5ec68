use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::CaptureError;

/// Bytes per megabyte as shown to users
pub const MEGABYTE: u64 = 1024 * 1024;

/// Size and duration limits for a single recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitPolicy {
    /// Recordings above this size are discarded at stop
    pub max_size_bytes: u64,

    /// Hard duration limit in minutes (advisory, escalates the warning)
    pub max_duration_minutes: f64,

    /// Soft size threshold, must be below `max_size_bytes`
    pub warning_size_bytes: u64,

    /// Soft duration threshold, must be below `max_duration_minutes`
    pub warning_duration_minutes: f64,

    /// Assumed encoder bitrate, only used to estimate the duration of an
    /// oversized recording
    pub estimated_bitrate_bps: u64,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 30 * MEGABYTE,
            max_duration_minutes: 30.0,
            warning_size_bytes: 25 * MEGABYTE,
            warning_duration_minutes: 25.0,
            estimated_bitrate_bps: 128 * 1024,
        }
    }
}

impl LimitPolicy {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.warning_size_bytes >= self.max_size_bytes {
            return Err(CaptureError::InvalidPolicy(format!(
                "warning size ({} bytes) must be below the maximum size ({} bytes)",
                self.warning_size_bytes, self.max_size_bytes
            )));
        }

        if !(self.warning_duration_minutes < self.max_duration_minutes) {
            return Err(CaptureError::InvalidPolicy(format!(
                "warning duration ({} min) must be below the maximum duration ({} min)",
                self.warning_duration_minutes, self.max_duration_minutes
            )));
        }

        if self.estimated_bitrate_bps == 0 {
            return Err(CaptureError::InvalidPolicy(
                "estimated bitrate must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Estimated whole minutes of audio in `size_bytes` at the assumed bitrate
    pub fn estimate_minutes(&self, size_bytes: u64) -> u64 {
        let seconds = size_bytes as f64 * 8.0 / self.estimated_bitrate_bps as f64;
        (seconds / 60.0).round() as u64
    }
}

/// Configuration for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Size and duration limits
    pub policy: LimitPolicy,

    /// Period of the limit monitor
    /// Default: 1 second
    pub monitor_interval: Duration,

    /// How long `stop` waits for the encoder's last chunks
    /// Default: 100 milliseconds
    pub finalize_grace: Duration,

    /// Buffered events per subscriber before lagging
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: LimitPolicy::default(),
            monitor_interval: Duration::from_secs(1),
            finalize_grace: Duration::from_millis(100),
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    pub fn with_policy(policy: LimitPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Rejects limits that can never be met and timings the monitor can't run with
    pub fn validate(&self) -> Result<(), CaptureError> {
        self.policy.validate()?;

        if self.monitor_interval.is_zero() {
            return Err(CaptureError::InvalidPolicy(
                "monitor interval must be greater than zero".to_string(),
            ));
        }

        if self.event_capacity == 0 {
            return Err(CaptureError::InvalidPolicy(
                "event capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

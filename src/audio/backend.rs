use anyhow::{bail, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::encoder;

/// Encoded audio produced by a capture backend
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Container bytes (header or PCM payload), in production order
    pub data: Vec<u8>,
    /// Milliseconds since the device confirmed capture started
    pub timestamp_ms: u64,
}

impl EncodedChunk {
    pub fn new(data: Vec<u8>, timestamp_ms: u64) -> Self {
        Self { data, timestamp_ms }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// How often buffered samples are flushed as a chunk
    pub flush_interval_ms: u64,
    /// Capacity of the chunk channel handed to the session
    pub channel_capacity: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 100, // 100ms chunks
            channel_capacity: 256,
        }
    }
}

impl AudioBackendConfig {
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_ms == 0 {
            bail!("flush_interval_ms must be greater than zero");
        }
        if self.channel_capacity == 0 {
            bail!("channel_capacity must be greater than zero");
        }
        Ok(())
    }
}

/// Audio capture backend trait
///
/// A backend owns the exclusive device handle between `start` and `stop`.
/// Implementations:
/// - Microphone: cpal default input device
/// - File: replay a WAV file (for testing/batch processing)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Acquire the device and start capturing
    ///
    /// Resolves once the device has actually started. The returned receiver
    /// yields chunks in production order and closes after `stop`.
    async fn start(&mut self) -> Result<mpsc::Receiver<EncodedChunk>>;

    /// Flush the encoder and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;

    /// MIME type of the assembled recording
    fn mime_type(&self) -> &str {
        encoder::WAV_MIME_TYPE
    }

    /// Fix up container headers once all chunks are concatenated.
    ///
    /// Must not change the blob length.
    fn finalize_container(&self, blob: &mut [u8]) {
        encoder::finalize_wav(blob);
    }
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend for the given source
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        config.validate()?;

        match source {
            AudioSource::Microphone => {
                let backend = super::microphone::MicrophoneBackend::new(config);
                Ok(Box::new(backend))
            }

            AudioSource::File(path) => {
                let backend = super::file::FileBackend::new(path, config, true)?;
                Ok(Box::new(backend))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Default input device
    Microphone,
    /// WAV file input, replayed in real time
    File(PathBuf),
}

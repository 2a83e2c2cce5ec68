// Scripted capture backend for session tests
//
// Stands in for a microphone: tests push chunks through the probe, and the
// probe counts device acquisitions and live handles.

#![allow(dead_code)]

use anyhow::{bail, Result};
use practice_recorder::audio::{AudioBackend, EncodedChunk};
use practice_recorder::session::{LimitPolicy, SessionConfig, MEGABYTE};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

#[derive(Clone, Default)]
pub struct BackendProbe {
    pub acquisitions: Arc<AtomicUsize>,
    pub active_handles: Arc<AtomicUsize>,
    pub deny: Arc<AtomicBool>,
    sender: Arc<Mutex<Option<mpsc::Sender<EncodedChunk>>>>,
}

impl BackendProbe {
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn active_handles(&self) -> usize {
        self.active_handles.load(Ordering::SeqCst)
    }

    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Deliver one chunk as if the encoder produced it
    pub async fn push(&self, data: Vec<u8>) {
        let tx = self
            .sender
            .lock()
            .unwrap()
            .clone()
            .expect("backend is not capturing");
        tx.send(EncodedChunk::new(data, 0)).await.expect("session dropped receiver");
    }

    /// Deliver `count` chunks of `size` bytes each
    pub async fn push_many(&self, count: usize, size: usize) {
        for _ in 0..count {
            self.push(vec![0u8; size]).await;
        }
    }
}

pub struct ScriptedBackend {
    probe: BackendProbe,
    capturing: bool,
    gate: Option<Arc<Notify>>,
    final_chunk: Option<Vec<u8>>,
    stop_delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new(probe: BackendProbe) -> Self {
        Self {
            probe,
            capturing: false,
            gate: None,
            final_chunk: None,
            stop_delay: None,
        }
    }

    /// Hold device acquisition until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Emit this chunk when stopped, like an encoder flushing its last buffer
    pub fn with_final_chunk(mut self, chunk: Vec<u8>) -> Self {
        self.final_chunk = Some(chunk);
        self
    }

    /// Take this long to release the device, like a slow encoder flush
    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<EncodedChunk>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.probe.deny.load(Ordering::SeqCst) {
            bail!("NotAllowedError: Permission denied");
        }

        if self.capturing {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(4096);
        *self.probe.sender.lock().unwrap() = Some(tx);
        self.probe.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.probe.active_handles.fetch_add(1, Ordering::SeqCst);
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }

        let tx = self.probe.sender.lock().unwrap().take();
        if let (Some(tx), Some(chunk)) = (tx, self.final_chunk.clone()) {
            tx.send(EncodedChunk::new(chunk, 0)).await?;
        }

        self.probe.active_handles.fetch_sub(1, Ordering::SeqCst);
        self.capturing = false;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn mime_type(&self) -> &str {
        "audio/webm"
    }

    fn finalize_container(&self, _blob: &mut [u8]) {}
}

/// Small limits so tests don't allocate megabytes:
/// 1000 bytes hard, 500 soft, 2 min hard, 1 min soft, 8 bps
pub fn small_policy() -> LimitPolicy {
    LimitPolicy {
        max_size_bytes: 1000,
        max_duration_minutes: 2.0,
        warning_size_bytes: 500,
        warning_duration_minutes: 1.0,
        estimated_bitrate_bps: 8,
    }
}

pub fn session_config(policy: LimitPolicy) -> SessionConfig {
    SessionConfig {
        policy,
        monitor_interval: Duration::from_secs(1),
        finalize_grace: Duration::from_millis(100),
        event_capacity: 64,
    }
}

pub const MB: usize = MEGABYTE as usize;

use super::artifact::{AudioArtifact, ChunkBuffer, ObjectUrlRegistry};
use super::config::{LimitPolicy, SessionConfig};
use super::error::{CaptureError, LimitWarning};
use super::monitor::MonitorHandle;
use super::stats::{CaptureState, SessionEvent, SessionSnapshot, WarningView};
use crate::audio::{AudioBackend, EncodedChunk};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// State shared between the session and its background tasks
pub(crate) struct SessionInner {
    pub(crate) state: CaptureState,
    pub(crate) chunks: ChunkBuffer,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) elapsed_minutes: u64,
    pub(crate) warning: Option<LimitWarning>,
    pub(crate) error: Option<CaptureError>,
    pub(crate) artifact: Option<AudioArtifact>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            chunks: ChunkBuffer::new(),
            started_at: None,
            elapsed_minutes: 0,
            warning: None,
            error: None,
            artifact: None,
        }
    }
}

#[derive(Default)]
struct SessionTasks {
    monitor: Option<MonitorHandle>,
    pump: Option<JoinHandle<()>>,
}

/// One microphone, one recording at a time.
///
/// Owns the capture backend, the chunk buffer, the limit monitor and the
/// playback URL of the last finalized recording. Reusable: every `start`
/// after `stop` begins a fresh recording.
pub struct CaptureSession {
    /// Session configuration
    config: SessionConfig,

    /// Capture device, locked across device acquisition and release
    backend: tokio::sync::Mutex<Box<dyn AudioBackend>>,

    /// Held for the whole of `start` and `stop` so they never interleave
    lifecycle: tokio::sync::Mutex<()>,

    /// State shared with the monitor and chunk pump
    inner: Arc<Mutex<SessionInner>>,

    /// Background tasks of the current recording
    tasks: Mutex<SessionTasks>,

    /// Playback URLs
    registry: ObjectUrlRegistry,

    /// Event fan-out
    events: broadcast::Sender<SessionEvent>,
}

impl CaptureSession {
    /// Create a new capture session
    pub fn new(config: SessionConfig, backend: Box<dyn AudioBackend>) -> Result<Self, CaptureError> {
        Self::with_registry(config, backend, ObjectUrlRegistry::new())
    }

    /// Create a session that publishes playback URLs into a shared registry
    pub fn with_registry(
        config: SessionConfig,
        backend: Box<dyn AudioBackend>,
        registry: ObjectUrlRegistry,
    ) -> Result<Self, CaptureError> {
        config.validate()?;

        info!("Creating capture session ({})", backend.name());

        let (events, _) = broadcast::channel(config.event_capacity);

        Ok(Self {
            config,
            backend: tokio::sync::Mutex::new(backend),
            lifecycle: tokio::sync::Mutex::new(()),
            inner: Arc::new(Mutex::new(SessionInner::new())),
            tasks: Mutex::new(SessionTasks::default()),
            registry,
            events,
        })
    }

    /// Start recording
    ///
    /// No-op while a recording is initializing or in progress.
    pub async fn start(&self) -> Result<(), CaptureError> {
        if self.is_active() {
            warn!("Recording already {}", self.state());
            return Ok(());
        }

        // A stop in progress finishes finalizing before a new recording begins
        let _lifecycle = self.lifecycle.lock().await;
        {
            let mut inner = self.inner.lock();
            if matches!(inner.state, CaptureState::Initializing | CaptureState::Recording) {
                warn!("Recording already {}", inner.state);
                return Ok(());
            }

            if let Some(previous) = inner.artifact.take() {
                self.registry.revoke(previous.url());
            }
            inner.error = None;
            inner.warning = None;
            inner.chunks.clear();
            inner.elapsed_minutes = 0;
            inner.started_at = None;
            inner.state = CaptureState::Initializing;
        }
        self.emit(SessionEvent::StateChanged(CaptureState::Initializing));

        let mut backend = self.backend.lock().await;
        info!("Acquiring capture device: {}", backend.name());

        let chunk_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to start {}: {:#}", backend.name(), e);
                let err = CaptureError::Permission {
                    reason: format!("{:#}", e),
                };
                {
                    let mut inner = self.inner.lock();
                    inner.state = CaptureState::Idle;
                    inner.error = Some(err.clone());
                    inner.warning = None;
                }
                self.emit(SessionEvent::StateChanged(CaptureState::Idle));
                self.emit(SessionEvent::Failed(err.clone()));
                return Err(err);
            }
        };
        drop(backend);

        let started = Instant::now();
        let pump = tokio::spawn(pump_chunks(chunk_rx, Arc::clone(&self.inner)));
        let monitor = MonitorHandle::spawn(
            Arc::clone(&self.inner),
            self.events.clone(),
            self.config.policy,
            self.config.monitor_interval,
            started,
        );
        {
            let mut tasks = self.tasks.lock();
            tasks.pump = Some(pump);
            tasks.monitor = Some(monitor);
        }
        {
            let mut inner = self.inner.lock();
            inner.state = CaptureState::Recording;
            inner.started_at = Some(Utc::now());
        }
        self.emit(SessionEvent::StateChanged(CaptureState::Recording));

        info!("Recording started");

        Ok(())
    }

    /// Stop recording and finalize the artifact
    ///
    /// Returns `Ok(None)` when no recording is active. A recording above the
    /// size limit is discarded and reported as `SizeExceeded`.
    pub async fn stop(&self) -> Result<Option<AudioArtifact>, CaptureError> {
        if !self.is_recording() {
            warn!("Recording not active ({})", self.state());
            return Ok(None);
        }

        let _lifecycle = self.lifecycle.lock().await;
        {
            let mut inner = self.inner.lock();
            if inner.state != CaptureState::Recording {
                warn!("Recording not active ({})", inner.state);
                return Ok(None);
            }
            inner.state = CaptureState::Stopped;
        }
        self.emit(SessionEvent::StateChanged(CaptureState::Stopped));

        info!("Stopping recording");

        let (monitor, pump) = {
            let mut tasks = self.tasks.lock();
            (tasks.monitor.take(), tasks.pump.take())
        };

        if let Some(monitor) = monitor {
            monitor.shutdown().await;
        }

        let mut backend = self.backend.lock().await;
        if let Err(e) = backend.stop().await {
            error!("Failed to stop {}: {:#}", backend.name(), e);
        }

        if let Some(mut pump) = pump {
            let grace = self.config.finalize_grace;
            if tokio::time::timeout(grace, &mut pump).await.is_err() {
                warn!("Encoder did not flush within {:?}, finalizing buffered chunks", grace);
                pump.abort();
            }
        }

        let mut blob = self.inner.lock().chunks.take();
        backend.finalize_container(&mut blob);
        let mime_type = backend.mime_type().to_string();
        drop(backend);

        self.finalize(blob, mime_type)
    }

    fn finalize(&self, blob: Vec<u8>, mime_type: String) -> Result<Option<AudioArtifact>, CaptureError> {
        let policy = &self.config.policy;
        let size_bytes = blob.len() as u64;

        if size_bytes > policy.max_size_bytes {
            let err = CaptureError::SizeExceeded {
                size_bytes,
                max_size_bytes: policy.max_size_bytes,
                estimated_minutes: policy.estimate_minutes(size_bytes),
                max_duration_minutes: policy.max_duration_minutes,
            };
            warn!("{}", err);
            self.inner.lock().error = Some(err.clone());
            self.emit(SessionEvent::Failed(err.clone()));
            return Err(err);
        }

        let blob: Arc<[u8]> = blob.into();
        let url = self.registry.create_url(Arc::clone(&blob), &mime_type);
        let artifact = AudioArtifact::new(blob, url, mime_type);

        let had_warning = {
            let mut inner = self.inner.lock();
            if let Some(previous) = inner.artifact.replace(artifact.clone()) {
                self.registry.revoke(previous.url());
            }
            inner.warning.take().is_some()
        };

        if had_warning {
            self.emit(SessionEvent::WarningChanged(None));
        }
        self.emit(SessionEvent::ArtifactReady(artifact.info()));

        info!(
            "Recording finalized: {} bytes ({})",
            artifact.size_bytes(),
            artifact.mime_type()
        );

        Ok(Some(artifact))
    }

    /// Discard the finalized recording and any error or warning.
    ///
    /// Leaves an in-progress capture running.
    pub fn clear_recording(&self) {
        let mut inner = self.inner.lock();
        if let Some(artifact) = inner.artifact.take() {
            self.registry.revoke(artifact.url());
        }
        inner.error = None;
        inner.warning = None;
        inner.elapsed_minutes = 0;
        debug!("Recording state cleared");
    }

    pub fn state(&self) -> CaptureState {
        self.inner.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == CaptureState::Recording
    }

    pub fn is_initializing(&self) -> bool {
        self.state() == CaptureState::Initializing
    }

    fn is_active(&self) -> bool {
        matches!(self.state(), CaptureState::Initializing | CaptureState::Recording)
    }

    pub fn warning(&self) -> Option<LimitWarning> {
        self.inner.lock().warning.clone()
    }

    pub fn error(&self) -> Option<CaptureError> {
        self.inner.lock().error.clone()
    }

    pub fn artifact(&self) -> Option<AudioArtifact> {
        self.inner.lock().artifact.clone()
    }

    pub fn elapsed_minutes(&self) -> u64 {
        self.inner.lock().elapsed_minutes
    }

    /// Whether the limit monitor is running
    pub fn is_monitoring(&self) -> bool {
        self.tasks.lock().monitor.is_some()
    }

    pub fn policy(&self) -> &LimitPolicy {
        &self.config.policy
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Get current session snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            state: inner.state,
            is_recording: inner.state == CaptureState::Recording,
            started_at: inner.started_at,
            elapsed_minutes: inner.elapsed_minutes,
            buffered_bytes: inner.chunks.total_bytes(),
            chunk_count: inner.chunks.len(),
            warning: inner.warning.as_ref().map(WarningView::from),
            error: inner.error.as_ref().map(|e| e.to_string()),
            artifact: inner.artifact.as_ref().map(|a| a.info()),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut();
        if let Some(monitor) = tasks.monitor.take() {
            monitor.cancel();
        }
        if let Some(pump) = tasks.pump.take() {
            pump.abort();
        }
        if let Some(artifact) = self.inner.lock().artifact.take() {
            self.registry.revoke(artifact.url());
        }
    }
}

/// Move chunks from the backend into the session buffer until the stream closes
async fn pump_chunks(mut chunk_rx: mpsc::Receiver<EncodedChunk>, inner: Arc<Mutex<SessionInner>>) {
    while let Some(chunk) = chunk_rx.recv().await {
        inner.lock().chunks.push(chunk.data);
    }
    debug!("Chunk stream closed");
}

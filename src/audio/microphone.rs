// Microphone backend using cpal
//
// cpal streams are not Send, so each capture runs on a dedicated thread that
// owns the stream for its whole life. The thread reports device readiness
// through a oneshot and flushes buffered samples as WAV chunks.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, EncodedChunk};
use super::encoder::{self, WavChunkEncoder};

/// Default input device backend
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self { config, worker: None }
    }

    /// List available input device names
    pub fn list_devices() -> Vec<String> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<EncodedChunk>> {
        if self.worker.is_some() {
            bail!("Already capturing");
        }
        self.config.validate()?;

        info!("Requesting microphone access");

        let (chunk_tx, chunk_rx) = mpsc::channel(self.config.channel_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let flush_interval = Duration::from_millis(self.config.flush_interval_ms);

        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_capture(flush_interval, chunk_tx, ready_tx, stop_rx))
            .context("Failed to spawn capture thread")?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop_tx, thread });
                info!("Microphone capture started");
                Ok(chunk_rx)
            }
            Ok(Err(e)) => {
                join_thread(thread).await?;
                Err(e)
            }
            Err(_) => {
                join_thread(thread).await?;
                bail!("Capture thread exited before the device started")
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        info!("Stopping microphone capture");

        // A closed channel means the thread already exited
        let _ = worker.stop_tx.send(());
        join_thread(worker.thread).await?;

        info!("Microphone released");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
        }
    }
}

async fn join_thread(thread: JoinHandle<()>) -> Result<()> {
    tokio::task::spawn_blocking(move || thread.join())
        .await
        .context("Capture join task failed")?
        .map_err(|_| anyhow!("Capture thread panicked"))
}

fn run_capture(
    flush_interval: Duration,
    chunk_tx: mpsc::Sender<EncodedChunk>,
    ready_tx: oneshot::Sender<Result<()>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let pending = Arc::new(Mutex::new(Vec::new()));

    let (stream, wav) = match open_input_stream(Arc::clone(&pending)) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow!(e).context("Failed to start input stream")));
        return;
    }

    let header = match wav.header() {
        Ok(header) => header,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let started = Instant::now();
    if chunk_tx.blocking_send(EncodedChunk::new(header, 0)).is_err() {
        let _ = ready_tx.send(Err(anyhow!("Chunk receiver closed before capture started")));
        return;
    }

    if ready_tx.send(Ok(())).is_err() {
        warn!("Capture start was abandoned, releasing device");
        return;
    }

    loop {
        match stop_rx.recv_timeout(flush_interval) {
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                if !flush(&pending, &wav, started, &chunk_tx) {
                    warn!("Chunk receiver dropped, ending capture");
                    break;
                }
            }
            _ => break,
        }
    }

    // Releases the device before the last flush
    drop(stream);
    flush(&pending, &wav, started, &chunk_tx);
}

fn flush(
    pending: &Mutex<Vec<i16>>,
    wav: &WavChunkEncoder,
    started: Instant,
    chunk_tx: &mpsc::Sender<EncodedChunk>,
) -> bool {
    let samples = std::mem::take(&mut *pending.lock());
    if samples.is_empty() {
        return true;
    }

    let chunk = EncodedChunk::new(wav.encode(&samples), started.elapsed().as_millis() as u64);
    chunk_tx.blocking_send(chunk).is_ok()
}

fn open_input_stream(pending: Arc<Mutex<Vec<i16>>>) -> Result<(cpal::Stream, WavChunkEncoder)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;

    if let Ok(name) = device.name() {
        info!("Input device: {}", name);
    }

    let supported = device
        .default_input_config()
        .context("Failed to query input device configuration")?;

    let channels = supported.channels() as usize;
    let sample_rate = supported.sample_rate().0;
    let stream_config: cpal::StreamConfig = supported.config();
    let err_fn = |err: cpal::StreamError| error!("Input stream error: {}", err);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.lock().extend(encoder::downmix_f32(data, channels));
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                pending.lock().extend(encoder::downmix_i16(data, channels));
            },
            err_fn,
            None,
        ),
        other => bail!("Unsupported input sample format: {:?}", other),
    }
    .context("Failed to open input stream")?;

    info!("Capturing {}Hz, {} channel(s) downmixed to mono", sample_rate, channels);

    Ok((stream, WavChunkEncoder::new(sample_rate, 1)))
}

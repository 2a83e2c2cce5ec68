use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, EncodedChunk};
use super::encoder::{downmix_i16, WavChunkEncoder};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            bail!(
                "Expected 16-bit PCM WAV, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    pub fn to_mono(&self) -> Vec<i16> {
        downmix_i16(&self.samples, self.channels as usize)
    }
}

/// Replays a WAV file as if it were a live capture device
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    paced: bool,
    task: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
}

impl FileBackend {
    /// `paced` replays in real time; otherwise chunks are emitted as fast as
    /// the receiver accepts them.
    pub fn new(path: impl Into<PathBuf>, config: AudioBackendConfig, paced: bool) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            bail!("Audio file not found: {}", path.display());
        }

        Ok(Self {
            path,
            config,
            paced,
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<EncodedChunk>> {
        if self.task.is_some() {
            bail!("Already capturing");
        }
        self.config.validate()?;

        let file = AudioFile::open(&self.path)?;
        let wav = WavChunkEncoder::new(file.sample_rate, 1);
        let samples = file.to_mono();

        let flush_ms = self.config.flush_interval_ms;
        let samples_per_chunk = ((file.sample_rate as u64 * flush_ms) / 1000).max(1) as usize;
        let paced = self.paced;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let (stop_tx, mut stop_rx) = oneshot::channel();

        tx.send(EncodedChunk::new(wav.header()?, 0))
            .await
            .context("Chunk receiver closed before replay started")?;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(flush_ms));
            ticker.tick().await;

            for (index, slice) in samples.chunks(samples_per_chunk).enumerate() {
                if paced {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = ticker.tick() => {}
                    }
                } else if stop_rx.try_recv().is_ok() {
                    break;
                }

                let timestamp_ms = (index as u64 + 1) * flush_ms;
                if tx.send(EncodedChunk::new(wav.encode(slice), timestamp_ms)).await.is_err() {
                    break;
                }
            }

            info!("File replay finished");
        });

        self.task = Some((stop_tx, handle));

        info!("Replaying {} as capture input", self.path.display());

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some((stop_tx, handle)) = self.task.take() else {
            return Ok(());
        };

        let _ = stop_tx.send(());
        handle.await.context("File replay task panicked")?;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "WAV file replay"
    }
}

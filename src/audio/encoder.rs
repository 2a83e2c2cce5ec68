// Streaming WAV encoding
//
// The recording is delivered as a sequence of chunks: a 16-bit PCM WAV header
// with zero data length, then raw little-endian PCM payloads. Once the chunks
// are concatenated the RIFF and data lengths are patched in place.

use anyhow::{Context, Result};
use std::io::Cursor;

pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Encodes mono or interleaved i16 samples into WAV chunks
#[derive(Debug, Clone, Copy)]
pub struct WavChunkEncoder {
    sample_rate: u32,
    channels: u16,
}

impl WavChunkEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Header chunk with placeholder lengths
    pub fn header(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let writer = hound::WavWriter::new(&mut cursor, spec)
            .context("Failed to create WAV header")?;
        writer.finalize().context("Failed to finalize WAV header")?;

        Ok(cursor.into_inner())
    }

    /// PCM payload chunk
    pub fn encode(&self, samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Bytes of PCM per second of audio
    pub fn byte_rate(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * 2
    }
}

/// Patch RIFF and `data` chunk lengths of an assembled WAV blob.
///
/// Blobs that are not RIFF/WAVE are left untouched.
pub fn finalize_wav(blob: &mut [u8]) {
    if blob.len() < 12 || &blob[0..4] != b"RIFF" || &blob[8..12] != b"WAVE" {
        return;
    }

    let riff_len = (blob.len() - 8) as u32;
    blob[4..8].copy_from_slice(&riff_len.to_le_bytes());

    let mut pos = 12;
    while pos + 8 <= blob.len() {
        let id = [blob[pos], blob[pos + 1], blob[pos + 2], blob[pos + 3]];
        let size = u32::from_le_bytes([blob[pos + 4], blob[pos + 5], blob[pos + 6], blob[pos + 7]]);

        if &id == b"data" {
            let data_len = (blob.len() - pos - 8) as u32;
            blob[pos + 4..pos + 8].copy_from_slice(&data_len.to_le_bytes());
            return;
        }

        // Chunks are word aligned
        pos += 8 + size as usize + (size as usize & 1);
    }
}

/// Downmix interleaved f32 samples to mono i16
pub fn downmix_f32(data: &[f32], channels: usize) -> Vec<i16> {
    let channels = channels.max(1);
    data.chunks(channels)
        .map(|frame| {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            (mono.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })
        .collect()
}

/// Downmix interleaved i16 samples to mono i16
pub fn downmix_i16(data: &[i16], channels: usize) -> Vec<i16> {
    let channels = channels.max(1);
    if channels == 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

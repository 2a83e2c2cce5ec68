// Tests for chunk buffering, playback URLs and WAV container finalization

use anyhow::Result;
use practice_recorder::audio::{finalize_wav, WavChunkEncoder};
use practice_recorder::session::{ChunkBuffer, ObjectUrlRegistry, URL_PREFIX};
use std::io::Cursor;
use std::sync::Arc;

#[test]
fn test_chunk_buffer_preserves_order_and_size() {
    let mut buffer = ChunkBuffer::new();

    assert!(buffer.push(vec![1, 2, 3]));
    assert!(!buffer.push(Vec::new()), "Empty chunks are dropped");
    assert!(buffer.push(vec![4, 5]));

    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.total_bytes(), 5);

    let blob = buffer.take();

    assert_eq!(blob, vec![1, 2, 3, 4, 5]);
    assert!(buffer.is_empty());
    assert_eq!(buffer.total_bytes(), 0);
}

#[test]
fn test_chunk_buffer_clear() {
    let mut buffer = ChunkBuffer::new();
    buffer.push(vec![0; 10]);

    buffer.clear();

    assert!(buffer.is_empty());
    assert_eq!(buffer.total_bytes(), 0);
    assert!(buffer.take().is_empty());
}

#[test]
fn test_registry_create_resolve_revoke() {
    let registry = ObjectUrlRegistry::new();
    let blob: Arc<[u8]> = vec![7u8; 16].into();

    let url = registry.create_url(Arc::clone(&blob), "audio/wav");

    assert!(url.starts_with(URL_PREFIX));
    assert_eq!(registry.live_count(), 1);

    let (resolved, mime) = registry.resolve(&url).expect("URL should resolve");
    assert_eq!(&resolved[..], &blob[..]);
    assert_eq!(mime, "audio/wav");

    assert!(registry.revoke(&url));
    assert!(!registry.revoke(&url), "Second revoke is a no-op");
    assert!(registry.resolve(&url).is_none());
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn test_registry_urls_are_unique() {
    let registry = ObjectUrlRegistry::new();
    let blob: Arc<[u8]> = vec![0u8; 4].into();

    let a = registry.create_url(Arc::clone(&blob), "audio/wav");
    let b = registry.create_url(blob, "audio/wav");

    assert_ne!(a, b);
    assert_eq!(registry.live_count(), 2);

    let id = a.strip_prefix(URL_PREFIX).unwrap();
    assert_eq!(ObjectUrlRegistry::url_for_id(id), a);
}

#[test]
fn test_registry_clones_share_entries() {
    let registry = ObjectUrlRegistry::new();
    let shared = registry.clone();

    let url = registry.create_url(vec![1u8].into(), "audio/wav");

    assert!(shared.resolve(&url).is_some());
    shared.revoke(&url);
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn test_streamed_wav_chunks_form_valid_file() -> Result<()> {
    let encoder = WavChunkEncoder::new(16000, 1);

    let samples: Vec<i16> = (0..3200).map(|i| (i % 200) as i16 - 100).collect();

    let mut blob = encoder.header()?;
    for slice in samples.chunks(1600) {
        blob.extend(encoder.encode(slice));
    }
    let len_before = blob.len();

    finalize_wav(&mut blob);

    assert_eq!(blob.len(), len_before, "Finalization must not change the size");

    let reader = hound::WavReader::new(Cursor::new(blob))?;
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len() as usize, samples.len());

    let decoded: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(decoded, samples);

    Ok(())
}

#[test]
fn test_finalize_ignores_non_wav_blobs() {
    let mut blob = b"OggS not a wav file".to_vec();
    let original = blob.clone();

    finalize_wav(&mut blob);

    assert_eq!(blob, original);
}

#[test]
fn test_encoder_byte_rate() {
    let encoder = WavChunkEncoder::new(48000, 1);

    assert_eq!(encoder.byte_rate(), 96_000);
    assert_eq!(encoder.encode(&[1, -1]), vec![1, 0, 0xff, 0xff]);
}

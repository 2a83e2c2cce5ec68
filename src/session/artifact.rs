use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Prefix of every playback URL handed out by the registry
pub const URL_PREFIX: &str = "blob:practice/";

/// Encoded chunks of the current recording, in arrival order
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    total_bytes: u64,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn push(&mut self, data: Vec<u8>) -> bool {
        if data.is_empty() {
            return false;
        }
        self.total_bytes += data.len() as u64;
        self.chunks.push(data);
        true
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Concatenate all chunks into one blob, leaving the buffer empty
    pub fn take(&mut self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.total_bytes as usize);
        for chunk in self.chunks.drain(..) {
            blob.extend_from_slice(&chunk);
        }
        self.total_bytes = 0;
        blob
    }
}

/// Finalized recording: the audio bytes plus a revocable playback URL
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    blob: Arc<[u8]>,
    url: String,
    mime_type: String,
}

impl AudioArtifact {
    pub(crate) fn new(blob: Arc<[u8]>, url: String, mime_type: String) -> Self {
        Self { blob, url, mime_type }
    }

    pub fn blob(&self) -> &Arc<[u8]> {
        &self.blob
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.blob.len() as u64
    }

    /// File name used when uploading, derived from the container type
    pub fn file_name(&self) -> &'static str {
        match self.mime_type.as_str() {
            "audio/webm" => "response.webm",
            "audio/ogg" => "response.ogg",
            _ => "response.wav",
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.blob)
            .with_context(|| format!("Failed to write recording to {}", path.display()))
    }

    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            url: self.url.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub url: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
struct RegisteredBlob {
    blob: Arc<[u8]>,
    mime_type: String,
}

/// Mints playback URLs for recorded blobs and keeps them resolvable until
/// revoked
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<Mutex<HashMap<String, RegisteredBlob>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_url(&self, blob: Arc<[u8]>, mime_type: &str) -> String {
        let url = format!("{}{}", URL_PREFIX, uuid::Uuid::new_v4());
        self.entries.lock().insert(
            url.clone(),
            RegisteredBlob {
                blob,
                mime_type: mime_type.to_string(),
            },
        );
        debug!("Created playback URL {}", url);
        url
    }

    /// Returns false if the URL was unknown or already revoked
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.entries.lock().remove(url).is_some();
        if removed {
            debug!("Revoked playback URL {}", url);
        }
        removed
    }

    pub fn resolve(&self, url: &str) -> Option<(Arc<[u8]>, String)> {
        self.entries
            .lock()
            .get(url)
            .map(|entry| (Arc::clone(&entry.blob), entry.mime_type.clone()))
    }

    /// Number of URLs not yet revoked
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn url_for_id(id: &str) -> String {
        format!("{}{}", URL_PREFIX, id)
    }
}

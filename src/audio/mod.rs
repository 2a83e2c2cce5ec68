pub mod backend;
pub mod encoder;
pub mod file;
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioSource, EncodedChunk};
pub use encoder::{finalize_wav, WavChunkEncoder, WAV_MIME_TYPE};
pub use file::{AudioFile, FileBackend};
pub use microphone::MicrophoneBackend;

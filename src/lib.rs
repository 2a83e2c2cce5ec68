pub mod api;
pub mod audio;
pub mod config;
pub mod http;
pub mod session;

pub use api::{ApiClient, ApiError, ResponseRecord};
pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioSource, EncodedChunk,
    FileBackend, MicrophoneBackend, WavChunkEncoder,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use session::{
    AudioArtifact, CaptureError, CaptureSession, CaptureState, LimitPolicy, LimitWarning,
    ObjectUrlRegistry, SessionConfig, SessionEvent, SessionSnapshot,
};

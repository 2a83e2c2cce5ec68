use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::session::{LimitPolicy, SessionConfig};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub limits: LimitPolicy,
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub flush_interval_ms: u64,
    pub channel_capacity: usize,
    pub monitor_interval_ms: u64,
    pub finalize_grace_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 100,
            channel_capacity: 256,
            monitor_interval_ms: 1000,
            finalize_grace_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl Config {
    /// Load `path` (any format the config crate detects from the extension)
    /// with `PRACTICE__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PRACTICE").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.backend_config().validate()?;
        cfg.session_config().validate()?;

        Ok(cfg)
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            flush_interval_ms: self.audio.flush_interval_ms,
            channel_capacity: self.audio.channel_capacity,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            policy: self.limits,
            monitor_interval: Duration::from_millis(self.audio.monitor_interval_ms),
            finalize_grace: Duration::from_millis(self.audio.finalize_grace_ms),
            ..SessionConfig::default()
        }
    }
}

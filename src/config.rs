use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::recorder::RecorderConfig;
use crate::stream::StreamConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub stream: StreamSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Base WebSocket URL of the transcription server.
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub recordings_path: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
pub struct StreamSettings {
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "meeting-scribe")?
            .set_default("server.url", "ws://localhost:8765")?
            .set_default("audio.recordings_path", "recordings")?
            .set_default("audio.sample_rate", 16000)?
            .set_default("audio.channels", 1)?
            .set_default("stream.max_reconnect_attempts", 5)?
            .set_default("stream.reconnect_base_delay_ms", 1000)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Full URL of the transcription endpoint.
    pub fn endpoint_url(&self) -> String {
        format!("{}/ws/transcribe", self.server.url.trim_end_matches('/'))
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            stream: StreamConfig {
                endpoint: self.endpoint_url(),
                max_reconnect_attempts: self.stream.max_reconnect_attempts,
                reconnect_base_delay: Duration::from_millis(self.stream.reconnect_base_delay_ms),
            },
            recordings_dir: PathBuf::from(&self.audio.recordings_path),
        }
    }
}

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::DeviceError;

use super::capture::SAMPLE_RATE;

/// How much audio each device block carries (100ms at 16kHz).
const BLOCK_SAMPLES: usize = 1600;

/// An exclusive audio input device.
///
/// `acquire` hands back a stream of arbitrarily sized blocks of mono
/// 16kHz PCM samples; [`super::AudioCaptureChannel`] reframes them into
/// fixed-size frames. `release` must be safe to call at any point after
/// `acquire`, including after the stream has already ended.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + 'static {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<Vec<i16>>, DeviceError>;

    async fn release(&mut self);

    /// Device name for logging.
    fn name(&self) -> &str;
}

/// Streams a WAV file as if it were a live microphone, pacing blocks in
/// real time. Used by the binary and for batch re-transcription.
pub struct WavFileDevice {
    path: PathBuf,
    producer: Option<JoinHandle<()>>,
}

impl WavFileDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            producer: None,
        }
    }

    fn read_samples(&self) -> Result<Vec<i16>, DeviceError> {
        let mut reader = hound::WavReader::open(&self.path).map_err(|e| match e {
            hound::Error::IoError(io) if io.kind() == ErrorKind::NotFound => {
                DeviceError::NotFound
            }
            hound::Error::IoError(io) if io.kind() == ErrorKind::PermissionDenied => {
                DeviceError::PermissionDenied
            }
            other => DeviceError::Backend(other.to_string()),
        })?;

        let spec = reader.spec();
        if spec.channels != 1
            || spec.sample_rate != SAMPLE_RATE
            || spec.bits_per_sample != 16
        {
            return Err(DeviceError::Backend(format!(
                "expected 16kHz mono 16-bit WAV, got {}Hz {}ch {}-bit",
                spec.sample_rate, spec.channels, spec.bits_per_sample
            )));
        }

        reader
            .samples::<i16>()
            .collect::<Result<Vec<i16>, _>>()
            .map_err(|e| DeviceError::Backend(e.to_string()))
    }
}

#[async_trait::async_trait]
impl CaptureDevice for WavFileDevice {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<Vec<i16>>, DeviceError> {
        if self.producer.is_some() {
            return Err(DeviceError::AlreadyInUse);
        }

        let samples = self.read_samples()?;
        info!(
            "WAV input acquired: {:?} ({:.1}s)",
            self.path,
            samples.len() as f64 / SAMPLE_RATE as f64
        );

        let (tx, rx) = mpsc::channel(8);
        self.producer = Some(tokio::spawn(async move {
            let block_duration =
                Duration::from_millis(BLOCK_SAMPLES as u64 * 1000 / SAMPLE_RATE as u64);
            let mut ticker = tokio::time::interval(block_duration);

            for block in samples.chunks(BLOCK_SAMPLES) {
                ticker.tick().await;
                if tx.send(block.to_vec()).await.is_err() {
                    return;
                }
            }
        }));

        Ok(rx)
    }

    async fn release(&mut self) {
        if let Some(task) = self.producer.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("WAV producer task failed: {}", e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.path.to_str().unwrap_or("wav-input")
    }
}

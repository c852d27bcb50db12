use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::DeviceError;

use super::device::CaptureDevice;

/// Samples per frame sent to the transcription server (~256ms at 16kHz).
pub const FRAME_SAMPLES: usize = 4096;

/// Sample rate the server expects (Whisper models are trained on 16kHz).
pub const SAMPLE_RATE: u32 = 16_000;

/// One fixed-size buffer of mono 16-bit PCM audio.
///
/// Frames are immutable once emitted; `sequence` increases monotonically
/// per channel instance and defines the end-to-end transmission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Raw samples (i16 PCM, mono), always [`FRAME_SAMPLES`] long.
    pub samples: Vec<i16>,
    /// Capture order, starting at 0.
    pub sequence: u64,
    /// Milliseconds since recording start, derived from the sequence.
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Encode samples as little-endian PCM16 bytes for the wire.
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Acquires an audio input device and emits fixed-size PCM frames.
///
/// The device is exclusively owned by this channel between `open` and
/// `close`. `pause` halts frame production without releasing the device;
/// samples arriving while paused are discarded.
pub struct AudioCaptureChannel {
    device: Box<dyn CaptureDevice>,
    paused: Arc<AtomicBool>,
    framing_task: Option<JoinHandle<()>>,
    open: bool,
}

impl AudioCaptureChannel {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            paused: Arc::new(AtomicBool::new(false)),
            framing_task: None,
            open: false,
        }
    }

    /// Acquire the device and start producing frames.
    ///
    /// On failure the device is left released; the channel stays closed.
    pub async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>, DeviceError> {
        if self.open {
            return Err(DeviceError::AlreadyInUse);
        }

        let mut samples_rx = self.device.acquire().await?;
        info!("Audio capture opened: {}", self.device.name());

        self.paused.store(false, Ordering::SeqCst);
        self.open = true;

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let paused = Arc::clone(&self.paused);

        self.framing_task = Some(tokio::spawn(async move {
            let mut buffer: Vec<i16> = Vec::with_capacity(FRAME_SAMPLES * 2);
            let mut sequence: u64 = 0;

            while let Some(block) = samples_rx.recv().await {
                if paused.load(Ordering::SeqCst) {
                    continue;
                }

                buffer.extend_from_slice(&block);

                while buffer.len() >= FRAME_SAMPLES {
                    let samples: Vec<i16> = buffer.drain(..FRAME_SAMPLES).collect();
                    let frame = AudioFrame {
                        samples,
                        sequence,
                        timestamp_ms: sequence * (FRAME_SAMPLES as u64 * 1000)
                            / SAMPLE_RATE as u64,
                    };
                    sequence += 1;

                    if frame_tx.send(frame).await.is_err() {
                        // Receiver gone: recording is shutting down.
                        return;
                    }
                }
            }
            // Trailing partial frame is dropped; frames are fixed-size.
        }));

        Ok(frame_rx)
    }

    /// Halt frame production; the device stays acquired.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Restart frame production after a pause.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Release the device. Idempotent, runs on every exit path, never
    /// errors (problems are logged).
    pub async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        self.device.release().await;

        if let Some(task) = self.framing_task.take() {
            // The sample stream just closed, so the framer exits on its own;
            // abort covers a framer stuck on a full frame channel.
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Framing task failed during close: {}", e);
                }
            }
        }

        info!("Audio capture closed: {}", self.device.name());
    }
}

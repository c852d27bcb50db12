use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::{
    AudioCaptureChannel, AudioFrame, CaptureDevice, RecordingArtifact, RecordingWriter,
};
use crate::error::{RecorderError, StreamError};
use crate::stream::{
    SessionCommand, SessionEvent, SessionHandle, StreamConfig, StreamingSession, Transport,
};
use crate::transcript::TranscriptReconciler;

use super::clock::ElapsedClock;
use super::sink::{SummarySink, TranscriptSink};
use super::waveform::WaveformSampler;
use super::RecordingState;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Streaming session policy (endpoint, reconnect limits).
    pub stream: StreamConfig,
    /// Where finished WAV artifacts land.
    pub recordings_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            recordings_dir: PathBuf::from("recordings"),
        }
    }
}

/// Point-in-time view of a recording.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingStats {
    pub recording_id: String,
    pub state: RecordingState,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub frames_captured: u64,
    pub segments_delivered: usize,
}

struct ActiveRecording {
    session: SessionHandle,
    pump: JoinHandle<Option<RecordingArtifact>>,
    events: JoinHandle<()>,
}

/// The recording state machine.
///
/// `Idle → Recording → {Paused ⇄ Recording} → Stopped`, with `start()`
/// the only way back into `Recording` from `Stopped`. Owns the capture
/// channel, the per-recording streaming session, and the reconciliation
/// pipeline; component errors arrive on the controller's error channel
/// rather than crossing boundaries as panics.
pub struct RecordingController<T: Transport> {
    config: RecorderConfig,
    transport: T,
    state: RecordingState,
    recording_id: String,
    started_at: Option<DateTime<Utc>>,
    capture: AudioCaptureChannel,
    active: Option<ActiveRecording>,
    clock: ElapsedClock,
    transcript: Arc<Mutex<Box<dyn TranscriptSink>>>,
    summary: Arc<Mutex<Box<dyn SummarySink>>>,
    waveform: Arc<Mutex<WaveformSampler>>,
    waveform_rx: watch::Receiver<Vec<f32>>,
    frames_captured: Arc<AtomicU64>,
    segments_delivered: Arc<AtomicUsize>,
    errors_tx: mpsc::Sender<RecorderError>,
    errors_rx: mpsc::Receiver<RecorderError>,
    artifact: Option<RecordingArtifact>,
}

impl<T: Transport> RecordingController<T> {
    pub fn new(
        config: RecorderConfig,
        transport: T,
        device: Box<dyn CaptureDevice>,
        transcript: Box<dyn TranscriptSink>,
        summary: Box<dyn SummarySink>,
    ) -> Self {
        let (sampler, waveform_rx) = WaveformSampler::new();
        let (errors_tx, errors_rx) = mpsc::channel(64);

        Self {
            config,
            transport,
            state: RecordingState::Idle,
            recording_id: String::new(),
            started_at: None,
            capture: AudioCaptureChannel::new(device),
            active: None,
            clock: ElapsedClock::new(),
            transcript: Arc::new(Mutex::new(transcript)),
            summary: Arc::new(Mutex::new(summary)),
            waveform: Arc::new(Mutex::new(sampler)),
            waveform_rx,
            frames_captured: Arc::new(AtomicU64::new(0)),
            segments_delivered: Arc::new(AtomicUsize::new(0)),
            errors_tx,
            errors_rx,
            artifact: None,
        }
    }

    /// Begin a new recording. Valid from `Idle` or `Stopped`.
    ///
    /// Opens the capture device, spawns a fresh streaming session, and
    /// starts the clock, waveform sampling, and the WAV artifact writer.
    /// A device failure aborts the transition and leaves the controller
    /// in `Idle`; an artifact-writer failure is only a warning.
    pub async fn start(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecordingState::Idle | RecordingState::Stopped => {}
            state => return Err(RecorderError::InvalidState { op: "start", state }),
        }

        // Fresh transcript state for the new recording.
        self.transcript
            .lock()
            .expect("transcript lock poisoned")
            .reset();
        self.waveform
            .lock()
            .expect("waveform lock poisoned")
            .reset();
        self.frames_captured.store(0, Ordering::SeqCst);
        self.segments_delivered.store(0, Ordering::SeqCst);
        self.artifact = None;
        self.recording_id = format!("recording-{}", uuid::Uuid::new_v4());

        let frames_rx = self.capture.open().await?;

        let (event_tx, event_rx) = mpsc::channel(64);
        let session = StreamingSession::spawn(
            self.transport.clone(),
            self.config.stream.clone(),
            event_tx,
        );

        let artifact_path = self
            .config
            .recordings_dir
            .join(format!("{}.wav", self.recording_id));
        let writer = match RecordingWriter::create(artifact_path) {
            Ok(w) => Some(w),
            Err(e) => {
                // Recording proceeds without the artifact.
                warn!("Recording artifact disabled: {:#}", e);
                let _ = self
                    .errors_tx
                    .try_send(RecorderError::Audio(format!("artifact disabled: {e}")));
                None
            }
        };

        let pump = tokio::spawn(Self::pump_frames(
            frames_rx,
            session.sender(),
            writer,
            Arc::clone(&self.waveform),
            Arc::clone(&self.frames_captured),
        ));
        let events = tokio::spawn(Self::pump_events(
            event_rx,
            Arc::clone(&self.transcript),
            Arc::clone(&self.summary),
            Arc::clone(&self.segments_delivered),
            self.errors_tx.clone(),
        ));

        self.active = Some(ActiveRecording {
            session,
            pump,
            events,
        });
        self.clock.start();
        self.started_at = Some(Utc::now());
        self.state = RecordingState::Recording;

        info!("Recording started: {}", self.recording_id);
        Ok(())
    }

    /// Halt capture and the clock. The connection stays open; no audio is
    /// transmitted while paused. Valid from `Recording`.
    pub fn pause(&mut self) -> Result<(), RecorderError> {
        if self.state != RecordingState::Recording {
            return Err(RecorderError::InvalidState {
                op: "pause",
                state: self.state,
            });
        }

        self.capture.pause();
        self.clock.pause();
        self.state = RecordingState::Paused;

        info!("Recording paused: {}", self.recording_id);
        Ok(())
    }

    /// Resume capture without renegotiating the connection. Valid from
    /// `Paused`.
    pub fn resume(&mut self) -> Result<(), RecorderError> {
        if self.state != RecordingState::Paused {
            return Err(RecorderError::InvalidState {
                op: "resume",
                state: self.state,
            });
        }

        self.capture.resume();
        self.clock.resume();
        self.state = RecordingState::Recording;

        info!("Recording resumed: {}", self.recording_id);
        Ok(())
    }

    /// End the recording: send the end-of-utterance marker, disconnect
    /// (discarding any still-queued audio), release the device, and
    /// finalize the WAV artifact. Valid from `Recording` or `Paused`.
    pub async fn stop(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecordingState::Recording | RecordingState::Paused => {}
            state => return Err(RecorderError::InvalidState { op: "stop", state }),
        }

        self.clock.pause();

        if let Some(active) = self.active.take() {
            active.session.send_stop().await;
            active.session.disconnect().await;

            // Releasing the device ends the frame pump, which finalizes
            // the artifact on its way out.
            self.capture.close().await;

            match active.pump.await {
                Ok(artifact) => self.artifact = artifact,
                Err(e) => warn!("Frame pump task failed: {}", e),
            }
            active.session.join().await;
            if let Err(e) = active.events.await {
                warn!("Event task failed: {}", e);
            }
        } else {
            self.capture.close().await;
        }

        self.state = RecordingState::Stopped;
        info!(
            "Recording stopped: {} ({}s, {} segments)",
            self.recording_id,
            self.clock.elapsed_seconds(),
            self.segments_delivered.load(Ordering::SeqCst)
        );
        Ok(())
    }

    /// Discard the artifact and transcript; back to `Idle`. Valid from
    /// `Stopped` or `Idle`.
    pub fn delete(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecordingState::Stopped | RecordingState::Idle => {}
            state => return Err(RecorderError::InvalidState { op: "delete", state }),
        }

        if let Some(artifact) = self.artifact.take() {
            if let Err(e) = std::fs::remove_file(&artifact.file_path) {
                warn!("Failed to remove artifact {:?}: {}", artifact.file_path, e);
            }
        }
        self.transcript
            .lock()
            .expect("transcript lock poisoned")
            .reset();
        self.waveform
            .lock()
            .expect("waveform lock poisoned")
            .reset();
        self.clock.reset();
        self.started_at = None;
        self.state = RecordingState::Idle;

        info!("Recording deleted");
        Ok(())
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.clock.elapsed_seconds()
    }

    /// The finished WAV artifact, available after `stop()`.
    pub fn artifact(&self) -> Option<&RecordingArtifact> {
        self.artifact.as_ref()
    }

    /// Live waveform levels for the display.
    pub fn waveform_levels(&self) -> watch::Receiver<Vec<f32>> {
        self.waveform_rx.clone()
    }

    /// Drain one pending component error, if any.
    pub fn try_next_error(&mut self) -> Option<RecorderError> {
        self.errors_rx.try_recv().ok()
    }

    pub fn stats(&self) -> RecordingStats {
        RecordingStats {
            recording_id: self.recording_id.clone(),
            state: self.state,
            started_at: self.started_at,
            elapsed_secs: self.clock.elapsed_seconds(),
            frames_captured: self.frames_captured.load(Ordering::SeqCst),
            segments_delivered: self.segments_delivered.load(Ordering::SeqCst),
        }
    }

    /// Frame path: capture → session (+ artifact writer + waveform).
    /// Ends when the capture channel closes; returns the finalized
    /// artifact.
    async fn pump_frames(
        mut frames_rx: mpsc::Receiver<AudioFrame>,
        session_tx: mpsc::Sender<SessionCommand>,
        mut writer: Option<RecordingWriter>,
        waveform: Arc<Mutex<WaveformSampler>>,
        frames_captured: Arc<AtomicU64>,
    ) -> Option<RecordingArtifact> {
        while let Some(frame) = frames_rx.recv().await {
            frames_captured.fetch_add(1, Ordering::SeqCst);
            waveform
                .lock()
                .expect("waveform lock poisoned")
                .push(&frame);

            let mut writer_failed = false;
            if let Some(w) = writer.as_mut() {
                if let Err(e) = w.write_frame(&frame) {
                    warn!("Artifact write failed, continuing without: {:#}", e);
                    writer_failed = true;
                }
            }
            if writer_failed {
                writer = None;
            }

            // Ignored once the session has shut down.
            let _ = session_tx.send(SessionCommand::Send(frame)).await;
        }

        match writer.map(RecordingWriter::finalize) {
            Some(Ok(artifact)) => {
                info!(
                    "Artifact finalized: {:?} ({:.1}s)",
                    artifact.file_path, artifact.duration_secs
                );
                Some(artifact)
            }
            Some(Err(e)) => {
                warn!("Failed to finalize artifact: {:#}", e);
                None
            }
            None => None,
        }
    }

    /// Inbound path: session events → reconciler → sinks.
    async fn pump_events(
        mut event_rx: mpsc::Receiver<SessionEvent>,
        transcript: Arc<Mutex<Box<dyn TranscriptSink>>>,
        summary: Arc<Mutex<Box<dyn SummarySink>>>,
        segments_delivered: Arc<AtomicUsize>,
        errors_tx: mpsc::Sender<RecorderError>,
    ) {
        let mut reconciler = TranscriptReconciler::new();

        while let Some(event) = event_rx.recv().await {
            match event {
                SessionEvent::State(state) => {
                    info!("Connection state: {:?}", state);
                }
                SessionEvent::Segments(segments) => {
                    for segment in segments {
                        if reconciler.accept(&segment) {
                            segments_delivered.fetch_add(1, Ordering::SeqCst);
                            transcript
                                .lock()
                                .expect("transcript lock poisoned")
                                .append(segment);
                        }
                    }
                }
                SessionEvent::Summary(text) => {
                    info!("Summary received ({} chars)", text.len());
                    summary.lock().expect("summary lock poisoned").set(text);
                }
                SessionEvent::Error(e) => {
                    match &e {
                        StreamError::Protocol(_) => warn!("{}", e),
                        _ => error!("{}", e),
                    }
                    if errors_tx.try_send(RecorderError::Stream(e)).is_err() {
                        warn!("Error channel full; report dropped");
                    }
                }
            }
        }
    }
}

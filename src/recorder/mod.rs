//! Recording lifecycle
//!
//! [`RecordingController`] is the state machine behind the record button:
//! it owns the capture channel, the streaming session, and the transcript
//! reconciliation pipeline, plus the display-only collaborators (elapsed
//! clock, waveform levels) and the WAV artifact writer.

mod clock;
mod controller;
mod sink;
mod waveform;

pub use clock::ElapsedClock;
pub use controller::{RecorderConfig, RecordingController, RecordingStats};
pub use sink::{MemorySummary, MemoryTranscript, SummarySink, TranscriptSink};
pub use waveform::{WaveformSampler, WAVEFORM_BARS};

use serde::Serialize;

/// Lifecycle of one recording.
///
/// `Stopped` and `Idle` can only re-enter `Recording` through `start()`;
/// there is no resume across a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

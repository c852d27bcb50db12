pub mod audio;
pub mod config;
pub mod error;
pub mod recorder;
pub mod stream;
pub mod transcript;

pub use audio::{
    AudioCaptureChannel, AudioFrame, CaptureDevice, RecordingArtifact, WavFileDevice,
    FRAME_SAMPLES, SAMPLE_RATE,
};
pub use config::Config;
pub use error::{DeviceError, RecorderError, StreamError};
pub use recorder::{
    MemorySummary, MemoryTranscript, RecorderConfig, RecordingController, RecordingState,
    RecordingStats, SummarySink, TranscriptSink,
};
pub use stream::{
    ConnectionState, SessionEvent, StreamConfig, StreamingSession, Transport, WsTransport,
};
pub use transcript::{TranscriptReconciler, TranscriptSegment};

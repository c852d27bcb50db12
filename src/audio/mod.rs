pub mod capture;
pub mod device;
pub mod writer;

pub use capture::{AudioCaptureChannel, AudioFrame, FRAME_SAMPLES, SAMPLE_RATE};
pub use device::{CaptureDevice, WavFileDevice};
pub use writer::{RecordingArtifact, RecordingWriter};

use thiserror::Error;

use crate::recorder::RecordingState;

/// Failure to acquire or operate the audio input device.
///
/// These are fatal to starting a recording and are never retried
/// automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("microphone access denied")]
    PermissionDenied,

    #[error("no audio input device found")]
    NotFound,

    #[error("audio input device is already in use")]
    AlreadyInUse,

    #[error("audio device failure: {0}")]
    Backend(String),
}

/// Errors raised by the streaming session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// Transient connection failure; the session retries with backoff.
    #[error("failed to connect to transcription server: {0}")]
    Connect(String),

    /// A frame could not be written to the socket.
    #[error("failed to send audio to server: {0}")]
    Send(String),

    /// Malformed server message; reported as a warning, session stays up.
    #[error("malformed server message: {0}")]
    Protocol(String),

    /// All reconnect attempts exhausted; the caller must reconnect
    /// explicitly.
    #[error("gave up reconnecting after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Errors surfaced by the recording controller to its caller.
#[derive(Debug, Clone, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Capture-pipeline setup problem (e.g. artifact writer). Non-fatal:
    /// recording proceeds without the affected feature.
    #[error("audio processing warning: {0}")]
    Audio(String),

    #[error("cannot {op} while {state:?}")]
    InvalidState {
        op: &'static str,
        state: RecordingState,
    },
}

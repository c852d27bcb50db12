//! Transcript segment model and reconciliation
//!
//! Incoming segments may arrive twice (server retransmission after a
//! reconnect) or near-twice (same text re-decoded with a fresh id). The
//! reconciler guarantees each segment reaches the transcript sink at most
//! once.

mod reconciler;

pub use reconciler::TranscriptReconciler;

use serde::{Deserialize, Serialize};

/// One timestamped unit of recognized speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Unique within one reconciler instance.
    pub id: String,

    /// Speaker label from the server ("Speaker" when no diarization).
    pub speaker: String,

    /// Transcribed text.
    pub text: String,

    /// Start of the segment, seconds relative to recording start.
    pub start: f64,

    /// End of the segment, seconds relative to recording start.
    pub end: f64,

    /// Human-readable elapsed time ("MM:SS").
    pub timestamp: String,
}

/// Render elapsed whole seconds as "MM:SS".
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(59), "00:59");
        assert_eq!(format_elapsed(61), "01:01");
        assert_eq!(format_elapsed(3600), "60:00");
    }
}

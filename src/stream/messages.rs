use serde::Deserialize;

use crate::transcript::TranscriptSegment;

/// Text frame that tells the server the utterance is finished.
pub const STOP_COMMAND: &str = "stop";

/// JSON records the server sends over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Transcription { segments: Vec<WireSegment> },
    Summary { text: String },
}

/// One segment as it appears on the wire. Carries no id; the client
/// synthesizes one from timing and a text prefix so retransmitted
/// segments collapse to the same id.
#[derive(Debug, Deserialize)]
pub struct WireSegment {
    pub text: String,
    pub speaker: String,
    pub timestamp: String,
    pub start: f64,
    pub end: f64,
}

impl WireSegment {
    pub fn into_segment(self) -> TranscriptSegment {
        let prefix: String = self.text.chars().take(20).collect();
        TranscriptSegment {
            id: format!("whisper-{}-{}-{}", self.start, self.end, prefix),
            speaker: self.speaker,
            text: self.text,
            start: self.start,
            end: self.end,
            timestamp: self.timestamp,
        }
    }
}

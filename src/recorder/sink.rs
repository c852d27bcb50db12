use std::sync::{Arc, Mutex};

use crate::transcript::TranscriptSegment;

/// Where accepted transcript segments go. The UI layer (or a persistence
/// adapter) implements this; the core only appends and resets.
pub trait TranscriptSink: Send + 'static {
    fn append(&mut self, segment: TranscriptSegment);
    fn reset(&mut self);
}

/// Receives the meeting summary the server may push after the stop
/// marker.
pub trait SummarySink: Send + 'static {
    fn set(&mut self, text: String);
}

/// In-memory transcript sink; the backing store stays readable through
/// cloned handles while the sink itself is owned by the pipeline.
#[derive(Clone, Default)]
pub struct MemoryTranscript {
    segments: Arc<Mutex<Vec<TranscriptSegment>>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<TranscriptSegment> {
        self.segments.lock().expect("transcript lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.segments.lock().expect("transcript lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TranscriptSink for MemoryTranscript {
    fn append(&mut self, segment: TranscriptSegment) {
        self.segments
            .lock()
            .expect("transcript lock poisoned")
            .push(segment);
    }

    fn reset(&mut self) {
        self.segments.lock().expect("transcript lock poisoned").clear();
    }
}

/// In-memory summary sink.
#[derive(Clone, Default)]
pub struct MemorySummary {
    text: Arc<Mutex<Option<String>>>,
}

impl MemorySummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.text.lock().expect("summary lock poisoned").clone()
    }
}

impl SummarySink for MemorySummary {
    fn set(&mut self, text: String) {
        *self.text.lock().expect("summary lock poisoned") = Some(text);
    }
}

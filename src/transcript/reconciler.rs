use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::TranscriptSegment;

/// How many recently accepted segments are kept for near-duplicate checks.
const DEDUP_WINDOW: usize = 5;

/// Two segments with identical text closer than this (seconds) are
/// considered the same utterance retransmitted under a different id.
const DEDUP_PROXIMITY_SECS: f64 = 1.0;

/// Merges incoming segments into a duplicate-free transcript.
///
/// Construct one per recording; delivered ids are scoped to the instance.
/// Delivery order is acceptance order, not `start`-time order.
pub struct TranscriptReconciler {
    delivered_ids: HashSet<String>,
    recent: VecDeque<TranscriptSegment>,
    accepted_count: usize,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self {
            delivered_ids: HashSet::new(),
            recent: VecDeque::with_capacity(DEDUP_WINDOW),
            accepted_count: 0,
        }
    }

    /// Decide whether `segment` is new. Returns `true` when the segment
    /// should be delivered downstream.
    ///
    /// A segment is rejected when its id was already delivered, or when its
    /// text exactly matches a recently accepted segment starting within
    /// [`DEDUP_PROXIMITY_SECS`] of it. The proximity rule catches
    /// retransmissions that arrive with a fresh id after a reconnect.
    pub fn accept(&mut self, segment: &TranscriptSegment) -> bool {
        if self.delivered_ids.contains(&segment.id) {
            debug!("Dropping duplicate segment id: {}", segment.id);
            return false;
        }

        let near_duplicate = self.recent.iter().any(|recent| {
            recent.text == segment.text
                && (recent.start - segment.start).abs() < DEDUP_PROXIMITY_SECS
        });
        if near_duplicate {
            debug!(
                "Dropping near-duplicate segment at {:.1}s: {}",
                segment.start, segment.text
            );
            return false;
        }

        self.delivered_ids.insert(segment.id.clone());
        if self.recent.len() == DEDUP_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(segment.clone());
        self.accepted_count += 1;

        true
    }

    /// Number of segments accepted so far.
    pub fn accepted_count(&self) -> usize {
        self.accepted_count
    }
}

impl Default for TranscriptReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, text: &str, start: f64) -> TranscriptSegment {
        TranscriptSegment {
            id: id.to_string(),
            speaker: "Speaker".to_string(),
            text: text.to_string(),
            start,
            end: start + 1.5,
            timestamp: "00:10".to_string(),
        }
    }

    #[test]
    fn test_same_id_delivered_once() {
        let mut reconciler = TranscriptReconciler::new();

        assert!(reconciler.accept(&segment("a", "Hello world", 10.0)));
        assert!(!reconciler.accept(&segment("a", "Hello world", 10.0)));
        assert_eq!(reconciler.accepted_count(), 1);
    }

    #[test]
    fn test_near_duplicate_suppressed() {
        let mut reconciler = TranscriptReconciler::new();

        assert!(reconciler.accept(&segment("a", "Hello world", 10.0)));
        // Same text, different id, 0.5s apart: a retransmission.
        assert!(!reconciler.accept(&segment("b", "Hello world", 10.5)));
    }

    #[test]
    fn test_distinct_repeats_both_delivered() {
        let mut reconciler = TranscriptReconciler::new();

        assert!(reconciler.accept(&segment("a", "Hello world", 10.0)));
        // Identical wording 2s later is a genuine repeat.
        assert!(reconciler.accept(&segment("b", "Hello world", 12.0)));
        assert_eq!(reconciler.accepted_count(), 2);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut reconciler = TranscriptReconciler::new();

        assert!(reconciler.accept(&segment("a", "Hello world", 10.0)));
        for i in 0..DEDUP_WINDOW {
            assert!(reconciler.accept(&segment(
                &format!("filler-{i}"),
                &format!("filler {i}"),
                20.0 + i as f64 * 2.0,
            )));
        }

        // "a" has been evicted from the window, so only the id check
        // applies; a fresh id with the old text slips through.
        assert!(reconciler.accept(&segment("b", "Hello world", 10.2)));
    }

    #[test]
    fn test_different_text_same_start_accepted() {
        let mut reconciler = TranscriptReconciler::new();

        assert!(reconciler.accept(&segment("a", "Hello world", 10.0)));
        assert!(reconciler.accept(&segment("b", "Goodbye world", 10.0)));
    }
}

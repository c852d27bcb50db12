use std::collections::VecDeque;

use tokio::sync::watch;

use crate::audio::AudioFrame;

/// Number of level bars the waveform display shows.
pub const WAVEFORM_BARS: usize = 50;

/// Display-only peak-level sampler feeding the waveform visualization.
///
/// Keeps the most recent [`WAVEFORM_BARS`] normalized peak levels (0.0 to
/// 1.0) and publishes them on a watch channel whenever a frame arrives.
pub struct WaveformSampler {
    levels: VecDeque<f32>,
    tx: watch::Sender<Vec<f32>>,
}

impl WaveformSampler {
    pub fn new() -> (Self, watch::Receiver<Vec<f32>>) {
        let levels: VecDeque<f32> = std::iter::repeat(0.0).take(WAVEFORM_BARS).collect();
        let (tx, rx) = watch::channel(levels.iter().copied().collect());
        (Self { levels, tx }, rx)
    }

    /// Fold one frame's peak level into the rolling window.
    pub fn push(&mut self, frame: &AudioFrame) {
        let peak = frame
            .samples
            .iter()
            .map(|s| (*s as i32).unsigned_abs())
            .max()
            .unwrap_or(0);
        let level = peak as f32 / i16::MAX as f32;

        self.levels.pop_front();
        self.levels.push_back(level.min(1.0));
        let _ = self.tx.send(self.levels.iter().copied().collect());
    }

    /// Flatten the display back to silence.
    pub fn reset(&mut self) {
        self.levels.iter_mut().for_each(|l| *l = 0.0);
        let _ = self.tx.send(self.levels.iter().copied().collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>) -> AudioFrame {
        AudioFrame {
            samples,
            sequence: 0,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_levels_track_peak() {
        let (mut sampler, rx) = WaveformSampler::new();

        sampler.push(&frame(vec![0, 8192, -16384, 100]));

        let levels = rx.borrow().clone();
        assert_eq!(levels.len(), WAVEFORM_BARS);
        let last = *levels.last().unwrap();
        assert!((last - 16384.0 / 32767.0).abs() < 1e-4);
    }

    #[test]
    fn test_silence_is_zero() {
        let (mut sampler, rx) = WaveformSampler::new();
        sampler.push(&frame(vec![0; 64]));
        assert_eq!(*rx.borrow().last().unwrap(), 0.0);
    }

    #[test]
    fn test_reset_flattens() {
        let (mut sampler, rx) = WaveformSampler::new();
        sampler.push(&frame(vec![i16::MAX; 16]));
        sampler.reset();
        assert!(rx.borrow().iter().all(|&l| l == 0.0));
    }

    #[test]
    fn test_extreme_negative_sample() {
        let (mut sampler, rx) = WaveformSampler::new();
        // i16::MIN has no positive counterpart; level saturates at 1.0.
        sampler.push(&frame(vec![i16::MIN]));
        assert_eq!(*rx.borrow().last().unwrap(), 1.0);
    }
}

use std::time::{Duration, Instant};

/// Elapsed-time clock that stops counting while the recording is paused.
#[derive(Debug, Default)]
pub struct ElapsedClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl ElapsedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to zero and start counting.
    pub fn start(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(Instant::now());
    }

    /// Stop counting; elapsed time is retained.
    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    /// Continue counting after a pause. No-op while running.
    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Reset to zero without starting.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = None;
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_accumulates_while_running() {
        let mut clock = ElapsedClock::new();
        clock.start();
        std::thread::sleep(Duration::from_millis(30));
        assert!(clock.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_pause_stops_accumulation() {
        let mut clock = ElapsedClock::new();
        clock.start();
        std::thread::sleep(Duration::from_millis(20));
        clock.pause();

        let frozen = clock.elapsed();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.elapsed(), frozen);

        clock.resume();
        std::thread::sleep(Duration::from_millis(20));
        assert!(clock.elapsed() > frozen);
    }

    #[test]
    fn test_start_resets_previous_run() {
        let mut clock = ElapsedClock::new();
        clock.start();
        std::thread::sleep(Duration::from_millis(20));
        clock.pause();

        clock.start();
        assert!(clock.elapsed() < Duration::from_millis(20));
    }

    #[test]
    fn test_reset_zeroes() {
        let mut clock = ElapsedClock::new();
        clock.start();
        std::thread::sleep(Duration::from_millis(10));
        clock.reset();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}

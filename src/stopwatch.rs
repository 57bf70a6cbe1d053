use crate::types::Lap;

/// Free-running elapsed-time counter with laps
///
/// All methods take the current monotonic time in milliseconds. Elapsed time
/// is `accumulated + (now - resumed_at)` while running, so late or missed
/// ticks never cause drift.
#[derive(Debug, Default, Clone)]
pub struct Stopwatch {
    accumulated: u64,
    resumed_at: Option<u64>,
    elapsed: u64,
    laps: Vec<Lap>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    /// Elapsed milliseconds as of the last tick or transition
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    /// Returns false when already running
    pub fn start(&mut self, now: u64) -> bool {
        if self.is_running() {
            return false;
        }
        self.resumed_at = Some(now);
        true
    }

    /// Returns false when not running
    pub fn pause(&mut self, now: u64) -> bool {
        let Some(resumed_at) = self.resumed_at.take() else {
            return false;
        };
        self.accumulated += now.saturating_sub(resumed_at);
        self.elapsed = self.elapsed.max(self.accumulated);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Refresh elapsed from the clock
    pub fn tick(&mut self, now: u64) -> u64 {
        if let Some(resumed_at) = self.resumed_at {
            let current = self.accumulated + now.saturating_sub(resumed_at);
            self.elapsed = self.elapsed.max(current);
        }
        self.elapsed
    }

    /// Record a lap; only while running
    pub fn lap(&mut self, now: u64) -> Option<Lap> {
        if !self.is_running() {
            return None;
        }
        let time = self.tick(now);
        let lap = Lap {
            number: self.laps.len() + 1,
            time,
        };
        self.laps.push(lap);
        Some(lap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_only_advances_while_running() {
        let mut sw = Stopwatch::new();
        assert_eq!(sw.tick(500), 0, "Idle stopwatch must not advance");

        assert!(sw.start(1_000));
        assert!(!sw.start(1_200), "Second start is a no-op");
        assert_eq!(sw.tick(1_250), 250);

        assert!(sw.pause(2_000));
        assert!(!sw.pause(2_100), "Second pause is a no-op");
        assert_eq!(sw.tick(9_000), 1_000, "Paused stopwatch holds its value");

        sw.start(10_000);
        assert_eq!(sw.tick(10_010), 1_010);
    }

    #[test]
    fn test_elapsed_never_decreases() {
        let mut sw = Stopwatch::new();
        let script: Vec<(&str, u64)> = vec![
            ("start", 0),
            ("tick", 10),
            ("tick", 20),
            ("pause", 25),
            ("tick", 40),
            ("start", 50),
            ("start", 55),
            ("tick", 60),
            ("pause", 70),
            ("pause", 80),
            ("start", 90),
            ("tick", 130),
        ];

        let mut last = 0;
        for (op, now) in script {
            match op {
                "start" => {
                    sw.start(now);
                }
                "pause" => {
                    sw.pause(now);
                }
                _ => {
                    sw.tick(now);
                }
            }
            assert!(sw.elapsed() >= last, "elapsed went backwards at {} {}", op, now);
            last = sw.elapsed();
        }
        assert_eq!(sw.elapsed(), 25 + 20 + 40);
    }

    #[test]
    fn test_lap_requires_running() {
        let mut sw = Stopwatch::new();
        assert_eq!(sw.lap(100), None);
        assert!(sw.laps().is_empty());

        sw.start(0);
        let first = sw.lap(1_500).unwrap();
        let second = sw.lap(2_750).unwrap();
        assert_eq!(first, Lap { number: 1, time: 1_500 });
        assert_eq!(second, Lap { number: 2, time: 2_750 });

        sw.pause(3_000);
        assert_eq!(sw.lap(3_500), None);
        assert_eq!(sw.laps().len(), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut sw = Stopwatch::new();
        sw.start(0);
        sw.lap(400);
        sw.reset();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(), 0);
        assert!(sw.laps().is_empty());
        assert_eq!(sw.tick(5_000), 0);
    }
}

use crate::error::TrackerError;

/// Remaining time at or under which a running countdown is in the warning state
pub const WARNING_THRESHOLD_MS: u64 = 10_000;
/// Longest countdown accepted, 99:59:59; larger inputs are clamped to it
pub const MAX_DURATION_MS: u64 = (99 * 3_600 + 59 * 60 + 59) * 1_000;

/// Hours/minutes/seconds entered for the countdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationInput {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DurationInput {
    pub fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Parse raw field text; anything that is not a non-negative integer counts as 0
    pub fn parse(hours: &str, minutes: &str, seconds: &str) -> Self {
        fn field(s: &str) -> u64 {
            s.trim().parse::<u64>().unwrap_or(0)
        }
        Self::new(field(hours), field(minutes), field(seconds))
    }

    /// Total duration, clamped to `MAX_DURATION_MS`
    pub fn total_ms(&self) -> u64 {
        self.hours
            .saturating_mul(3_600)
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
            .saturating_mul(1_000)
            .min(MAX_DURATION_MS)
    }

    pub fn is_zero(&self) -> bool {
        self.total_ms() == 0
    }
}

/// Result of applying a tick to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Not running; the tick was stale
    Idle,
    Running { remaining: u64, warning: bool },
    /// Reached zero on this tick. Reported once per run.
    Finished,
}

/// Result of pausing the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPause {
    NotRunning,
    Paused { remaining: u64 },
    /// Zero was reached before the pause landed; this run is over
    Finished,
}

/// Timer counting down from a configured duration
#[derive(Debug, Default, Clone)]
pub struct Countdown {
    input: DurationInput,
    remaining: u64,
    total: u64,
    /// Monotonic time and remaining value when the current run segment began
    segment: Option<(u64, u64)>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.segment.is_some()
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn input(&self) -> DurationInput {
        self.input
    }

    /// Duration inputs are locked while the countdown runs
    pub fn inputs_locked(&self) -> bool {
        self.is_running()
    }

    pub fn is_warning(&self) -> bool {
        self.is_running() && self.remaining > 0 && self.remaining <= WARNING_THRESHOLD_MS
    }

    /// Set the duration used by the next fresh start
    pub fn configure(&mut self, input: DurationInput) -> bool {
        if self.inputs_locked() {
            return false;
        }
        self.input = input;
        true
    }

    /// Start or resume
    ///
    /// A fresh run (nothing remaining) loads the configured duration and is
    /// rejected when that duration is zero. Returns `Ok(false)` when already
    /// running.
    pub fn start(&mut self, now: u64) -> Result<bool, TrackerError> {
        if self.is_running() {
            return Ok(false);
        }
        if self.remaining == 0 {
            if self.input.is_zero() {
                return Err(TrackerError::ZeroDuration);
            }
            self.total = self.input.total_ms();
            self.remaining = self.total;
        }
        self.segment = Some((now, self.remaining));
        Ok(true)
    }

    /// Stop without resetting remaining
    ///
    /// A pause that arrives after zero has passed but before the next tick
    /// finishes the run instead, so the finish is never lost.
    pub fn pause(&mut self, now: u64) -> CountdownPause {
        if !self.is_running() {
            return CountdownPause::NotRunning;
        }
        self.refresh(now);
        if self.remaining == 0 {
            self.finish();
            return CountdownPause::Finished;
        }
        self.segment = None;
        CountdownPause::Paused {
            remaining: self.remaining,
        }
    }

    pub fn reset(&mut self) {
        self.segment = None;
        self.remaining = 0;
        self.total = 0;
    }

    pub fn tick(&mut self, now: u64) -> CountdownTick {
        if !self.is_running() {
            return CountdownTick::Idle;
        }
        self.refresh(now);
        if self.remaining == 0 {
            self.finish();
            return CountdownTick::Finished;
        }
        CountdownTick::Running {
            remaining: self.remaining,
            warning: self.is_warning(),
        }
    }

    /// Fraction of the run completed, `None` when no run is loaded
    pub fn progress(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.total - self.remaining.min(self.total)) as f64 / self.total as f64)
    }

    /// Milliseconds to show: the live value rounded up to the second,
    /// or the configured input while idle
    pub fn display_ms(&self) -> u64 {
        if self.remaining == 0 && !self.is_running() {
            return self.input.total_ms();
        }
        self.remaining.div_ceil(1_000) * 1_000
    }

    fn finish(&mut self) {
        self.segment = None;
        self.total = 0;
    }

    fn refresh(&mut self, now: u64) {
        if let Some((started, at_start)) = self.segment {
            self.remaining = at_start.saturating_sub(now.saturating_sub(started));
        }
    }
}

use std::cell::Cell;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Time source for the widgets
///
/// `monotonic_ms` drives elapsed/remaining arithmetic and never goes
/// backwards. `now` is the wall clock used for timestamps that get stored.
pub trait Clock {
    fn monotonic_ms(&self) -> u64;
    fn now(&self) -> DateTime<Utc>;
}

/// Real clock backed by `Instant` and `Utc::now`
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays
///
/// Both readings move together when advanced.
#[derive(Debug)]
pub struct ManualClock {
    mono: Cell<u64>,
    wall: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            mono: Cell::new(0),
            wall: Cell::new(wall),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.mono.set(self.mono.get() + ms);
        self.wall.set(self.wall.get() + Duration::milliseconds(ms as i64));
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.mono.get()
    }

    fn now(&self) -> DateTime<Utc> {
        self.wall.get()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn monotonic_ms(&self) -> u64 {
        (**self).monotonic_ms()
    }

    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_both_readings() {
        let start: DateTime<Utc> = "2025-01-13T14:00:00Z".parse().unwrap();
        let clock = ManualClock::new(start);
        clock.advance(1_500);
        assert_eq!(clock.monotonic_ms(), 1_500);
        assert_eq!(clock.now(), start + Duration::milliseconds(1_500));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.monotonic_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.monotonic_ms();
        assert!(b >= a);
    }
}

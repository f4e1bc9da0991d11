//! Run clock
//!
//! Single source of timestamps and durations for a run. A frozen clock makes
//! report output byte-identical across runs.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Instant;

/// Timestamp emitted while the clock is frozen
pub const EPOCH_SENTINEL: &str = "1970-01-01T00:00:00Z";

/// Wall-clock or frozen time source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunClock {
    #[default]
    Wall,
    Frozen,
}

impl RunClock {
    /// Frozen when `deterministic` is set
    pub fn from_deterministic(deterministic: bool) -> Self {
        if deterministic {
            RunClock::Frozen
        } else {
            RunClock::Wall
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, RunClock::Frozen)
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        match self {
            RunClock::Wall => Utc::now(),
            RunClock::Frozen => DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// RFC 3339 UTC timestamp, or the epoch sentinel when frozen
    pub fn timestamp(&self) -> String {
        match self {
            RunClock::Wall => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            RunClock::Frozen => EPOCH_SENTINEL.to_string(),
        }
    }

    pub fn start(&self) -> Instant {
        Instant::now()
    }

    /// Milliseconds since `started`, always 0.0 when frozen
    pub fn elapsed_ms(&self, started: Instant) -> f64 {
        match self {
            RunClock::Wall => started.elapsed().as_secs_f64() * 1000.0,
            RunClock::Frozen => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_clock() {
        let clock = RunClock::from_deterministic(true);
        assert!(clock.is_frozen());
        assert_eq!(clock.timestamp(), EPOCH_SENTINEL);
        assert_eq!(clock.now_utc().timestamp(), 0);

        let started = clock.start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(clock.elapsed_ms(started), 0.0);
    }

    #[test]
    fn test_wall_clock() {
        let clock = RunClock::from_deterministic(false);
        assert!(clock.timestamp().ends_with('Z'));
        assert_ne!(clock.timestamp(), EPOCH_SENTINEL);

        let started = clock.start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.elapsed_ms(started) >= 5.0);
    }
}

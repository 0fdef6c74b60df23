//! Source of local time for a run.
//!
//! The orchestrator reads the clock once per feed to pick the archive period,
//! and again when a validator is stored, so long runs and runs that cross
//! midnight date each feed by when it was actually processed.

use chrono::{Local, NaiveDateTime};

/// Provides the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::sync::Mutex;

    /// Always reports the same instant.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct FixedClock(pub NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    /// Returns its current time, then moves forward by `step`.
    pub(crate) struct SteppingClock {
        next: Mutex<NaiveDateTime>,
        step: Duration,
    }

    impl SteppingClock {
        pub(crate) fn new(start: NaiveDateTime, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> NaiveDateTime {
            let mut next = self.next.lock().unwrap();
            let current = *next;
            *next = current + self.step;
            current
        }
    }

    #[test]
    fn test_fixed_clock_never_moves() {
        let t = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let clock = FixedClock(t);
        assert_eq!(clock.now(), t);
        assert_eq!(clock.now(), t);
    }

    #[test]
    fn test_stepping_clock_advances_per_read() {
        let t = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap().and_hms_opt(23, 59, 0).unwrap();
        let clock = SteppingClock::new(t, Duration::minutes(1));
        assert_eq!(clock.now(), t);
        assert_eq!(clock.now(), t + Duration::minutes(1));
    }

    #[test]
    fn test_system_clock_tracks_local_time() {
        let before = Local::now().naive_local();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}

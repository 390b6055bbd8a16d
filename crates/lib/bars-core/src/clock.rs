//! Injectable time source.
//!
//! "Now" enters the core in exactly one place: defaulting an unset
//! `end_time`. It is passed in as a dependency so tests can pin a fixed
//! instant and assert deterministic defaulting.

use chrono::{Local, NaiveDateTime};

/// Supplies the current exchange-local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a fixed instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

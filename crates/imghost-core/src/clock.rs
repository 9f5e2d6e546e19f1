//! Wall-clock abstraction.
//!
//! Guest code expiry is compared against wall-clock time, so anything that decides
//! "is this expired yet" reads time through [`Clock`] and tests can move it forward.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

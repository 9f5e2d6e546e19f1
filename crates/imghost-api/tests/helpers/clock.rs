use chrono::{DateTime, Duration, TimeZone, Utc};
use imghost_core::Clock;
use std::sync::Mutex;

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Noon on a fixed day, far from any date boundary.
    pub fn at_noon() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

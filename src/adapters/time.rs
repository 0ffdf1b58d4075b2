//! Monotonic clock adapter.
//!
//! Implements [`TimePort`] on `std::time::Instant`, which never goes
//! backwards and is unaffected by wall-clock adjustments (NTP steps,
//! manual `date` changes).

use std::time::{Duration, Instant};

use crate::app::ports::TimePort;

pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TimePort for MonotonicClock {
    fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, period: Duration) {
        std::thread::sleep(period);
    }
}

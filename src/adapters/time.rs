//! System clock adapter.
//!
//! Wall-clock time comes from the host's local timezone via `chrono`, so
//! the light window follows local daylight-saving shifts.  Uptime is
//! measured with `std::time::Instant` and is unaffected by wall-clock
//! jumps.

use std::time::Instant;

use chrono::Local;

use crate::app::ports::Clock;
use crate::phase::Timestamp;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }

    fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

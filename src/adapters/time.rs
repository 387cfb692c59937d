//! Host time adapter.
//!
//! Provides the monotonic millisecond clock the runtime stamps inputs and
//! timer polls with.  Backed by `std::time::Instant`, measured from the
//! moment the adapter was created.

use std::time::Instant;

use crate::app::ports::ClockPort;

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
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

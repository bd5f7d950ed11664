use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::time::Clock;

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FakeClock {
    offset: Mutex<Duration>,
    base_instant: Instant,
}

impl FakeClock {
    pub fn new(base_instant: Instant) -> Self {
        FakeClock { offset: Mutex::new(Duration::ZERO), base_instant }
    }

    pub fn advance(&self, duration: Duration) {
        let mut off = self.offset.lock().unwrap();
        *off = off.saturating_add(duration);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let off = *self.offset.lock().unwrap();
        self.base_instant + off
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        FakeClock { offset: Mutex::new(Duration::ZERO), base_instant: Instant::now() }
    }
}

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

/// A monotonic time source.
///
/// Components take an `Arc<dyn Clock>` instead of calling `Instant::now`
/// directly, so tests can substitute a fake clock and advance it manually.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// The production clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClock;

impl Clock for DefaultClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub type SharedClock = Arc<dyn Clock>;

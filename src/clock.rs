use std::time::Instant;

/// Source of the millisecond timestamps carried in probes.
///
/// Values wrap around `u32::MAX`; latencies are computed with wrapping
/// subtraction.
pub trait Clock {
    fn now_millis(&self) -> u32;
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

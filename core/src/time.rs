use std::time::{Duration, Instant};

/// Measures a scoped operation. On drop, logs a warning when the operation took longer
/// than `TR` milliseconds and a trace line otherwise.
pub struct Stopwatch<const TR: u64 = 1000> {
    name: &'static str,
    start: Instant,
}

impl Stopwatch {
    pub fn new(name: &'static str) -> Self {
        Self::with_threshold(name)
    }
}

impl<const TR: u64> Stopwatch<TR> {
    pub fn with_threshold(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<const TR: u64> Drop for Stopwatch<TR> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if elapsed > Duration::from_millis(TR) {
            pink_core::log::warn!("[{}] Abnormal time: {:#?}", self.name, elapsed);
        } else {
            pink_core::log::trace!("[{}] took {:?}", self.name, elapsed);
        }
    }
}

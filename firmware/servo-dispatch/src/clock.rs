use std::time::Instant;

/// Monotonic millisecond clock read by the dispatcher.
///
/// The tick and every foreground call timestamp through this trait, so
/// tests can drive the engine with a simulated clock.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Wall clock measured from construction time.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

//! Hardware-facing sinks that turn pulse widths into physical signals.
//!
//! Backends own no motion semantics; the dispatcher interpolates and the
//! backend only writes. Direct register-style backends write through
//! immediately, bus-based backends stage writes and commit them once per
//! tick in [`Backend::flush`].

use crate::channel::ServoConfig;
use crate::error::BackendError;

pub mod expander;
pub mod pwm;

pub use expander::ExpanderBackend;
pub use pwm::PwmBackend;

/// Capability contract between the dispatcher and the hardware.
///
/// All methods must be non-blocking: `set_position` may stage instead of
/// writing, and `flush` sends at most one bounded batch. A failed write is
/// reported and dropped; the dispatcher never retries in a loop.
pub trait Backend {
    /// Validate and bind the per-channel configuration. Called before any
    /// motion command; may be called again to reconfigure.
    fn configure(&mut self, configs: &[ServoConfig]) -> Result<(), BackendError>;

    /// Command one output to the given pulse width in microseconds.
    fn set_position(&mut self, output: u8, pulse_us: u16) -> Result<(), BackendError>;

    /// Commit writes staged during this tick. No-op for unbuffered backends.
    fn flush(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Stop driving an output so the servo goes limp. Optional.
    fn release(&mut self, output: u8) -> Result<(), BackendError> {
        let _ = output;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    pub struct BackendLog {
        /// Every `(output, pulse_us)` write in order.
        pub writes: Vec<(u8, u16)>,
        pub flushes: usize,
        pub released: Vec<u8>,
    }

    impl BackendLog {
        pub fn last_position(&self, output: u8) -> Option<u16> {
            self.writes
                .iter()
                .rev()
                .find(|(o, _)| *o == output)
                .map(|(_, p)| *p)
        }
    }

    /// Backend double that records writes through a shared handle, so tests
    /// keep visibility after the dispatcher takes ownership.
    #[derive(Clone)]
    pub struct RecordingBackend {
        pub log: Arc<Mutex<BackendLog>>,
        pub fail_writes: Arc<AtomicBool>,
        pub capacity: usize,
    }

    impl RecordingBackend {
        pub fn new(capacity: usize) -> Self {
            Self {
                log: Arc::new(Mutex::new(BackendLog::default())),
                fail_writes: Arc::new(AtomicBool::new(false)),
                capacity,
            }
        }
    }

    impl Backend for RecordingBackend {
        fn configure(&mut self, configs: &[ServoConfig]) -> Result<(), BackendError> {
            if configs.len() > self.capacity {
                return Err(BackendError::Capacity {
                    requested: configs.len(),
                    available: self.capacity,
                });
            }
            Ok(())
        }

        fn set_position(&mut self, output: u8, pulse_us: u16) -> Result<(), BackendError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(BackendError::Bus);
            }
            self.log.lock().unwrap().writes.push((output, pulse_us));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), BackendError> {
            self.log.lock().unwrap().flushes += 1;
            Ok(())
        }

        fn release(&mut self, output: u8) -> Result<(), BackendError> {
            self.log.lock().unwrap().released.push(output);
            Ok(())
        }
    }
}

use thiserror::Error;

/// Failures reported by a hardware backend.
///
/// None of these escalate: a rejected configuration surfaces through
/// [`DispatchError`], and tick-time bus failures are logged and retried on
/// the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BackendError {
    /// More channels configured than the backend has outputs.
    #[error("backend exposes {available} outputs, {requested} configured")]
    Capacity { requested: usize, available: usize },
    /// An output index outside the backend's range.
    #[error("output {output} is not bound to this backend")]
    UnboundOutput { output: u8 },
    /// Transient bus or register write failure.
    #[error("bus write failed")]
    Bus,
}

/// Failures reported by the dispatcher API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A motion call was issued before `configure`.
    #[error("no servo configuration installed")]
    NotConfigured,
    /// Channel index at or beyond the configured count.
    #[error("servo {channel} out of range ({count} configured)")]
    InvalidChannel { channel: u8, count: u8 },
    /// A channel was configured with `min_pulse > max_pulse`.
    #[error("servo {channel} has invalid pulse bounds {min}..{max}")]
    InvalidBounds { channel: u8, min: u16, max: u16 },
    #[error("backend rejected configuration: {0}")]
    Backend(#[from] BackendError),
}

use crate::movement::Movement;

/// Per-channel configuration, fixed once installed via
/// [`configure`](crate::ServoDispatcher::configure).
///
/// `output` is the backend output index this channel drives: the pin slot
/// for a direct PWM backend, the expander channel for an I2C backend.
/// Pulse values are microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoConfig {
    pub output: u8,
    pub min_pulse: u16,
    pub max_pulse: u16,
    /// Rest position; the channel is driven here at configure time.
    pub neutral_pulse: u16,
}

impl ServoConfig {
    /// Configuration with the neutral pulse at the midpoint of the range.
    pub const fn new(output: u8, min_pulse: u16, max_pulse: u16) -> Self {
        Self {
            output,
            min_pulse,
            max_pulse,
            neutral_pulse: ((min_pulse as u32 + max_pulse as u32) / 2) as u16,
        }
    }

    pub const fn with_neutral(mut self, neutral_pulse: u16) -> Self {
        self.neutral_pulse = neutral_pulse;
        self
    }

    pub(crate) fn clamp(&self, pulse: u16) -> u16 {
        pulse.clamp(self.min_pulse, self.max_pulse)
    }

    pub(crate) fn clamp_i32(&self, pulse: i32) -> u16 {
        pulse.clamp(self.min_pulse as i32, self.max_pulse as i32) as u16
    }

    /// Map a 0.0..=1.0 scale onto this channel's pulse range.
    pub(crate) fn scale_to_pos(&self, scale: f32) -> u16 {
        let scale = scale.clamp(0.0, 1.0);
        let span = (self.max_pulse - self.min_pulse) as f32;
        self.min_pulse + (span * scale).round() as u16
    }
}

/// Live state for one channel. The tick is the only writer of `current`;
/// foreground calls only ever replace `movement` wholesale.
pub(crate) struct Channel {
    pub(crate) config: ServoConfig,
    /// Last pulse width delivered to the backend. Always within bounds.
    pub(crate) current: u16,
    /// At most one live movement; a new call overwrites it outright.
    pub(crate) movement: Option<Movement>,
}

impl Channel {
    pub(crate) fn new(config: ServoConfig) -> Self {
        Self {
            current: config.clamp(config.neutral_pulse),
            movement: None,
            config,
        }
    }
}

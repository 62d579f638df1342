use std::ops::{BitAnd, BitOr, Not};

/// Bit-vector selecting servo channels by index (bit `n` = channel `n`).
///
/// Rig code typically builds named group constants and composes them with
/// the bit operators:
///
/// ```
/// use servo_dispatch::ServoMask;
///
/// const DOME_PANELS: ServoMask = ServoMask::from_bits(0b0001_1111);
/// const PIE_PANELS: ServoMask = ServoMask::from_bits(0b1110_0000);
/// let all = DOME_PANELS | PIE_PANELS;
/// assert!(all.contains(6));
/// ```
///
/// Bits at or beyond the configured channel count are tolerated and
/// silently ignored by the dispatcher, so oversized masks like
/// [`ServoMask::ALL`] are fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServoMask(u32);

impl ServoMask {
    pub const NONE: ServoMask = ServoMask(0);
    pub const ALL: ServoMask = ServoMask(u32::MAX);

    pub const fn from_bits(bits: u32) -> Self {
        ServoMask(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Mask with only `channel` selected. Channels >= 32 map to the empty mask.
    pub const fn single(channel: u8) -> Self {
        if channel < 32 {
            ServoMask(1 << channel)
        } else {
            ServoMask(0)
        }
    }

    pub const fn with(self, channel: u8) -> Self {
        ServoMask(self.0 | Self::single(channel).0)
    }

    pub const fn contains(self, channel: u8) -> bool {
        channel < 32 && (self.0 >> channel) & 1 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the selected channel indices in ascending order.
    pub fn iter(self) -> SetBits {
        SetBits(self.0)
    }
}

impl BitOr for ServoMask {
    type Output = ServoMask;
    fn bitor(self, rhs: ServoMask) -> ServoMask {
        ServoMask(self.0 | rhs.0)
    }
}

impl BitAnd for ServoMask {
    type Output = ServoMask;
    fn bitand(self, rhs: ServoMask) -> ServoMask {
        ServoMask(self.0 & rhs.0)
    }
}

impl Not for ServoMask {
    type Output = ServoMask;
    fn not(self) -> ServoMask {
        ServoMask(!self.0)
    }
}

/// Iterator over the set bits of a [`ServoMask`].
pub struct SetBits(u32);

impl Iterator for SetBits {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let channel = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(channel)
    }
}

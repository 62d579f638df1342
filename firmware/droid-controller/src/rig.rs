//! Channel tables and group masks for the dome rig.
//!
//! Channel numbers here are rig-local: the dome dispatcher's channel 0 is
//! PCA9685 output 0, the holoprojector dispatcher's channel 0 is the first
//! LEDC pin. Groups are defined against the dome rig.

use servo_dispatch::{ServoConfig, ServoMask};

/// Dispatcher tick period. 10 ms gives smooth motion at a fraction of the
/// 50 Hz servo refresh rate.
pub const TICK_PERIOD_MS: u32 = 10;

/// PCA9685 address with all address pins strapped low.
pub const DOME_EXPANDER_ADDR: u8 = 0x40;

/// Dome panel servos, one PCA9685 output each. Pulse bounds are per-servo:
/// panels 0-3 are the large lower panels, 4-5 the small pie panels with a
/// shorter throw. Neutral is the closed position.
pub const DOME_SERVOS: [ServoConfig; 6] = [
    ServoConfig::new(0, 600, 2400).with_neutral(600),
    ServoConfig::new(1, 600, 2400).with_neutral(600),
    ServoConfig::new(2, 650, 2350).with_neutral(650),
    ServoConfig::new(3, 650, 2350).with_neutral(650),
    ServoConfig::new(4, 800, 2200).with_neutral(800),
    ServoConfig::new(5, 800, 2200).with_neutral(800),
];

/// All dome panels.
pub const DOME_PANELS: ServoMask = ServoMask::from_bits(0b11_1111);
/// The two small pie panels at the top of the dome.
pub const PIE_PANELS: ServoMask = ServoMask::from_bits(0b11_0000);
/// Alternating half of the panels, for wave patterns.
pub const PANELS_ODD: ServoMask = ServoMask::from_bits(0b10_1010);

/// Holoprojector servos on direct LEDC outputs, two axes per projector.
pub const HOLO_SERVOS: [ServoConfig; 2] = [
    ServoConfig::new(0, 1000, 2000),
    ServoConfig::new(1, 1000, 2000),
];

/// Both holoprojector axes.
pub const HOLO_ALL: ServoMask = ServoMask::from_bits(0b11);

//! Servo dispatch engine for multi-channel animatronic rigs.
//!
//! A [`ServoDispatcher`] owns a table of servo channels and exactly one
//! hardware [`Backend`]. Foreground code installs motion requests (single
//! channel, group, or group/set fan-out); a fixed-period [`tick`] advances
//! every live movement and forwards pulse widths to the backend. The two
//! shipped backends are [`PwmBackend`] (one PWM pin per channel) and
//! [`ExpanderBackend`] (PCA9685 over I2C, batched writes).
//!
//! The engine is hardware-agnostic: backends are written against the
//! `embedded-hal` 1.0 traits and the tick reads an injectable [`Clock`],
//! so the whole thing runs under `cargo test` on the host.
//!
//! [`tick`]: ServoDispatcher::tick

pub mod backend;
pub mod channel;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod mask;
pub mod movement;

pub use backend::{Backend, ExpanderBackend, PwmBackend};
pub use channel::ServoConfig;
pub use clock::{Clock, SystemClock};
pub use dispatch::ServoDispatcher;
pub use error::{BackendError, DispatchError};
pub use mask::ServoMask;
pub use movement::{MoveDuration, MoveTiming};

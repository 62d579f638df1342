use std::sync::Mutex;

use log::debug;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::backend::Backend;
use crate::channel::{Channel, ServoConfig};
use crate::clock::{Clock, SystemClock};
use crate::error::DispatchError;
use crate::mask::ServoMask;
use crate::movement::{MoveTarget, MoveTiming, Movement, Step};

/// One servo rig: a channel table, exactly one backend, and a clock.
///
/// Foreground calls install movement descriptors; [`tick`] is the only
/// code that advances motion state and the only writer to the backend.
/// Both sides go through one mutex, so a multi-field descriptor install is
/// atomic with respect to the tick and the tick never observes a torn
/// movement. All calls return immediately; nothing blocks on hardware.
///
/// Dispatchers are plain instances, so several independent rigs (dome,
/// body, holoprojectors) can coexist in one process, each with its own
/// backend and channel numbering.
///
/// [`tick`]: ServoDispatcher::tick
pub struct ServoDispatcher<B, C = SystemClock> {
    inner: Mutex<Inner<B>>,
    clock: C,
}

struct Inner<B> {
    backend: B,
    channels: Vec<Channel>,
    configured: bool,
    rng: SmallRng,
}

impl<B: Backend> ServoDispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, SystemClock::new())
    }
}

impl<B: Backend, C: Clock> ServoDispatcher<B, C> {
    pub fn with_clock(backend: B, clock: C) -> Self {
        Self {
            inner: Mutex::new(Inner {
                backend,
                channels: Vec::new(),
                configured: false,
                rng: SmallRng::from_entropy(),
            }),
            clock,
        }
    }

    /// Install the channel table. Must run before any motion call; calling
    /// it again replaces the whole rig configuration.
    ///
    /// Every channel is driven to its neutral pulse so the rig powers up
    /// in a known posture.
    pub fn configure(&self, configs: &[ServoConfig]) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().unwrap();
        for (i, config) in configs.iter().enumerate() {
            if config.min_pulse > config.max_pulse {
                return Err(DispatchError::InvalidBounds {
                    channel: i as u8,
                    min: config.min_pulse,
                    max: config.max_pulse,
                });
            }
        }
        inner.backend.configure(configs)?;
        inner.channels = configs.iter().map(|&config| Channel::new(config)).collect();
        inner.configured = true;

        let Inner {
            backend, channels, ..
        } = &mut *inner;
        for (i, channel) in channels.iter().enumerate() {
            if let Err(e) = backend.set_position(channel.config.output, channel.current) {
                debug!("neutral write for servo {} deferred: {}", i, e);
            }
        }
        if let Err(e) = backend.flush() {
            debug!("neutral batch deferred: {}", e);
        }
        Ok(())
    }

    /// Drop the configuration; motion calls reject until the next
    /// `configure`.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.channels.clear();
        inner.configured = false;
    }

    /// Cancel every live movement. Channels hold their current position.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        for channel in &mut inner.channels {
            channel.movement = None;
        }
    }

    /// Cancel any movement on `channel` and release its output so the
    /// servo goes limp.
    pub fn disable(&self, channel: u8) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.configured {
            return Err(DispatchError::NotConfigured);
        }
        let count = inner.channels.len() as u8;
        let Inner {
            backend, channels, ..
        } = &mut *inner;
        let slot = channels
            .get_mut(channel as usize)
            .ok_or(DispatchError::InvalidChannel { channel, count })?;
        slot.movement = None;
        backend.release(slot.config.output)?;
        Ok(())
    }

    pub fn num_servos(&self) -> u8 {
        self.inner.lock().unwrap().channels.len() as u8
    }

    pub fn minimum(&self, channel: u8) -> Option<u16> {
        self.with_channel(channel, |c| c.config.min_pulse)
    }

    pub fn maximum(&self, channel: u8) -> Option<u16> {
        self.with_channel(channel, |c| c.config.max_pulse)
    }

    pub fn neutral(&self, channel: u8) -> Option<u16> {
        self.with_channel(channel, |c| c.config.neutral_pulse)
    }

    /// Last pulse width delivered to the backend for `channel`.
    pub fn current_pos(&self, channel: u8) -> Option<u16> {
        self.with_channel(channel, |c| c.current)
    }

    /// Map a 0.0..=1.0 scale onto the channel's pulse range.
    pub fn scale_to_pos(&self, channel: u8, scale: f32) -> Option<u16> {
        self.with_channel(channel, |c| c.config.scale_to_pos(scale))
    }

    /// True strictly while the channel's movement window is open: from the
    /// end of its start delay until its duration elapses.
    pub fn is_active(&self, channel: u8) -> bool {
        let now = self.clock.now_ms();
        let inner = self.inner.lock().unwrap();
        inner
            .channels
            .get(channel as usize)
            .and_then(|c| c.movement.as_ref())
            .map_or(false, |m| m.is_active(now))
    }

    /// Move one channel to an absolute position.
    pub fn move_to(&self, channel: u8, timing: MoveTiming, pos: u16) -> Result<(), DispatchError> {
        self.install(channel, timing, None, MoveTarget::Absolute(pos))
    }

    /// Move to `pos` interpolating from an explicit `start_pos` instead of
    /// the captured current position. Useful right after power-up, when
    /// the physical horn position is unknown.
    pub fn move_to_from(
        &self,
        channel: u8,
        timing: MoveTiming,
        start_pos: u16,
        pos: u16,
    ) -> Result<(), DispatchError> {
        self.install(channel, timing, Some(start_pos), MoveTarget::Absolute(pos))
    }

    /// Move one channel by a pulse delta, applied to wherever the channel
    /// sits when motion starts, clamped to its bounds.
    pub fn move_by(&self, channel: u8, timing: MoveTiming, delta: i16) -> Result<(), DispatchError> {
        self.install(channel, timing, None, MoveTarget::Relative(delta as i32))
    }

    /// Fan one absolute target out to every channel in `group`. Channels
    /// share the timing profile but interpolate from their own positions,
    /// so they arrive together without moving in lockstep.
    pub fn move_servos_to(
        &self,
        group: ServoMask,
        timing: MoveTiming,
        pos: u16,
    ) -> Result<(), DispatchError> {
        let target = MoveTarget::Absolute(pos);
        self.install_group(group, ServoMask::ALL, timing, target, target)
    }

    /// Fan one delta out to every channel in `group`.
    pub fn move_servos_by(
        &self,
        group: ServoMask,
        timing: MoveTiming,
        delta: i16,
    ) -> Result<(), DispatchError> {
        let target = MoveTarget::Relative(delta as i32);
        self.install_group(group, ServoMask::ALL, timing, target, target)
    }

    /// Split `group` by `set` membership: set bits move toward `on_pos`,
    /// the rest toward `off_pos`. One call drives alternating patterns.
    pub fn move_servo_set_to(
        &self,
        group: ServoMask,
        set: ServoMask,
        timing: MoveTiming,
        on_pos: u16,
        off_pos: u16,
    ) -> Result<(), DispatchError> {
        self.install_group(
            group,
            set,
            timing,
            MoveTarget::Absolute(on_pos),
            MoveTarget::Absolute(off_pos),
        )
    }

    /// As [`move_servo_set_to`](Self::move_servo_set_to) with deltas.
    pub fn move_servo_set_by(
        &self,
        group: ServoMask,
        set: ServoMask,
        timing: MoveTiming,
        on_delta: i16,
        off_delta: i16,
    ) -> Result<(), DispatchError> {
        self.install_group(
            group,
            set,
            timing,
            MoveTarget::Relative(on_delta as i32),
            MoveTarget::Relative(off_delta as i32),
        )
    }

    /// Advance every live movement and commit the results to the backend.
    ///
    /// Call at a fixed period (a hardware timer callback on target, a
    /// simulated clock in tests). Bounded time, no allocation, no blocking
    /// I/O: backend write failures are logged and dropped, and the next
    /// tick recomputes from absolute time so nothing drifts.
    pub fn tick(&self) {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock().unwrap();
        let Inner {
            backend,
            channels,
            rng,
            ..
        } = &mut *inner;
        for (i, channel) in channels.iter_mut().enumerate() {
            let Channel {
                config,
                current,
                movement,
            } = channel;
            let Some(live) = movement.as_mut() else {
                continue;
            };
            match live.advance(now, *current, config, rng) {
                Step::Waiting => {}
                Step::At(pulse) => {
                    if pulse != *current {
                        *current = pulse;
                        if let Err(e) = backend.set_position(config.output, pulse) {
                            debug!("servo {} write dropped: {}", i, e);
                        }
                    }
                }
                Step::Done(pulse) => {
                    // Land exactly on the target, even if rounding lagged.
                    *current = pulse;
                    *movement = None;
                    if let Err(e) = backend.set_position(config.output, pulse) {
                        debug!("servo {} write dropped: {}", i, e);
                    }
                }
            }
        }
        if let Err(e) = backend.flush() {
            debug!("backend flush deferred: {}", e);
        }
    }

    fn with_channel<R>(&self, channel: u8, f: impl FnOnce(&Channel) -> R) -> Option<R> {
        let inner = self.inner.lock().unwrap();
        inner.channels.get(channel as usize).map(f)
    }

    fn install(
        &self,
        channel: u8,
        timing: MoveTiming,
        start: Option<u16>,
        target: MoveTarget,
    ) -> Result<(), DispatchError> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock().unwrap();
        if !inner.configured {
            return Err(DispatchError::NotConfigured);
        }
        let count = inner.channels.len() as u8;
        let slot = inner
            .channels
            .get_mut(channel as usize)
            .ok_or(DispatchError::InvalidChannel { channel, count })?;
        slot.movement = Some(Movement::new(now, timing, start, target));
        Ok(())
    }

    fn install_group(
        &self,
        group: ServoMask,
        set: ServoMask,
        timing: MoveTiming,
        on: MoveTarget,
        off: MoveTarget,
    ) -> Result<(), DispatchError> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock().unwrap();
        if !inner.configured {
            return Err(DispatchError::NotConfigured);
        }
        let count = inner.channels.len();
        for channel in group.iter() {
            // Mask bits beyond the configured rig are tolerated and skipped.
            if channel as usize >= count {
                break;
            }
            let target = if set.contains(channel) { on } else { off };
            inner.channels[channel as usize].movement =
                Some(Movement::new(now, timing, None, target));
        }
        Ok(())
    }
}

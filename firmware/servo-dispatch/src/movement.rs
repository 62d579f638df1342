use rand::rngs::SmallRng;
use rand::Rng;

use crate::channel::ServoConfig;

/// How long a move takes, in milliseconds.
///
/// A `Range` is resolved to a single uniform draw at motion start, once
/// per channel, so a group call with a range arrives staggered instead of
/// mechanically in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDuration {
    Fixed(u32),
    Range(u32, u32),
}

impl MoveDuration {
    fn resolve(self, rng: &mut SmallRng) -> u32 {
        match self {
            MoveDuration::Fixed(ms) => ms,
            MoveDuration::Range(min, max) if min == max => min,
            MoveDuration::Range(min, max) => {
                let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
                rng.gen_range(lo..=hi)
            }
        }
    }

    /// Upper bound before the range has been drawn.
    fn ceiling(self) -> u32 {
        match self {
            MoveDuration::Fixed(ms) => ms,
            MoveDuration::Range(min, max) => min.max(max),
        }
    }
}

/// Timing profile accepted by every dispatcher call family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveTiming {
    /// Milliseconds to wait before motion begins.
    pub start_delay: u32,
    pub duration: MoveDuration,
}

impl MoveTiming {
    /// Snap to the target on the next tick.
    pub const fn immediate() -> Self {
        Self {
            start_delay: 0,
            duration: MoveDuration::Fixed(0),
        }
    }

    /// Linear move over `move_time` milliseconds, starting now.
    pub const fn over(move_time: u32) -> Self {
        Self {
            start_delay: 0,
            duration: MoveDuration::Fixed(move_time),
        }
    }

    /// Linear move beginning after `start_delay` milliseconds.
    pub const fn delayed(start_delay: u32, move_time: u32) -> Self {
        Self {
            start_delay,
            duration: MoveDuration::Fixed(move_time),
        }
    }

    /// Duration drawn uniformly from `min..=max` at motion start.
    pub const fn ranged(start_delay: u32, min: u32, max: u32) -> Self {
        Self {
            start_delay,
            duration: MoveDuration::Range(min, max),
        }
    }
}

/// Where a movement is headed. A relative target is applied to the pulse
/// at motion start, not at call time.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MoveTarget {
    Absolute(u16),
    Relative(i32),
}

/// Result of advancing one channel by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Start delay has not elapsed yet.
    Waiting,
    /// Interpolated position for this instant.
    At(u16),
    /// Movement complete; the value is the exact target pulse.
    Done(u16),
}

/// Interpolation state resolved at motion start.
#[derive(Debug, Clone, Copy)]
struct RunState {
    start_pulse: u16,
    target_pulse: u16,
    duration: u32,
}

/// The active interpolation descriptor for one channel.
///
/// Start pulse, target pulse, and a randomized duration are all resolved
/// on the first tick at or after `start_at`; until then the descriptor
/// only records intent. Each tick recomputes the position from the
/// resolved endpoints and elapsed time, so rounding and jitter never
/// accumulate across ticks.
pub(crate) struct Movement {
    start_at: u32,
    duration: MoveDuration,
    start_override: Option<u16>,
    target: MoveTarget,
    run: Option<RunState>,
}

impl Movement {
    pub(crate) fn new(
        now: u32,
        timing: MoveTiming,
        start_override: Option<u16>,
        target: MoveTarget,
    ) -> Self {
        Self {
            start_at: now + timing.start_delay,
            duration: timing.duration,
            start_override,
            target,
            run: None,
        }
    }

    /// True strictly within `[start_at, start_at + duration)`.
    pub(crate) fn is_active(&self, now: u32) -> bool {
        if now < self.start_at {
            return false;
        }
        let elapsed = now - self.start_at;
        match &self.run {
            Some(run) => elapsed < run.duration,
            None => elapsed < self.duration.ceiling(),
        }
    }

    pub(crate) fn advance(
        &mut self,
        now: u32,
        current: u16,
        config: &ServoConfig,
        rng: &mut SmallRng,
    ) -> Step {
        if now < self.start_at {
            return Step::Waiting;
        }
        if self.run.is_none() {
            self.run = Some(self.resolve(current, config, rng));
        }
        let Some(run) = self.run.as_ref() else {
            return Step::Waiting;
        };
        let elapsed = now - self.start_at;
        if run.duration == 0 || elapsed >= run.duration {
            return Step::Done(run.target_pulse);
        }
        let fraction = elapsed as f32 / run.duration as f32;
        let delta = run.target_pulse as i32 - run.start_pulse as i32;
        Step::At((run.start_pulse as f32 + delta as f32 * fraction).round() as u16)
    }

    fn resolve(&self, current: u16, config: &ServoConfig, rng: &mut SmallRng) -> RunState {
        let start_pulse = config.clamp(self.start_override.unwrap_or(current));
        let target_pulse = match self.target {
            MoveTarget::Absolute(pulse) => config.clamp(pulse),
            MoveTarget::Relative(delta) => config.clamp_i32(start_pulse as i32 + delta),
        };
        RunState {
            start_pulse,
            target_pulse,
            duration: self.duration.resolve(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn config() -> ServoConfig {
        ServoConfig::new(0, 1000, 2000)
    }

    #[test]
    fn test_immediate_snap() {
        let mut movement = Movement::new(0, MoveTiming::immediate(), None, MoveTarget::Absolute(1800));
        assert_eq!(movement.advance(0, 1000, &config(), &mut rng()), Step::Done(1800));
    }

    #[test]
    fn test_target_clamped_to_bounds() {
        let mut movement = Movement::new(0, MoveTiming::immediate(), None, MoveTarget::Absolute(2500));
        assert_eq!(movement.advance(0, 1000, &config(), &mut rng()), Step::Done(2000));
    }

    #[test]
    fn test_linear_fraction() {
        let mut movement = Movement::new(0, MoveTiming::over(500), None, MoveTarget::Absolute(2000));
        let mut rng = rng();
        assert_eq!(movement.advance(0, 1000, &config(), &mut rng), Step::At(1000));
        assert_eq!(movement.advance(250, 1000, &config(), &mut rng), Step::At(1500));
        assert_eq!(movement.advance(500, 1500, &config(), &mut rng), Step::Done(2000));
    }

    #[test]
    fn test_delayed_start_waits_then_resolves_from_current() {
        let mut movement = Movement::new(
            0,
            MoveTiming::delayed(100, 200),
            None,
            MoveTarget::Absolute(2000),
        );
        let mut rng = rng();
        assert_eq!(movement.advance(99, 1000, &config(), &mut rng), Step::Waiting);
        assert!(!movement.is_active(99));
        // The channel drifted to 1200 before the delay elapsed; interpolation
        // starts from there, not from the position at call time.
        assert_eq!(movement.advance(100, 1200, &config(), &mut rng), Step::At(1200));
        assert!(movement.is_active(100));
        assert_eq!(movement.advance(200, 1200, &config(), &mut rng), Step::At(1600));
        assert_eq!(movement.advance(300, 1600, &config(), &mut rng), Step::Done(2000));
        assert!(!movement.is_active(300));
    }

    #[test]
    fn test_relative_target_resolved_at_start() {
        let mut movement = Movement::new(
            0,
            MoveTiming::delayed(50, 0),
            None,
            MoveTarget::Relative(300),
        );
        // Current pulse at motion start is 1400, so the target is 1700.
        assert_eq!(movement.advance(50, 1400, &config(), &mut rng()), Step::Done(1700));
    }

    #[test]
    fn test_relative_target_clamped() {
        let mut movement = Movement::new(0, MoveTiming::immediate(), None, MoveTarget::Relative(-5000));
        assert_eq!(movement.advance(0, 1500, &config(), &mut rng()), Step::Done(1000));
    }

    #[test]
    fn test_explicit_start_overrides_current() {
        let mut movement = Movement::new(
            0,
            MoveTiming::over(100),
            Some(1000),
            MoveTarget::Absolute(2000),
        );
        let mut rng = rng();
        // Current pulse says 1900 but the caller pinned the start at 1000.
        assert_eq!(movement.advance(50, 1900, &config(), &mut rng), Step::At(1500));
    }

    #[test]
    fn test_explicit_start_clamped() {
        let mut movement = Movement::new(
            0,
            MoveTiming::over(100),
            Some(1),
            MoveTarget::Absolute(2000),
        );
        assert_eq!(movement.advance(0, 1500, &config(), &mut rng()), Step::At(1000));
    }

    #[test]
    fn test_exact_arrival_after_overshoot() {
        let mut movement = Movement::new(0, MoveTiming::over(300), None, MoveTarget::Absolute(1999));
        let mut rng = rng();
        movement.advance(0, 1000, &config(), &mut rng);
        // Well past the finish time: lands exactly on the target.
        assert_eq!(movement.advance(1000, 1700, &config(), &mut rng), Step::Done(1999));
    }

    #[test]
    fn test_range_duration_drawn_once_within_bounds() {
        let mut movement = Movement::new(
            0,
            MoveTiming::ranged(0, 100, 300),
            None,
            MoveTarget::Absolute(2000),
        );
        let mut rng = rng();
        movement.advance(0, 1000, &config(), &mut rng);
        let duration = movement.run.expect("resolved at start").duration;
        assert!((100..=300).contains(&duration));
        // Active strictly inside the drawn window, inactive at its end.
        assert!(movement.is_active(duration - 1));
        assert!(!movement.is_active(duration));
        // The draw happens exactly once.
        movement.advance(50, 1000, &config(), &mut rng);
        assert_eq!(movement.run.expect("still resolved").duration, duration);
    }

    #[test]
    fn test_zero_duration_window_is_empty() {
        let movement = Movement::new(0, MoveTiming::immediate(), None, MoveTarget::Absolute(1500));
        assert!(!movement.is_active(0));
        assert!(!movement.is_active(10));
    }
}

use crate::surface::{Key, KeyQuery};
use std::time::{Duration, Instant};

/// Wall-clock span mapped to one full cycle of `t`.
pub const DEFAULT_CYCLE: Duration = Duration::from_secs(10);
/// Per-frame scrub step while Left/Right is held.
pub const SCRUB_STEP: f64 = 1.0 / 1000.0;
/// Scrub step with Shift held.
pub const FINE_SCRUB_STEP: f64 = SCRUB_STEP * 0.1;
/// Pin target for the near-end key.
pub const NEAR_END: f64 = 999.9 / 1000.0;

/// Keyboard state relevant to time overrides for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Digit key pressed this frame.
    pub digit: Option<u8>,
    pub near_end: bool,
    pub left: bool,
    pub right: bool,
    pub shift: bool,
    pub toggle_freeze: bool,
}

impl InputSnapshot {
    pub fn from_keys(keys: &dyn KeyQuery) -> Self {
        let digit = (0..=9u8).find(|&d| keys.just_pressed(Key::Digit(d)));
        Self {
            digit,
            near_end: keys.just_pressed(Key::NearEnd),
            left: keys.pressed(Key::Left),
            right: keys.pressed(Key::Right),
            shift: keys.pressed(Key::Shift),
            toggle_freeze: keys.just_pressed(Key::Freeze),
        }
    }
}

/// Produces the normalized time fed to the effect each frame.
#[derive(Clone, Debug)]
pub struct TimeCursor {
    session_start: Instant,
    cycle: Duration,
    override_t: Option<f64>,
    last_rendered_t: f64,
}

impl TimeCursor {
    pub fn new(cycle: Duration) -> Self {
        Self::with_start(Instant::now(), cycle)
    }

    pub fn with_start(session_start: Instant, cycle: Duration) -> Self {
        Self {
            session_start,
            cycle: if cycle.is_zero() { DEFAULT_CYCLE } else { cycle },
            override_t: None,
            last_rendered_t: 0.0,
        }
    }

    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    pub fn last_rendered_t(&self) -> f64 {
        self.last_rendered_t
    }

    /// Current pin, if playback is frozen or scrubbed.
    pub fn pinned(&self) -> Option<f64> {
        self.override_t
    }

    /// Pin (or release) the cursor from outside the input path, e.g. to follow
    /// an audio position.
    pub fn set_override(&mut self, t: Option<f64>) {
        self.override_t = t;
    }

    /// Restart wall-clock playback from `now`.
    pub fn restart(&mut self, now: Instant) {
        self.session_start = now;
    }

    pub fn raw(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.session_start).as_secs_f64() / self.cycle.as_secs_f64()
    }

    pub fn advance(&mut self, now: Instant, input: &InputSnapshot) -> f64 {
        self.override_t = apply_input(input, self.override_t, self.last_rendered_t);
        let t = fold(self.override_t.unwrap_or_else(|| self.raw(now)));
        self.last_rendered_t = t;
        t
    }
}

/// Resolve this frame's override. The first matching rule wins.
pub fn apply_input(input: &InputSnapshot, current: Option<f64>, last_t: f64) -> Option<f64> {
    if let Some(d) = input.digit {
        return Some(d as f64 / 10.0);
    }
    if input.near_end {
        return Some(NEAR_END);
    }
    let step = if input.shift { FINE_SCRUB_STEP } else { SCRUB_STEP };
    if input.left {
        return Some(last_t - step);
    }
    if input.right {
        return Some(last_t + step);
    }
    if input.toggle_freeze {
        return match current {
            None => Some(last_t),
            Some(_) => None,
        };
    }
    current
}

/// Fold any time value into `[0, 1)`.
///
/// Negative fractions are reflected to `1 + f`; a result that rounds up to
/// exactly 1.0 wraps to 0.0.
pub fn fold(t: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    let f = t.fract();
    let f = if f < 0.0 { 1.0 + f } else { f };
    if f >= 1.0 { 0.0 } else { f }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_negative_fraction_does_not_round_to_one() {
        assert_eq!(fold(-1e-18), 0.0);
    }

    #[test]
    fn non_finite_values_fold_to_zero() {
        assert_eq!(fold(f64::NAN), 0.0);
        assert_eq!(fold(f64::INFINITY), 0.0);
    }

    #[test]
    fn digits_outrank_scrubbing() {
        let input = InputSnapshot {
            digit: Some(3),
            right: true,
            ..Default::default()
        };
        assert_eq!(apply_input(&input, None, 0.5), Some(0.3));
    }
}

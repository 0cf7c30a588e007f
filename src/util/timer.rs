/// One-shot countdown advanced by the frame tick.
///
/// Scheduled behaviour (blink waits, random looks, vibration steps) is held as
/// plain data instead of runtime timer objects: cancelling is just dropping or
/// resetting the countdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    remaining: f32,
    armed: bool,
}

impl Countdown {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
            armed: true,
        }
    }

    /// Advance by `dt`. Returns true exactly once, on the tick that expires it.
    pub fn fire(&mut self, dt: f32) -> bool {
        if !self.armed {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.armed = false;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

/// Uniform `f32` in `[min, max]`.
pub fn range_f32(rng: &mut fastrand::Rng, min: f32, max: f32) -> f32 {
    if max <= min {
        return min;
    }
    min + rng.f32() * (max - min)
}

/// Uniform `f64` in `[min, max]`.
pub fn range_f64(rng: &mut fastrand::Rng, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    min + rng.f64() * (max - min)
}

/// Uniform integer in `[min, max]` (inclusive).
pub fn range_u32(rng: &mut fastrand::Rng, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    rng.u32(min..=max)
}

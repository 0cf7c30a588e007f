use glam::Vec2;

/// Timing curve applied to a tween's normalized progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    /// Slow start, fast finish.
    EaseIn,
    /// Fast start, slow finish.
    EaseOut,
}

impl Ease {
    /// Map linear progress `t` in [0, 1] onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::EaseIn => t * t,
            Ease::EaseOut => t * (2.0 - t),
        }
    }
}

/// Values a tween can interpolate.
pub trait Lerp: Copy {
    fn lerp_to(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec2 {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self.lerp(to, t)
    }
}

/// Time-bounded animation of a single value from `from` to `to`.
///
/// A settled tween simply holds its target, so a field can always be backed by
/// one and retargeted at any time without tracking whether it is in motion.
#[derive(Debug, Clone, Copy)]
pub struct Tween<T: Lerp> {
    from: T,
    to: T,
    elapsed: f32,
    duration: f32,
    ease: Ease,
}

impl<T: Lerp> Tween<T> {
    /// A tween already resting at `value`.
    pub fn settled(value: T) -> Self {
        Self {
            from: value,
            to: value,
            elapsed: 0.0,
            duration: 0.0,
            ease: Ease::Linear,
        }
    }

    /// Start animating from the current value toward `to`.
    pub fn retarget(&mut self, to: T, duration: f32, ease: Ease) {
        self.from = self.value();
        self.to = to;
        self.elapsed = 0.0;
        self.duration = duration.max(0.0);
        self.ease = ease;
    }

    /// Jump straight to `value`, cancelling any motion.
    pub fn snap(&mut self, value: T) {
        *self = Self::settled(value);
    }

    /// Advance by `dt` seconds. Returns the time left over past completion,
    /// or `None` while still running (or already settled before this call).
    pub fn advance(&mut self, dt: f32) -> Option<f32> {
        if self.is_settled() {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            let overshoot = self.elapsed - self.duration;
            self.elapsed = self.duration;
            Some(overshoot)
        } else {
            None
        }
    }

    pub fn value(&self) -> T {
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            return self.to;
        }
        let t = self.ease.apply(self.elapsed / self.duration);
        self.from.lerp_to(self.to, t)
    }

    pub fn target(&self) -> T {
        self.to
    }

    pub fn is_settled(&self) -> bool {
        self.elapsed >= self.duration
    }
}

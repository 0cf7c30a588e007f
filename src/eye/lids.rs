use crate::util::tween::{Ease, Tween};

/// What the eyelids are currently doing. Only one phase runs at a time, which
/// is what keeps blinking, squinting, opening and closing mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidPhase {
    /// Resting open, free to blink or squint.
    Open,
    Opening,
    Blinking,
    Squinting,
    Closing,
    /// Fully shut after a close. Terminal.
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Move { to: f32, duration: f32, ease: Ease },
    Hold(f32),
}

/// Both eyelids of one eye. Upper and lower lids always run the same scale
/// sequence, so a single track drives them.
#[derive(Debug, Clone)]
pub struct Lids {
    phase: LidPhase,
    scale: Tween<f32>,
    steps: Vec<Step>,
    cursor: usize,
    hold: f32,
}

impl Lids {
    pub fn new() -> Self {
        Self {
            phase: LidPhase::Open,
            scale: Tween::settled(0.0),
            steps: Vec::with_capacity(3),
            cursor: 0,
            hold: 0.0,
        }
    }

    pub fn phase(&self) -> LidPhase {
        self.phase
    }

    pub fn scale(&self) -> f32 {
        self.scale.value()
    }

    /// Snap shut at `max_scale`, then retract over 0.5s.
    pub fn open_from(&mut self, max_scale: f32) {
        self.scale.snap(max_scale);
        self.run(
            LidPhase::Opening,
            &[Step::Move {
                to: 0.0,
                duration: 0.5,
                ease: Ease::EaseOut,
            }],
        );
    }

    /// Close to `max_scale` over half of `duration`, reopen over the rest.
    pub fn blink(&mut self, max_scale: f32, duration: f32) {
        let half = duration * 0.5;
        self.run(
            LidPhase::Blinking,
            &[
                Step::Move {
                    to: max_scale,
                    duration: half,
                    ease: Ease::EaseIn,
                },
                Step::Move {
                    to: 0.0,
                    duration: half,
                    ease: Ease::EaseOut,
                },
            ],
        );
    }

    /// Narrow to `depth` for 30% of `duration`, hold 40%, reopen over 30%.
    pub fn squint(&mut self, depth: f32, duration: f32) {
        self.run(
            LidPhase::Squinting,
            &[
                Step::Move {
                    to: depth,
                    duration: duration * 0.3,
                    ease: Ease::EaseOut,
                },
                Step::Hold(duration * 0.4),
                Step::Move {
                    to: 0.0,
                    duration: duration * 0.3,
                    ease: Ease::EaseIn,
                },
            ],
        );
    }

    /// Shut to `target` over 0.5s. Ends in `Closed`.
    pub fn close(&mut self, target: f32) {
        self.run(
            LidPhase::Closing,
            &[Step::Move {
                to: target,
                duration: 0.5,
                ease: Ease::EaseIn,
            }],
        );
    }

    /// Abort whatever is running and snap fully open. The aborted phase never
    /// reports completion.
    pub fn snap_open(&mut self) {
        self.steps.clear();
        self.cursor = 0;
        self.scale.snap(0.0);
        self.phase = LidPhase::Open;
    }

    pub fn is_animating(&self) -> bool {
        matches!(
            self.phase,
            LidPhase::Opening | LidPhase::Blinking | LidPhase::Squinting | LidPhase::Closing
        )
    }

    /// Advance by `dt`. Returns the phase that finished during this step, if any.
    pub fn advance(&mut self, dt: f32) -> Option<LidPhase> {
        if !self.is_animating() {
            return None;
        }
        let mut dt = dt;
        loop {
            let Some(step) = self.steps.get(self.cursor).copied() else {
                return Some(self.finish());
            };
            let leftover = match step {
                Step::Move { .. } if self.scale.is_settled() => Some(dt),
                Step::Move { .. } => self.scale.advance(dt),
                Step::Hold(_) => {
                    self.hold -= dt;
                    (self.hold <= 0.0).then_some(-self.hold)
                }
            };
            match leftover {
                Some(rest) => {
                    dt = rest;
                    self.cursor += 1;
                    self.begin_step();
                }
                None => return None,
            }
        }
    }

    fn run(&mut self, phase: LidPhase, steps: &[Step]) {
        self.phase = phase;
        self.steps.clear();
        self.steps.extend_from_slice(steps);
        self.cursor = 0;
        self.begin_step();
    }

    fn begin_step(&mut self) {
        match self.steps.get(self.cursor) {
            Some(&Step::Move { to, duration, ease }) => self.scale.retarget(to, duration, ease),
            Some(&Step::Hold(seconds)) => self.hold = seconds,
            None => {}
        }
    }

    fn finish(&mut self) -> LidPhase {
        let done = self.phase;
        self.phase = if done == LidPhase::Closing {
            LidPhase::Closed
        } else {
            LidPhase::Open
        };
        self.steps.clear();
        self.cursor = 0;
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_done(lids: &mut Lids, dt: f32, max_steps: usize) -> Option<(LidPhase, usize)> {
        for i in 0..max_steps {
            if let Some(done) = lids.advance(dt) {
                return Some((done, i + 1));
            }
        }
        None
    }

    #[test]
    fn blink_closes_then_reopens() {
        let mut lids = Lids::new();
        lids.blink(1.0, 0.15);
        assert_eq!(lids.phase(), LidPhase::Blinking);

        assert!(lids.advance(0.075).is_none());
        assert!((lids.scale() - 1.0).abs() < 1e-4);

        assert_eq!(lids.advance(0.08), Some(LidPhase::Blinking));
        assert_eq!(lids.phase(), LidPhase::Open);
        assert_eq!(lids.scale(), 0.0);
    }

    #[test]
    fn squint_holds_at_half_depth() {
        let mut lids = Lids::new();
        lids.squint(0.5, 2.0);
        lids.advance(0.6);
        lids.advance(0.5);
        assert!((lids.scale() - 0.5).abs() < 1e-4);
        assert_eq!(lids.phase(), LidPhase::Squinting);

        let (done, _) = run_until_done(&mut lids, 0.1, 20).unwrap();
        assert_eq!(done, LidPhase::Squinting);
        assert_eq!(lids.scale(), 0.0);
    }

    #[test]
    fn close_is_terminal() {
        let mut lids = Lids::new();
        lids.close(1.3);
        let (done, ticks) = run_until_done(&mut lids, 1.0 / 60.0, 60).unwrap();
        assert_eq!(done, LidPhase::Closing);
        assert!(ticks >= 30);
        assert_eq!(lids.phase(), LidPhase::Closed);
        assert!((lids.scale() - 1.3).abs() < 1e-4);
        assert!(lids.advance(1.0).is_none());
    }

    #[test]
    fn snap_open_drops_completion() {
        let mut lids = Lids::new();
        lids.open_from(1.0);
        lids.advance(0.1);
        lids.snap_open();
        assert_eq!(lids.phase(), LidPhase::Open);
        assert!(run_until_done(&mut lids, 0.1, 20).is_none());
    }

    #[test]
    fn one_large_step_runs_whole_sequence() {
        let mut lids = Lids::new();
        lids.squint(0.5, 1.0);
        assert_eq!(lids.advance(5.0), Some(LidPhase::Squinting));
    }
}

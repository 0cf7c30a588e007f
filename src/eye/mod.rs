pub mod lids;
pub mod pose;

use glam::Vec2;

use crate::util::timer::{range_f32, range_u32, Countdown};
use crate::util::tween::{Ease, Tween};
use lids::{LidPhase, Lids};
use pose::{Lid, Pose, Tint};

/// Eyeball sprite size in scene units before container scaling.
pub const EYEBALL_SIZE: Vec2 = Vec2::new(2048.0, 2048.0);

/// Container scale of a regular eye (calm and angry are the same size).
const NORMAL_EYE_SIZE: f32 = 0.05;
/// Container scale of the boss eye.
const BOSS_EYE_SIZE: f32 = 0.25;

const CALM_PUPIL_SIZE: f32 = 1.0;
const ANGRY_PUPIL_SIZE: f32 = 0.1;
/// Pupil travel at full gaze deflection, in eye-local units.
const MAX_PUPIL_OFFSET: f32 = 150.0;

/// Eyeball height/width ratio.
const CALM_ASPECT: f32 = 0.8;
const ANGRY_ASPECT: f32 = 1.0;
const EYELID_MAX_SCALE: f32 = 1.0;
/// Eyelid scale that fully covers a wide (angry-aspect) eyeball.
const WIDE_CLOSE_SCALE: f32 = 1.3;
const BOSS_CLOSE_SCALE: f32 = 2.0;

const BLINK_INTERVAL: (f32, f32) = (0.1, 3.0);
const BLINK_DURATION: f32 = 0.15;
const BLINKS_BEFORE_SQUINT: (u32, u32) = (2, 5);
const SQUINT_INTENSITY: f32 = 0.5;
const SQUINT_DURATION: (f32, f32) = (1.0, 3.0);

/// Seconds to cross-fade between calm and angry looks.
const MOOD_SWITCH_SECS: f32 = 0.3;
const TRACKED_GAZE_SECS: f32 = 0.1;
const WANDER_GAZE_SECS: f32 = 0.5;

const CALM_LOOK_INTERVAL: (f32, f32) = (0.5, 2.5);
const ANGRY_LOOK_INTERVAL: (f32, f32) = (0.1, 0.3);
/// Half-extents of the random gaze rectangle.
const CALM_LOOK_RANGE: Vec2 = Vec2::new(0.8, 0.7);
const ANGRY_LOOK_RANGE: Vec2 = Vec2::new(1.0, 1.0);

const VIBRATION_AMPLITUDE: f32 = 2.0;
const VIBRATION_STEP: f32 = 0.03;

/// Multiplier on the rendered half-width when keeping eyes apart.
const SAFETY_BUFFER: f32 = 1.5;

/// Completion notices an eye hands back to whoever ticks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeEvent {
    /// The open animation finished.
    Opened,
    /// The close animation finished; the eye can be dropped.
    Closed,
}

/// Per-eye behaviour machine: eyelid phases, blink/squint scheduling, random
/// gaze, angry mode. Commanded by the population, never reached into.
#[derive(Debug, Clone)]
pub struct Eye {
    is_boss: bool,
    normal_size: f32,
    angry_size: f32,
    angry: bool,

    lids: Lids,
    blink_count: u32,
    blinks_until_squint: u32,
    blink_wait: Option<Countdown>,

    face_tracked: bool,
    gaze_target: Vec2,
    random_look: Vec2,
    look_wait: Countdown,

    anchor: Vec2,
    jitter: Vec2,
    vibration: Option<Countdown>,

    scale: Tween<f32>,
    aspect: Tween<f32>,
    lid_offset: Tween<f32>,
    pupil_scale: Tween<f32>,
    gaze_offset: Tween<Vec2>,
    iris: Tint,
}

impl Eye {
    /// New eye resting open at `position`. Regular eyes start their blink loop
    /// right away; every eye starts wandering its gaze.
    pub fn spawn(position: Vec2, is_boss: bool, rng: &mut fastrand::Rng) -> Self {
        let size = if is_boss { BOSS_EYE_SIZE } else { NORMAL_EYE_SIZE };
        let mut eye = Self {
            is_boss,
            normal_size: size,
            angry_size: size,
            angry: false,
            lids: Lids::new(),
            blink_count: 0,
            blinks_until_squint: range_u32(rng, BLINKS_BEFORE_SQUINT.0, BLINKS_BEFORE_SQUINT.1),
            blink_wait: None,
            face_tracked: false,
            gaze_target: Vec2::ZERO,
            random_look: Vec2::ZERO,
            look_wait: Countdown::new(0.0),
            anchor: position,
            jitter: Vec2::ZERO,
            vibration: None,
            scale: Tween::settled(size),
            aspect: Tween::settled(CALM_ASPECT),
            lid_offset: Tween::settled(lid_rest_offset(CALM_ASPECT)),
            pupil_scale: Tween::settled(CALM_PUPIL_SIZE),
            gaze_offset: Tween::settled(Vec2::ZERO),
            iris: Tint::CALM,
        };
        if !is_boss {
            eye.schedule_blink(rng);
        }
        eye.schedule_look(rng);
        eye
    }

    /// Aim the pupil at a tracked face, or back at the last random look when
    /// tracking is lost.
    pub fn update(&mut self, gaze: Vec2, tracked: bool) {
        self.face_tracked = tracked;
        self.gaze_target = if tracked { gaze } else { self.random_look };
        self.aim();
    }

    /// Switch mood. Returns false when nothing changed: already in that mood,
    /// or the eye is closing.
    pub fn set_angry(&mut self, angry: bool, rng: &mut fastrand::Rng) -> bool {
        if angry == self.angry || self.is_closing() {
            return false;
        }
        self.angry = angry;
        if angry {
            self.enter_angry(rng);
        } else {
            self.exit_angry(rng);
        }
        true
    }

    /// Start from shut eyelids and retract them. `EyeEvent::Opened` follows
    /// from `tick` unless a later command cancels the opening.
    pub fn animate_open(&mut self) -> bool {
        if self.is_closing() {
            return false;
        }
        self.blink_wait = None;
        self.lids.open_from(EYELID_MAX_SCALE);
        true
    }

    /// Shut the eyelids for good. A close already in flight is left alone and
    /// this returns false; `EyeEvent::Closed` is reported exactly once.
    pub fn animate_close(&mut self) -> bool {
        if self.is_closing() {
            return false;
        }
        self.blink_wait = None;
        self.vibration = None;
        self.jitter = Vec2::ZERO;

        let aspect = self.aspect.value();
        self.lid_offset.snap(lid_rest_offset(aspect));

        let target = if self.is_boss {
            BOSS_CLOSE_SCALE
        } else if aspect >= 1.0 {
            WIDE_CLOSE_SCALE
        } else {
            EYELID_MAX_SCALE
        };
        self.lids.close(target);
        true
    }

    /// Advance all scheduled behaviour and running animations by `dt` seconds.
    pub fn tick(&mut self, dt: f32, rng: &mut fastrand::Rng) -> Option<EyeEvent> {
        // Timers first: anything they schedule starts counting next tick.
        if self.blink_wait.as_mut().is_some_and(|w| w.fire(dt)) {
            self.blink_wait = None;
            self.perform_blink(rng);
        }
        if self.look_wait.fire(dt) {
            self.perform_random_look(rng);
        }
        if let Some(step) = &mut self.vibration {
            if step.fire(dt) {
                *step = Countdown::new(VIBRATION_STEP);
                self.jitter = Vec2::new(
                    range_f32(rng, -VIBRATION_AMPLITUDE, VIBRATION_AMPLITUDE),
                    range_f32(rng, -VIBRATION_AMPLITUDE, VIBRATION_AMPLITUDE),
                );
            }
        }

        self.scale.advance(dt);
        self.aspect.advance(dt);
        self.lid_offset.advance(dt);
        self.pupil_scale.advance(dt);
        self.gaze_offset.advance(dt);

        match self.lids.advance(dt)? {
            LidPhase::Opening => {
                if !self.is_boss {
                    self.schedule_blink(rng);
                }
                Some(EyeEvent::Opened)
            }
            LidPhase::Blinking => {
                self.check_for_squint(rng);
                self.schedule_blink(rng);
                None
            }
            LidPhase::Closing => Some(EyeEvent::Closed),
            _ => None,
        }
    }

    /// Clearance this eye needs around its center.
    pub fn safety_radius(&self) -> f32 {
        (EYEBALL_SIZE.x * self.current_scale() / 2.0) * SAFETY_BUFFER
    }

    pub fn pose(&self) -> Pose {
        let lid_scale = self.lids.scale();
        let lid_offset = self.lid_offset.value();
        Pose {
            position: self.anchor + self.jitter,
            scale: self.scale.value(),
            eyeball_scale: Vec2::new(1.0, self.aspect.value()),
            iris: self.iris,
            gaze_offset: self.gaze_offset.value(),
            pupil_scale: self.pupil_scale.value(),
            upper_lid: Lid {
                scale_y: lid_scale,
                offset_y: lid_offset,
            },
            lower_lid: Lid {
                scale_y: lid_scale,
                offset_y: -lid_offset,
            },
        }
    }

    /// Resting center, ignoring vibration.
    pub fn position(&self) -> Vec2 {
        self.anchor
    }

    pub fn current_scale(&self) -> f32 {
        self.scale.value()
    }

    /// Smallest and largest container scale this eye can animate between.
    pub fn scale_bounds(&self) -> (f32, f32) {
        (
            self.normal_size.min(self.angry_size),
            self.normal_size.max(self.angry_size),
        )
    }

    pub fn gaze_target(&self) -> Vec2 {
        self.gaze_target
    }

    pub fn lid_phase(&self) -> LidPhase {
        self.lids.phase()
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn is_boss(&self) -> bool {
        self.is_boss
    }

    pub fn is_angry(&self) -> bool {
        self.angry
    }

    pub fn is_blinking(&self) -> bool {
        self.lids.phase() == LidPhase::Blinking
    }

    pub fn is_squinting(&self) -> bool {
        self.lids.phase() == LidPhase::Squinting
    }

    pub fn is_opening(&self) -> bool {
        self.lids.phase() == LidPhase::Opening
    }

    /// True from the moment a close is requested, including after it finished.
    pub fn is_closing(&self) -> bool {
        matches!(self.lids.phase(), LidPhase::Closing | LidPhase::Closed)
    }

    pub fn is_vibrating(&self) -> bool {
        self.vibration.is_some()
    }

    fn enter_angry(&mut self, rng: &mut fastrand::Rng) {
        // Cancels blink, squint and opening alike; none of them report.
        self.lids.snap_open();
        self.blink_wait = None;
        self.iris = Tint::ANGRY;
        self.schedule_look(rng);

        self.aspect.retarget(ANGRY_ASPECT, MOOD_SWITCH_SECS, Ease::EaseOut);
        self.lid_offset
            .retarget(lid_rest_offset(ANGRY_ASPECT), MOOD_SWITCH_SECS, Ease::EaseOut);
        self.scale.retarget(self.angry_size, MOOD_SWITCH_SECS, Ease::EaseOut);
        self.pupil_scale
            .retarget(ANGRY_PUPIL_SIZE, MOOD_SWITCH_SECS, Ease::EaseOut);

        self.vibration = Some(Countdown::new(0.0));
    }

    fn exit_angry(&mut self, rng: &mut fastrand::Rng) {
        self.vibration = None;
        self.jitter = Vec2::ZERO;
        self.iris = Tint::CALM;

        self.aspect.retarget(CALM_ASPECT, MOOD_SWITCH_SECS, Ease::EaseIn);
        self.lid_offset
            .retarget(lid_rest_offset(CALM_ASPECT), MOOD_SWITCH_SECS, Ease::EaseIn);
        self.scale.retarget(self.normal_size, MOOD_SWITCH_SECS, Ease::EaseIn);
        self.pupil_scale
            .retarget(CALM_PUPIL_SIZE, MOOD_SWITCH_SECS, Ease::EaseIn);

        self.schedule_blink(rng);
        self.schedule_look(rng);
    }

    /// Arm the next blink. The boss only gets here once it calms down.
    fn schedule_blink(&mut self, rng: &mut fastrand::Rng) {
        if self.angry || self.is_closing() {
            return;
        }
        let wait = range_f32(rng, BLINK_INTERVAL.0, BLINK_INTERVAL.1);
        self.blink_wait = Some(Countdown::new(wait));
    }

    fn perform_blink(&mut self, rng: &mut fastrand::Rng) {
        if self.angry || self.lids.phase() != LidPhase::Open {
            self.schedule_blink(rng);
            return;
        }
        self.blink_count += 1;
        self.lids.blink(EYELID_MAX_SCALE, BLINK_DURATION);
    }

    fn check_for_squint(&mut self, rng: &mut fastrand::Rng) {
        if self.blink_count < self.blinks_until_squint {
            return;
        }
        if self.angry || self.lids.phase() != LidPhase::Open {
            return;
        }
        self.blink_count = 0;
        self.blinks_until_squint = range_u32(rng, BLINKS_BEFORE_SQUINT.0, BLINKS_BEFORE_SQUINT.1);
        let duration = range_f32(rng, SQUINT_DURATION.0, SQUINT_DURATION.1);
        self.lids
            .squint(EYELID_MAX_SCALE * SQUINT_INTENSITY, duration);
    }

    fn schedule_look(&mut self, rng: &mut fastrand::Rng) {
        let (min, max) = if self.angry {
            ANGRY_LOOK_INTERVAL
        } else {
            CALM_LOOK_INTERVAL
        };
        self.look_wait = Countdown::new(range_f32(rng, min, max));
    }

    fn perform_random_look(&mut self, rng: &mut fastrand::Rng) {
        let range = if self.angry {
            ANGRY_LOOK_RANGE
        } else {
            CALM_LOOK_RANGE
        };
        self.random_look = Vec2::new(
            range_f32(rng, -range.x, range.x),
            range_f32(rng, -range.y, range.y),
        );
        if !self.face_tracked {
            self.gaze_target = self.random_look;
            self.aim();
        }
        self.schedule_look(rng);
    }

    fn aim(&mut self) {
        let scale_factor = self.current_scale() / self.angry_size;
        let offset = self.gaze_target * MAX_PUPIL_OFFSET * scale_factor;
        let duration = if self.face_tracked {
            TRACKED_GAZE_SECS
        } else {
            WANDER_GAZE_SECS
        };
        self.gaze_offset.retarget(offset, duration, Ease::EaseOut);
    }
}

/// Distance from the eye center to where the eyelids hinge.
fn lid_rest_offset(aspect: f32) -> f32 {
    let height = EYEBALL_SIZE.y * aspect;
    if aspect >= 1.0 {
        height
    } else {
        height / 1.5
    }
}

pub mod config;
pub mod mode;
pub mod placement;

use glam::Vec2;

use crate::eye::{Eye, EyeEvent};
use crate::scene::{EyeId, SceneEvent, Surface};
use crate::util::timer::range_f64;
use config::PopulationConfig;
use mode::{AngryTimers, BossPhase, BossTimers, Mode, NormalTimers, Phase};
use placement::Occupant;

/// Owns every eye and runs the swarm mood machine.
///
/// All methods must be called from one logical sequence (the frame driver):
/// events from capture threads are marshaled onto it before they get here.
/// Times are monotonic seconds from the same clock as `tick`.
pub struct Population {
    config: PopulationConfig,
    world: hecs::World,
    /// Regular eyes in spawn order. Index 0 is never picked for removal.
    order: Vec<EyeId>,
    /// Eyes handed over to the boss sequence, closing and no longer counted.
    departing: Vec<EyeId>,
    boss: Option<EyeId>,
    phase: Phase,
    last_accepted_noise: Option<f64>,
    last_tick: Option<f64>,
    rng: fastrand::Rng,
    scene: Vec<SceneEvent>,
    closed: Vec<EyeId>,
}

impl Population {
    /// New swarm with a single eye opening at the origin.
    pub fn new(config: PopulationConfig) -> Self {
        Self::from_rng(config, fastrand::Rng::new())
    }

    /// Deterministic swarm for tests and replays.
    pub fn with_seed(config: PopulationConfig, seed: u64) -> Self {
        Self::from_rng(config, fastrand::Rng::with_seed(seed))
    }

    fn from_rng(config: PopulationConfig, rng: fastrand::Rng) -> Self {
        let mut population = Self {
            world: hecs::World::new(),
            order: Vec::with_capacity(config.max_eyes),
            departing: Vec::with_capacity(config.max_eyes),
            boss: None,
            phase: Phase::Normal(NormalTimers::default()),
            last_accepted_noise: None,
            last_tick: None,
            rng,
            scene: Vec::new(),
            closed: Vec::new(),
            config,
        };
        population.spawn_eye(Vec2::ZERO);
        log::info!(
            "Population started ({} profile)",
            population.config.profile.label()
        );
        population
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Audio crossed the noise threshold.
    pub fn on_noise(&mut self, now: f64) {
        match &mut self.phase {
            Phase::Normal(timers) => {
                timers.silence_since = None;
                let accepted = self
                    .last_accepted_noise
                    .map_or(true, |last| now - last >= self.config.spawn_interval);
                if !accepted {
                    return;
                }
                self.last_accepted_noise = Some(now);
                if self.order.len() < self.config.max_eyes {
                    self.spawn_eye_at_random();
                } else if self.config.escalation {
                    self.enter_angry();
                }
            }
            Phase::Angry(timers) => {
                timers.silence_since = None;
                timers.noise_since = timers.noise_since.or(Some(now));
            }
            Phase::Boss(BossPhase::Active(timers)) => {
                timers.clear();
                if !timers.angry {
                    self.set_boss_angry(true);
                }
            }
            Phase::Boss(_) => {}
        }
    }

    /// Audio stayed under the noise threshold.
    pub fn on_silence(&mut self, now: f64) {
        match &mut self.phase {
            Phase::Normal(timers) => {
                timers.silence_since = timers.silence_since.or(Some(now));
            }
            Phase::Angry(timers) => {
                timers.noise_since = None;
                timers.silence_since = timers.silence_since.or(Some(now));
            }
            Phase::Boss(BossPhase::Active(timers)) => {
                if timers.angry {
                    timers.angry_silence_since = timers.angry_silence_since.or(Some(now));
                } else {
                    timers.calm_silence_since = timers.calm_silence_since.or(Some(now));
                }
            }
            Phase::Boss(_) => {}
        }
    }

    /// Forward one gaze update to every live eye, or only to the boss while
    /// one is on screen.
    pub fn on_face_update(&mut self, position: Vec2, detected: bool) {
        if let Some(boss) = self.boss {
            if let Ok(mut eye) = self.world.get::<&mut Eye>(boss) {
                eye.update(position, detected);
            }
            return;
        }
        for &id in &self.order {
            if let Ok(mut eye) = self.world.get::<&mut Eye>(id) {
                eye.update(position, detected);
            }
        }
    }

    /// Advance every eye to `now` and fire any mode transition whose
    /// threshold has been reached. Call at least once per frame.
    pub fn tick(&mut self, now: f64) {
        let dt = self.last_tick.map_or(0.0, |last| (now - last).max(0.0)) as f32;
        self.last_tick = Some(now);

        self.advance_eyes(dt);
        self.retire_closed(now);
        self.advance_phase(now);
    }

    /// Push membership changes and current poses to the renderer.
    pub fn publish(&mut self, surface: &mut dyn Surface) {
        for event in self.scene.drain(..) {
            match event {
                SceneEvent::Attached(id) => {
                    if let Ok(eye) = self.world.get::<&Eye>(id) {
                        surface.attach(id, &eye.pose());
                    }
                }
                SceneEvent::Detached(id) => surface.detach(id),
            }
        }
        for (id, eye) in self.world.query::<&Eye>().iter() {
            surface.present(id, &eye.pose());
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.phase.mode()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// Regular eyes in spawn order, including ones closing for removal.
    pub fn eye_ids(&self) -> &[EyeId] {
        &self.order
    }

    pub fn eye_count(&self) -> usize {
        self.order.len()
    }

    /// Regular eyes not already on their way out.
    pub fn live_count(&self) -> usize {
        self.order
            .iter()
            .filter(|&&id| !self.is_closing(id))
            .count()
    }

    pub fn boss_id(&self) -> Option<EyeId> {
        self.boss
    }

    /// Every eye still in the scene, whatever its role.
    pub fn entity_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Inspect one eye.
    pub fn with_eye<R>(&self, id: EyeId, f: impl FnOnce(&Eye) -> R) -> Option<R> {
        self.world.get::<&Eye>(id).ok().map(|eye| f(&*eye))
    }

    // -----------------------------------------------------------------------
    // Frame step
    // -----------------------------------------------------------------------

    fn advance_eyes(&mut self, dt: f32) {
        self.closed.clear();
        for (id, eye) in self.world.query_mut::<&mut Eye>() {
            match eye.tick(dt, &mut self.rng) {
                Some(EyeEvent::Closed) => self.closed.push(id),
                Some(EyeEvent::Opened) => log::trace!("Eye {id:?} opened"),
                None => {}
            }
        }
    }

    fn retire_closed(&mut self, now: f64) {
        let closed = std::mem::take(&mut self.closed);
        for &id in &closed {
            if self.world.despawn(id).is_err() {
                continue;
            }
            self.scene.push(SceneEvent::Detached(id));

            if self.boss == Some(id) {
                self.boss = None;
                log::info!("Boss closed, respawning in {:.1}s", self.config.respawn_delay);
                self.phase = Phase::Boss(BossPhase::Respawning {
                    until: now + self.config.respawn_delay,
                });
            } else if let Some(i) = self.departing.iter().position(|&d| d == id) {
                self.departing.swap_remove(i);
            } else {
                self.order.retain(|&e| e != id);
                log::debug!("Eye {id:?} removed, {} left", self.order.len());
            }
        }
        self.closed = closed;

        if self.phase == Phase::Boss(BossPhase::Gathering) && self.departing.is_empty() {
            self.phase = Phase::Boss(BossPhase::Settling {
                until: now + self.config.boss_settle_delay,
            });
        }
    }

    fn advance_phase(&mut self, now: f64) {
        match self.phase {
            Phase::Normal(timers) => {
                let Some(since) = timers.silence_since else {
                    return;
                };
                if now - since >= self.config.removal_silence && self.remove_random_eye() {
                    self.phase = Phase::Normal(NormalTimers {
                        silence_since: Some(now),
                    });
                }
            }
            Phase::Angry(timers) => {
                if timers
                    .silence_since
                    .is_some_and(|since| now - since >= timers.required_silence)
                {
                    self.exit_angry();
                } else if timers
                    .noise_since
                    .is_some_and(|since| now - since >= timers.required_noise)
                {
                    self.enter_boss(now);
                }
            }
            Phase::Boss(BossPhase::Settling { until }) if now >= until => self.spawn_boss(),
            Phase::Boss(BossPhase::Active(timers)) => {
                if timers.angry {
                    if timers
                        .angry_silence_since
                        .is_some_and(|since| now - since >= timers.required_calm_silence)
                    {
                        self.set_boss_angry(false);
                    }
                } else if timers
                    .calm_silence_since
                    .is_some_and(|since| now - since >= self.config.boss_reset_silence)
                {
                    self.close_boss(now);
                }
            }
            Phase::Boss(BossPhase::Respawning { until }) if now >= until => self.reset(),
            Phase::Boss(_) => {}
        }
    }

    // -----------------------------------------------------------------------
    // Spawning and removal
    // -----------------------------------------------------------------------

    fn spawn_eye(&mut self, position: Vec2) -> EyeId {
        let mut eye = Eye::spawn(position, false, &mut self.rng);
        eye.animate_open();
        let id = self.world.spawn((eye,));
        self.order.push(id);
        self.scene.push(SceneEvent::Attached(id));
        log::debug!(
            "Spawned eye {id:?} at ({:.0}, {:.0}), {} total",
            position.x,
            position.y,
            self.order.len()
        );
        id
    }

    fn spawn_eye_at_random(&mut self) -> EyeId {
        let occupants: Vec<Occupant> = self
            .order
            .iter()
            .filter_map(|&id| {
                self.world.get::<&Eye>(id).ok().map(|eye| Occupant {
                    center: eye.position(),
                    safety_radius: eye.safety_radius(),
                })
            })
            .collect();
        let position = placement::find_spawn_position(&occupants, &self.config, &mut self.rng);
        self.spawn_eye(position)
    }

    /// Start closing one random eye other than the first. Eyes already closing
    /// count as gone. Returns false when only the first eye is left.
    fn remove_random_eye(&mut self) -> bool {
        let candidates: Vec<EyeId> = self
            .order
            .iter()
            .skip(1)
            .copied()
            .filter(|&id| !self.is_closing(id))
            .collect();
        if candidates.is_empty() {
            return false;
        }
        let id = candidates[self.rng.usize(0..candidates.len())];
        let started = self
            .world
            .get::<&mut Eye>(id)
            .map(|mut eye| eye.animate_close())
            .unwrap_or(false);
        if started {
            log::debug!("Closing eye {id:?}, {} live left", self.live_count());
        }
        started
    }

    fn is_closing(&self, id: EyeId) -> bool {
        self.with_eye(id, Eye::is_closing).unwrap_or(true)
    }

    // -----------------------------------------------------------------------
    // Mode transitions
    // -----------------------------------------------------------------------

    fn enter_angry(&mut self) {
        self.phase = Phase::Angry(AngryTimers {
            silence_since: None,
            noise_since: None,
            required_silence: self.draw(self.config.angry_exit_silence),
            required_noise: self.draw(self.config.boss_entry_noise),
        });
        self.set_all_angry(true);
        log::info!("Mode -> {} with {} eyes", Mode::Angry.label(), self.order.len());
    }

    fn exit_angry(&mut self) {
        self.phase = Phase::Normal(NormalTimers::default());
        self.set_all_angry(false);
        log::info!("Mode -> {}", Mode::Normal.label());
    }

    fn set_all_angry(&mut self, angry: bool) {
        for &id in &self.order {
            if let Ok(mut eye) = self.world.get::<&mut Eye>(id) {
                eye.set_angry(angry, &mut self.rng);
            }
        }
    }

    /// Close every regular eye; the boss follows once all of them are gone.
    fn enter_boss(&mut self, now: f64) {
        self.phase = Phase::Boss(BossPhase::Gathering);
        for &id in &self.order {
            if let Ok(mut eye) = self.world.get::<&mut Eye>(id) {
                eye.animate_close();
            }
        }
        self.departing.append(&mut self.order);
        log::info!(
            "Mode -> {}: closing {} eyes",
            Mode::Boss.label(),
            self.departing.len()
        );
        if self.departing.is_empty() {
            self.phase = Phase::Boss(BossPhase::Settling {
                until: now + self.config.boss_settle_delay,
            });
        }
    }

    fn spawn_boss(&mut self) {
        let mut eye = Eye::spawn(Vec2::ZERO, true, &mut self.rng);
        eye.animate_open();
        eye.set_angry(true, &mut self.rng);
        let id = self.world.spawn((eye,));
        self.boss = Some(id);
        self.scene.push(SceneEvent::Attached(id));
        self.phase = Phase::Boss(BossPhase::Active(BossTimers {
            angry: true,
            angry_silence_since: None,
            calm_silence_since: None,
            required_calm_silence: self.draw(self.config.boss_calm_silence),
        }));
        log::info!("Boss eye {id:?} spawned");
    }

    fn set_boss_angry(&mut self, angry: bool) {
        let Some(id) = self.boss else {
            return;
        };
        if let Ok(mut eye) = self.world.get::<&mut Eye>(id) {
            eye.set_angry(angry, &mut self.rng);
        }
        let required = if angry {
            Some(self.draw(self.config.boss_calm_silence))
        } else {
            None
        };
        if let Phase::Boss(BossPhase::Active(timers)) = &mut self.phase {
            timers.angry = angry;
            timers.clear();
            if let Some(required) = required {
                timers.required_calm_silence = required;
            }
        }
        log::info!("Boss is {}", if angry { "angry" } else { "calm" });
    }

    fn close_boss(&mut self, now: f64) {
        let closing = self.boss.is_some_and(|id| {
            self.world
                .get::<&mut Eye>(id)
                .map(|mut eye| {
                    eye.animate_close();
                    true
                })
                .unwrap_or(false)
        });
        self.phase = Phase::Boss(if closing {
            BossPhase::Leaving
        } else {
            BossPhase::Respawning {
                until: now + self.config.respawn_delay,
            }
        });
    }

    /// Back to a single calm eye at the origin.
    fn reset(&mut self) {
        self.phase = Phase::Normal(NormalTimers::default());
        self.last_accepted_noise = None;
        self.spawn_eye(Vec2::ZERO);
        log::info!("Mode -> {} (reset)", Mode::Normal.label());
    }

    fn draw(&mut self, (min, max): (f64, f64)) -> f64 {
        range_f64(&mut self.rng, min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One eye is already a full swarm, so the first noise turns it angry.
    fn crowded() -> PopulationConfig {
        PopulationConfig {
            max_eyes: 1,
            ..PopulationConfig::default()
        }
    }

    fn angry_timers(pop: &Population) -> AngryTimers {
        match pop.phase {
            Phase::Angry(timers) => timers,
            other => panic!("expected angry, got {other:?}"),
        }
    }

    fn boss_timers(pop: &Population) -> BossTimers {
        match pop.phase {
            Phase::Boss(BossPhase::Active(timers)) => timers,
            other => panic!("expected active boss, got {other:?}"),
        }
    }

    fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
        (min..=max).contains(&value)
    }

    #[test]
    fn removal_counts_pending_closes_as_gone() {
        let mut pop = Population::with_seed(PopulationConfig::default(), 1);
        pop.on_noise(0.0);
        pop.on_noise(1.0);
        pop.tick(2.0);
        assert_eq!(pop.eye_count(), 3);

        assert!(pop.remove_random_eye());
        assert!(pop.remove_random_eye());
        assert!(!pop.remove_random_eye());
        assert_eq!(pop.eye_count(), 3);
        assert_eq!(pop.live_count(), 1);

        pop.tick(2.6);
        assert_eq!(pop.eye_count(), 1);
        assert!(!pop.is_closing(pop.order[0]));
    }

    #[test]
    fn boss_waits_for_eyes_already_closing() {
        let mut pop = Population::with_seed(PopulationConfig::default(), 2);
        pop.on_noise(0.0);
        pop.on_noise(1.0);
        pop.tick(1.0);
        assert!(pop.remove_random_eye());

        pop.enter_boss(1.0);
        assert_eq!(pop.phase, Phase::Boss(BossPhase::Gathering));
        assert!(pop.order.is_empty());
        assert_eq!(pop.departing.len(), 3);

        let mut t = 1.0;
        while pop.boss.is_none() {
            t += 0.05;
            pop.tick(t);
            assert!(t < 10.0, "boss never spawned");
        }
        assert!(pop.departing.is_empty());
        assert_eq!(pop.entity_count(), 1);
        assert!(t > 1.9);
    }

    #[test]
    fn scene_outbox_drains_once() {
        struct Count(usize, usize);
        impl Surface for Count {
            fn attach(&mut self, _: EyeId, _: &crate::eye::pose::Pose) {
                self.0 += 1;
            }
            fn present(&mut self, _: EyeId, _: &crate::eye::pose::Pose) {}
            fn detach(&mut self, _: EyeId) {
                self.1 += 1;
            }
        }

        let mut pop = Population::with_seed(PopulationConfig::default(), 3);
        pop.on_noise(0.0);
        let mut surface = Count(0, 0);
        pop.publish(&mut surface);
        pop.publish(&mut surface);
        assert_eq!((surface.0, surface.1), (2, 0));
        assert!(pop.scene.is_empty());
    }

    #[test]
    fn angry_thresholds_are_redrawn_on_every_entry() {
        let mut pop = Population::with_seed(crowded(), 4);
        pop.tick(0.0);
        pop.on_noise(0.0);
        let first = angry_timers(&pop);

        pop.on_silence(0.0);
        pop.tick(6.0);
        assert_eq!(pop.mode(), Mode::Normal);

        pop.on_noise(7.0);
        let second = angry_timers(&pop);

        for timers in [first, second] {
            assert!(in_range(timers.required_noise, pop.config.boss_entry_noise));
            assert!(in_range(timers.required_silence, pop.config.angry_exit_silence));
        }
        assert_ne!(first.required_noise, second.required_noise);
        assert_ne!(first.required_silence, second.required_silence);
    }

    #[test]
    fn angry_holds_until_its_thresholds() {
        let mut pop = Population::with_seed(crowded(), 5);
        pop.tick(0.0);
        pop.on_noise(0.0);
        assert_eq!(pop.mode(), Mode::Angry);

        // 1.9 s of unbroken noise is never enough for the boss.
        for i in 0..=114 {
            let t = 1.0 + i as f64 / 60.0;
            pop.on_noise(t);
            pop.tick(t);
        }
        assert_eq!(pop.mode(), Mode::Angry);

        // 2.9 s of silence is never enough to calm down.
        for i in 0..=174 {
            let t = 3.0 + i as f64 / 60.0;
            pop.on_silence(t);
            pop.tick(t);
        }
        assert_eq!(pop.mode(), Mode::Angry);

        for i in 175..=312 {
            let t = 3.0 + i as f64 / 60.0;
            pop.on_silence(t);
            pop.tick(t);
        }
        assert_eq!(pop.mode(), Mode::Normal);
    }

    #[test]
    fn boss_calm_threshold_is_redrawn_each_time_it_gets_angry() {
        let mut pop = Population::with_seed(crowded(), 6);
        pop.tick(0.0);
        pop.enter_boss(0.0);
        let mut t = 0.0;
        while pop.boss.is_none() {
            t += 0.05;
            pop.tick(t);
        }
        let first = boss_timers(&pop);
        assert!(first.angry);
        assert!(in_range(first.required_calm_silence, pop.config.boss_calm_silence));

        pop.on_silence(t);
        t += first.required_calm_silence + 0.1;
        pop.tick(t);
        assert!(!boss_timers(&pop).angry);

        pop.on_noise(t);
        let second = boss_timers(&pop);
        assert!(second.angry);
        assert!(in_range(second.required_calm_silence, pop.config.boss_calm_silence));
        assert_ne!(first.required_calm_silence, second.required_calm_silence);
    }
}

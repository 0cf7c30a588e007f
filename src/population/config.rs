use glam::Vec2;

/// Axis-aligned screen rectangle in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Rectangle of the given size centred on the scene origin.
    pub fn centered(width: f32, height: f32) -> Self {
        let half = Vec2::new(width, height) * 0.5;
        Self {
            min: -half,
            max: half,
        }
    }

    /// Shrink by `margin` on every side. Collapses to the center line instead
    /// of inverting when the rectangle is too small.
    pub fn inset(self, margin: f32) -> Self {
        let center = (self.min + self.max) * 0.5;
        let min = (self.min + Vec2::splat(margin)).min(center);
        let max = (self.max - Vec2::splat(margin)).max(center);
        Self { min, max }
    }
}

/// How far a new eye must stay from an existing one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clearance {
    /// Existing eye's safety radius plus this fixed radius for the newcomer.
    Additive(f32),
    /// One fixed center-to-center distance regardless of eye size.
    Flat(f32),
}

impl Clearance {
    pub fn required(self, existing_radius: f32) -> f32 {
        match self {
            Clearance::Additive(r) => existing_radius + r,
            Clearance::Flat(d) => d,
        }
    }
}

/// Controller variant. `Full` escalates through angry and boss modes;
/// `Simple` only spawns and removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Full,
    Simple,
}

impl Profile {
    pub fn label(self) -> &'static str {
        match self {
            Profile::Full => "full",
            Profile::Simple => "simple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Profile::Full),
            "simple" => Some(Profile::Simple),
            _ => None,
        }
    }
}

/// Tunables for the population controller. Durations are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationConfig {
    pub profile: Profile,
    pub bounds: Bounds,
    /// Eye count at which further noise turns the swarm angry.
    pub max_eyes: usize,
    /// Minimum gap between two accepted noise events in normal mode.
    pub spawn_interval: f64,
    /// Silence that removes one eye in normal mode (repeats while silent).
    pub removal_silence: f64,
    /// Whether hitting `max_eyes` escalates to angry/boss modes.
    pub escalation: bool,
    /// Spawn area inset from the screen edge.
    pub spawn_margin: f32,
    /// Candidates tried before falling back to best-available placement.
    pub placement_attempts: usize,
    /// Candidates sampled for the best-available fallback.
    pub fallback_candidates: usize,
    pub clearance: Clearance,
    /// Silence needed to calm an angry swarm, drawn on each angry entry.
    pub angry_exit_silence: (f64, f64),
    /// Sustained noise that summons the boss, drawn on each angry entry.
    pub boss_entry_noise: (f64, f64),
    /// Silence needed to calm an angry boss, drawn whenever it gets angry.
    pub boss_calm_silence: (f64, f64),
    /// Silence that dismisses a calm boss.
    pub boss_reset_silence: f64,
    /// Pause between the last eye closing and the boss appearing.
    pub boss_settle_delay: f64,
    /// Pause between the boss closing and the first eye returning.
    pub respawn_delay: f64,
}

impl PopulationConfig {
    pub fn preset(profile: Profile) -> Self {
        let full = Self {
            profile,
            bounds: Bounds::centered(1920.0, 1080.0),
            max_eyes: 20,
            spawn_interval: 0.5,
            removal_silence: 2.0,
            escalation: true,
            spawn_margin: 100.0,
            placement_attempts: 50,
            fallback_candidates: 20,
            clearance: Clearance::Additive(350.0),
            angry_exit_silence: (3.0, 5.0),
            boss_entry_noise: (2.0, 3.0),
            boss_calm_silence: (3.0, 5.0),
            boss_reset_silence: 3.0,
            boss_settle_delay: 0.5,
            respawn_delay: 0.5,
        };
        match profile {
            Profile::Full => full,
            Profile::Simple => Self {
                spawn_interval: 0.8,
                removal_silence: 1.5,
                escalation: false,
                placement_attempts: 20,
                clearance: Clearance::Flat(250.0),
                ..full
            },
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self::preset(Profile::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_profile_differs_only_in_variant_constants() {
        let full = PopulationConfig::preset(Profile::Full);
        let simple = PopulationConfig::preset(Profile::Simple);
        assert_eq!(simple.spawn_interval, 0.8);
        assert_eq!(simple.removal_silence, 1.5);
        assert_eq!(simple.placement_attempts, 20);
        assert_eq!(simple.clearance, Clearance::Flat(250.0));
        assert!(!simple.escalation);
        assert_eq!(simple.max_eyes, full.max_eyes);
        assert_eq!(simple.bounds, full.bounds);
    }

    #[test]
    fn inset_never_inverts() {
        let b = Bounds::centered(100.0, 400.0).inset(100.0);
        assert_eq!(b.min.x, 0.0);
        assert_eq!(b.max.x, 0.0);
        assert_eq!(b.min.y, -100.0);
        assert_eq!(b.max.y, 100.0);
    }

    #[test]
    fn profile_parse_roundtrips_labels() {
        for p in [Profile::Full, Profile::Simple] {
            assert_eq!(Profile::parse(p.label()), Some(p));
        }
        assert_eq!(Profile::parse(" FULL "), Some(Profile::Full));
        assert_eq!(Profile::parse("boss"), None);
    }

    #[test]
    fn clearance_rules() {
        assert!((Clearance::Additive(350.0).required(76.8) - 426.8).abs() < 1e-3);
        assert_eq!(Clearance::Flat(250.0).required(76.8), 250.0);
    }
}

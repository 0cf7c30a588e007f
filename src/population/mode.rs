/// Swarm mood as seen from outside. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Angry,
    Boss,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::Angry => "Angry",
            Mode::Boss => "Boss",
        }
    }
}

/// Timers for normal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalTimers {
    /// Start of the current silent stretch (restarts after every removal).
    pub silence_since: Option<f64>,
}

/// Timers for angry mode. Thresholds are drawn on entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngryTimers {
    pub silence_since: Option<f64>,
    pub noise_since: Option<f64>,
    pub required_silence: f64,
    pub required_noise: f64,
}

/// Where the boss sequence currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BossPhase {
    /// Waiting for every regular eye to finish closing.
    Gathering,
    /// All eyes gone; the boss appears at `until`.
    Settling { until: f64 },
    /// Boss on screen.
    Active(BossTimers),
    /// Boss closing on its way out.
    Leaving,
    /// Boss gone; the first regular eye returns at `until`.
    Respawning { until: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossTimers {
    pub angry: bool,
    pub angry_silence_since: Option<f64>,
    pub calm_silence_since: Option<f64>,
    /// Silence that calms the boss, drawn each time it becomes angry.
    pub required_calm_silence: f64,
}

impl BossTimers {
    pub fn clear(&mut self) {
        self.angry_silence_since = None;
        self.calm_silence_since = None;
    }
}

/// Full controller state machine with per-mode timer data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Normal(NormalTimers),
    Angry(AngryTimers),
    Boss(BossPhase),
}

impl Phase {
    pub fn mode(&self) -> Mode {
        match self {
            Phase::Normal(_) => Mode::Normal,
            Phase::Angry(_) => Mode::Angry,
            Phase::Boss(_) => Mode::Boss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phase_maps_to_one_mode() {
        let boss = BossTimers {
            angry: true,
            angry_silence_since: None,
            calm_silence_since: None,
            required_calm_silence: 3.0,
        };
        let cases = [
            (Phase::Normal(NormalTimers::default()), Mode::Normal),
            (
                Phase::Angry(AngryTimers {
                    silence_since: None,
                    noise_since: None,
                    required_silence: 3.0,
                    required_noise: 2.0,
                }),
                Mode::Angry,
            ),
            (Phase::Boss(BossPhase::Gathering), Mode::Boss),
            (Phase::Boss(BossPhase::Settling { until: 1.0 }), Mode::Boss),
            (Phase::Boss(BossPhase::Active(boss)), Mode::Boss),
            (Phase::Boss(BossPhase::Leaving), Mode::Boss),
            (Phase::Boss(BossPhase::Respawning { until: 1.0 }), Mode::Boss),
        ];
        for (phase, mode) in cases {
            assert_eq!(phase.mode(), mode);
        }
        assert_eq!(Mode::Angry.label(), "Angry");
    }
}

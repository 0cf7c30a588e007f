use std::time::Duration;

use instant::Instant;

use crate::input::gaze::SyntheticGaze;
use crate::input::{EventBus, Source};
use crate::population::config::{Bounds, PopulationConfig, Profile};
use crate::population::Population;
use crate::scene::LogSurface;

/// Target frame period (seconds).
const FRAME_RATE: f64 = 1.0 / 60.0;
/// How often to log FPS and swarm state (seconds).
const STATS_LOG_INTERVAL: f64 = 5.0;
/// Run time when none is configured.
const DEFAULT_RUN_SECS: f64 = 60.0;
const DEFAULT_SCREEN: (f32, f32) = (1920.0, 1080.0);

const PROFILE_ENV: &str = "NOISY_EYES_PROFILE";
const RUN_SECS_ENV: &str = "NOISY_EYES_RUN_SECS";
const SCREEN_ENV: &str = "NOISY_EYES_SCREEN";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub profile: Profile,
    /// Stop after this many seconds; `None` runs until killed.
    pub run_for: Option<f64>,
    /// Screen rectangle eyes spawn in, centred on the origin.
    pub screen: Bounds,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Full,
            run_for: Some(DEFAULT_RUN_SECS),
            screen: Bounds::centered(DEFAULT_SCREEN.0, DEFAULT_SCREEN.1),
        }
    }
}

impl RunOptions {
    /// Read overrides from the environment. Bad values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(PROFILE_ENV).ok().as_deref(),
            std::env::var(RUN_SECS_ENV).ok().as_deref(),
            std::env::var(SCREEN_ENV).ok().as_deref(),
        )
    }

    fn from_vars(profile: Option<&str>, run_secs: Option<&str>, screen: Option<&str>) -> Self {
        let mut options = Self::default();
        if let Some(raw) = profile {
            match Profile::parse(raw) {
                Some(p) => options.profile = p,
                None => log::warn!("Unknown {PROFILE_ENV} {raw:?}, using full"),
            }
        }
        if let Some(raw) = run_secs {
            match raw.trim().parse::<f64>() {
                Ok(secs) if secs == 0.0 => options.run_for = None,
                Ok(secs) if secs > 0.0 && secs.is_finite() => options.run_for = Some(secs),
                _ => log::warn!("Bad {RUN_SECS_ENV} {raw:?}, using {DEFAULT_RUN_SECS}s"),
            }
        }
        if let Some(raw) = screen {
            match parse_screen(raw) {
                Some(bounds) => options.screen = bounds,
                None => log::warn!(
                    "Bad {SCREEN_ENV} {raw:?}, using {}x{}",
                    DEFAULT_SCREEN.0,
                    DEFAULT_SCREEN.1
                ),
            }
        }
        options
    }

    pub fn population_config(&self) -> PopulationConfig {
        PopulationConfig::preset(self.profile).with_bounds(self.screen)
    }
}

/// `"WIDTHxHEIGHT"` in scene units, both positive.
fn parse_screen(raw: &str) -> Option<Bounds> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let w: f32 = w.trim().parse().ok()?;
    let h: f32 = h.trim().parse().ok()?;
    if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() {
        Some(Bounds::centered(w, h))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

struct FrameStats {
    frame_count: u64,
    last_log_time: Instant,
    frame_time_sum: f64,
    frame_time_max: f64,
    frames_since_log: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frame_count: 0,
            last_log_time: Instant::now(),
            frame_time_sum: 0.0,
            frame_time_max: 0.0,
            frames_since_log: 0,
        }
    }

    fn record_frame(&mut self, dt: f64, population: &Population) {
        self.frame_count += 1;
        self.frames_since_log += 1;
        self.frame_time_sum += dt;
        self.frame_time_max = self.frame_time_max.max(dt);

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= STATS_LOG_INTERVAL {
            let avg_ms = (self.frame_time_sum / self.frames_since_log as f64) * 1000.0;
            let fps = self.frames_since_log as f64 / elapsed;
            log::info!(
                "FPS: {:.0} | avg: {:.2}ms | max: {:.2}ms | mode: {} | eyes: {} | frames: {}",
                fps,
                avg_ms,
                self.frame_time_max * 1000.0,
                population.mode().label(),
                population.entity_count(),
                self.frame_count,
            );
            self.last_log_time = Instant::now();
            self.frame_time_sum = 0.0;
            self.frame_time_max = 0.0;
            self.frames_since_log = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Frame driver: the single sequence every population call happens on.
struct App {
    population: Population,
    bus: EventBus,
    sources: Vec<Box<dyn Source>>,
    surface: LogSurface,
    frame_stats: FrameStats,
}

impl App {
    fn new(population: Population, sources: Vec<Box<dyn Source>>) -> Self {
        Self {
            population,
            bus: EventBus::new(),
            sources,
            surface: LogSurface::new(),
            frame_stats: FrameStats::new(),
        }
    }

    /// Start every source; one that can't start is skipped and the swarm
    /// runs on whatever events still arrive.
    fn start_sources(&mut self) {
        for source in &mut self.sources {
            if let Err(e) = source.start(self.bus.sender()) {
                log::warn!("{} unavailable: {e}", source.name());
            }
        }
    }

    fn stop_sources(&mut self) {
        for source in &mut self.sources {
            source.stop();
        }
    }

    /// One frame at monotonic time `now`.
    fn frame(&mut self, now: f64) {
        self.bus.drain_into(&mut self.population, now);
        self.population.tick(now);
        self.population.publish(&mut self.surface);
    }
}

fn default_sources() -> Vec<Box<dyn Source>> {
    #[cfg(feature = "microphone")]
    let audio: Box<dyn Source> = Box::new(crate::input::audio::Microphone::new());
    #[cfg(not(feature = "microphone"))]
    let audio: Box<dyn Source> = Box::new(crate::input::audio::SyntheticAudio::demo());

    vec![audio, Box::new(SyntheticGaze::new(fastrand::u64(..)))]
}

/// Entry point: build the swarm, start collaborators, drive frames.
pub fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(secs) = options.run_for {
        if !(secs > 0.0 && secs.is_finite()) {
            return Err(format!("run time must be positive, got {secs}").into());
        }
    }

    let population = Population::new(options.population_config());
    let mut app = App::new(population, default_sources());
    app.start_sources();

    let start = Instant::now();
    let mut last = start;
    loop {
        let frame_start = Instant::now();
        let dt = frame_start.duration_since(last).as_secs_f64();
        last = frame_start;
        let now = frame_start.duration_since(start).as_secs_f64();

        app.frame_stats.record_frame(dt, &app.population);
        app.frame(now);

        if options.run_for.is_some_and(|limit| now >= limit) {
            break;
        }

        let spent = frame_start.elapsed().as_secs_f64();
        if spent < FRAME_RATE {
            std::thread::sleep(Duration::from_secs_f64(FRAME_RATE - spent));
        }
    }

    app.stop_sources();
    log::info!(
        "Stopped after {} frames, {} poses presented",
        app.frame_stats.frame_count,
        app.surface.presented()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent;

    #[test]
    fn options_from_vars() {
        assert_eq!(RunOptions::from_vars(None, None, None), RunOptions::default());

        let simple = RunOptions::from_vars(Some("simple"), Some("12.5"), Some("800x600"));
        assert_eq!(simple.profile, Profile::Simple);
        assert_eq!(simple.run_for, Some(12.5));
        assert_eq!(simple.screen, Bounds::centered(800.0, 600.0));

        assert_eq!(RunOptions::from_vars(None, Some("0"), None).run_for, None);

        let bad = RunOptions::from_vars(Some("loud"), Some("-3"), Some("wide"));
        assert_eq!(bad, RunOptions::default());
    }

    #[test]
    fn screen_size_parsing() {
        assert_eq!(parse_screen(" 1280 X 720 "), Some(Bounds::centered(1280.0, 720.0)));
        assert_eq!(parse_screen("0x720"), None);
        assert_eq!(parse_screen("1280"), None);
        assert_eq!(parse_screen("axb"), None);
    }

    #[test]
    fn screen_bounds_reach_the_swarm() {
        let options = RunOptions::from_vars(None, None, Some("400x300"));
        let population = Population::with_seed(options.population_config(), 3);
        assert_eq!(population.config().bounds.max, glam::Vec2::new(200.0, 150.0));
    }

    #[test]
    fn run_rejects_bad_duration() {
        let options = RunOptions {
            run_for: Some(f64::NAN),
            ..RunOptions::default()
        };
        assert!(run(options).is_err());
    }

    #[test]
    fn frames_keep_surface_in_sync() {
        let population = Population::with_seed(PopulationConfig::default(), 11);
        let mut app = App::new(population, Vec::new());
        let tx = app.bus.sender();

        let mut t = 0.0;
        app.frame(t);
        assert_eq!(app.surface.on_screen(), 1);

        for _ in 0..3 {
            t += 0.6;
            tx.send(InputEvent::Noise).unwrap();
            app.frame(t);
        }
        assert_eq!(app.surface.on_screen(), 4);

        tx.send(InputEvent::Silence).unwrap();
        app.frame(t);
        // Two removals: one at +2.0s, its close ends 0.5s later, another at +4.0s.
        for _ in 0..(5.0 / FRAME_RATE) as usize {
            t += FRAME_RATE;
            app.frame(t);
        }
        assert_eq!(app.surface.on_screen(), app.population.entity_count());
        assert_eq!(app.population.entity_count(), 2);
    }
}

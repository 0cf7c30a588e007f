use glam::Vec2;

use super::config::{Bounds, Clearance, PopulationConfig};
use crate::util::timer::range_f32;

/// An eye already on screen, as far as placement cares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    pub center: Vec2,
    pub safety_radius: f32,
}

/// Pick a spawn point inside the inset screen area.
///
/// Tries up to `placement_attempts` uniform candidates and takes the first one
/// that clears every occupant. If none does, samples a fresh batch and returns
/// the candidate farthest from its nearest occupant.
pub fn find_spawn_position(
    occupants: &[Occupant],
    config: &PopulationConfig,
    rng: &mut fastrand::Rng,
) -> Vec2 {
    let area = config.bounds.inset(config.spawn_margin);

    for _ in 0..config.placement_attempts {
        let candidate = sample(area, rng);
        if is_clear(candidate, occupants, config.clearance) {
            return candidate;
        }
    }

    let pos = best_available(area, occupants, config.fallback_candidates, rng);
    log::debug!(
        "No clear spot after {} attempts among {} eyes, best available {:?}",
        config.placement_attempts,
        occupants.len(),
        pos
    );
    pos
}

/// True when `candidate` keeps the required distance from every occupant.
pub fn is_clear(candidate: Vec2, occupants: &[Occupant], clearance: Clearance) -> bool {
    occupants
        .iter()
        .all(|o| candidate.distance(o.center) >= clearance.required(o.safety_radius))
}

/// Greedy max-min fallback over `batch` fresh candidates.
pub fn best_available(
    area: Bounds,
    occupants: &[Occupant],
    batch: usize,
    rng: &mut fastrand::Rng,
) -> Vec2 {
    let mut best: Option<(Vec2, f32)> = None;
    for _ in 0..batch.max(1) {
        let candidate = sample(area, rng);
        let nearest = nearest_distance(candidate, occupants);
        if best.map_or(true, |(_, d)| nearest > d) {
            best = Some((candidate, nearest));
        }
    }
    best.map_or((area.min + area.max) * 0.5, |(pos, _)| pos)
}

fn nearest_distance(candidate: Vec2, occupants: &[Occupant]) -> f32 {
    occupants
        .iter()
        .map(|o| candidate.distance(o.center))
        .fold(f32::INFINITY, f32::min)
}

fn sample(area: Bounds, rng: &mut fastrand::Rng) -> Vec2 {
    Vec2::new(
        range_f32(rng, area.min.x, area.max.x),
        range_f32(rng, area.min.y, area.max.y),
    )
}

//! Solo strategy selection (1v1 and free-for-all)

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::{AiView, Plan, Strategy, chance, jitter, ring};
use crate::settings::Difficulty;
use crate::sim::state::random_between;
use crate::{angle_to, polar_to_cartesian};

/// Cluster radius for grouping enemy drones
const GROUP_RADIUS: f32 = 150.0;

/// Pick the next plan for an AI player
pub fn decide(view: &AiView, rng: &mut Pcg32) -> Plan {
    match view.difficulty {
        Difficulty::Easy => decide_easy(view, rng),
        Difficulty::Medium => decide_medium(view, rng),
        Difficulty::Hard => decide_hard(view, rng),
    }
}

fn retreat(view: &AiView, rng: &mut Pcg32) -> Plan {
    Plan::new(Strategy::Retreat, jitter(rng, view.my_base(), 40.0))
}

fn decide_easy(view: &AiView, rng: &mut Pcg32) -> Plan {
    if view.my_health_ratio() < view.profile.retreat_threshold {
        return retreat(view, rng);
    }
    view.patrol(rng)
}

fn decide_medium(view: &AiView, rng: &mut Pcg32) -> Plan {
    if view.my_health_ratio() < view.profile.retreat_threshold {
        return retreat(view, rng);
    }

    if let Some(enemy) = view.primary_enemy() {
        let stronger = view.my_drone_count() as f32 > enemy.alive_drone_count() as f32 * 0.8;
        if chance(rng, 0.3) && stronger {
            let drones: Vec<Vec2> = enemy.alive_drones().map(|d| d.pos).collect();
            let rally = if drones.is_empty() {
                enemy.base.pos
            } else {
                drones[rng.random_range(0..drones.len())]
            };
            return Plan::new(Strategy::Attack, rally);
        }
    }

    if !view.debris.is_empty() && chance(rng, 0.4) {
        let node = &view.debris[rng.random_range(0..view.debris.len())];
        return Plan::new(Strategy::Gather, node.pos);
    }

    let radius = view.profile.attack_range * 0.6;
    Plan::new(Strategy::Patrol, ring(rng, view.my_base(), radius, radius))
}

fn decide_hard(view: &AiView, rng: &mut Pcg32) -> Plan {
    let Some(enemy) = view.primary_enemy() else {
        return view.patrol(rng);
    };
    let my_base = view.my_base();
    let their_base = enemy.base.pos;

    if chance(rng, 0.6)
        && let Some(rally) = enemy.rally
    {
        return Plan::new(Strategy::Predictive, predict_rally(rally, their_base));
    }

    if chance(rng, 0.4) {
        let targets: Vec<Vec2> = view.enemy_drones().map(|d| d.pos).collect();
        if targets.len() > 1 {
            let groups = group_targets(&targets, GROUP_RADIUS);
            if groups.len() > 1 {
                let best = best_group(&groups, my_base);
                return Plan::new(Strategy::MultiTarget, best);
            }
        }
    }

    if chance(rng, 0.5) {
        let side = if chance(rng, 0.5) { FRAC_PI_2 } else { -FRAC_PI_2 };
        let angle = angle_to(my_base, their_base) + side;
        let distance = random_between(rng, 200.0, 300.0);
        return Plan::new(Strategy::Flank, their_base + polar_to_cartesian(distance, angle));
    }

    if view.my_health_ratio() < view.profile.retreat_threshold {
        let toward = (their_base - my_base).normalize_or_zero();
        if chance(rng, 0.3) {
            return Plan::new(Strategy::Counter, their_base - toward * 150.0);
        }
        return Plan::new(Strategy::Retreat, my_base - toward * 200.0);
    }

    if chance(rng, 0.6) {
        const OFFSETS: [f32; 4] = [FRAC_PI_4, -FRAC_PI_4, FRAC_PI_2, -FRAC_PI_2];
        let angle = angle_to(my_base, their_base) + OFFSETS[rng.random_range(0..OFFSETS.len())];
        let distance = random_between(rng, 180.0, 300.0);
        return Plan::new(Strategy::Tactical, their_base + polar_to_cartesian(distance, angle));
    }

    let nearest = view.enemy_drones().min_by(|a, b| {
        a.pos
            .distance_squared(my_base)
            .total_cmp(&b.pos.distance_squared(my_base))
    });
    match nearest {
        Some(drone) => {
            let dir = (drone.pos - my_base).normalize_or_zero();
            Plan::new(Strategy::Hunt, drone.pos - dir * 50.0)
        }
        None => view.patrol(rng),
    }
}

/// Extrapolate the enemy's advance from their base through their rally
pub fn predict_rally(rally: Vec2, their_base: Vec2) -> Vec2 {
    rally + (rally - their_base) * 0.3
}

/// A cluster of nearby enemy drones
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroup {
    pub centroid: Vec2,
    pub size: usize,
}

/// Walk the points in order, dropping each into the first existing group
/// whose centroid lies within `radius`, otherwise opening a new group
pub fn group_targets(points: &[Vec2], radius: f32) -> Vec<TargetGroup> {
    let mut sums: Vec<Vec2> = Vec::new();
    let mut groups: Vec<TargetGroup> = Vec::new();

    for &point in points {
        let home = groups
            .iter()
            .position(|g| point.distance(g.centroid) < radius);
        match home {
            Some(i) => {
                sums[i] += point;
                groups[i].size += 1;
                groups[i].centroid = sums[i] / groups[i].size as f32;
            }
            None => {
                sums.push(point);
                groups.push(TargetGroup {
                    centroid: point,
                    size: 1,
                });
            }
        }
    }
    groups
}

/// Centroid of the group that best trades size against distance
pub fn best_group(groups: &[TargetGroup], from: Vec2) -> Vec2 {
    let mut best = groups.first().map(|g| g.centroid).unwrap_or(from);
    let mut best_score = 0.0;
    for group in groups {
        let score = group.size as f32 * 100.0 - group.centroid.distance(from) * 0.1;
        if score > best_score {
            best_score = score;
            best = group.centroid;
        }
    }
    best
}

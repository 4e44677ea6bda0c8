//! Spatial queries
//!
//! Drone updates mutate one drone at a time while reading everybody else, so
//! the tick keeps an `Occupancy` buffer of drone samples that is rebuilt once
//! per pass and patched as each drone moves. `Field` bundles the read-only
//! views a single drone update needs.

use std::collections::HashMap;

use glam::Vec2;

use super::entities::{Debris, Drone, PlayerId, TargetRef};
use super::state::Player;
use crate::consts::{MAX_RALLY_RADIUS, MIN_RALLY_RADIUS};
use crate::settings::RallyTuning;

/// Radius around a rally point that counts as crowding it
const RALLY_CROWD_RADIUS: f32 = 80.0;
/// Avoidance looks this many collision radii out
const AVOID_RADIUS_FACTOR: f32 = 4.0;

/// Position and liveness of one drone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroneSample {
    pub id: u32,
    pub owner: PlayerId,
    pub team: usize,
    pub pos: Vec2,
    pub health: f32,
    pub reached_rally: bool,
}

impl DroneSample {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Position and liveness of one base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseSample {
    pub owner: PlayerId,
    pub team: usize,
    pub pos: Vec2,
    pub health: f32,
    pub collision_radius: f32,
}

impl BaseSample {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn collect_into(out: &mut Vec<BaseSample>, players: &[Player]) {
        out.clear();
        out.extend(players.iter().map(|p| BaseSample {
            owner: p.id,
            team: p.team,
            pos: p.base.pos,
            health: p.base.health,
            collision_radius: p.base.collision_radius,
        }));
    }
}

/// Reusable buffer of drone samples keyed by drone id
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    samples: Vec<DroneSample>,
    slots: HashMap<u32, usize>,
}

impl Occupancy {
    pub fn rebuild(&mut self, players: &[Player]) {
        self.samples.clear();
        self.slots.clear();
        for player in players {
            for drone in &player.drones {
                self.slots.insert(drone.id, self.samples.len());
                self.samples.push(DroneSample {
                    id: drone.id,
                    owner: player.id,
                    team: player.team,
                    pos: drone.pos,
                    health: drone.health,
                    reached_rally: drone.reached_rally,
                });
            }
        }
    }

    /// Copy a drone's latest position and flags into its sample
    pub fn sync(&mut self, drone: &Drone) {
        if let Some(&slot) = self.slots.get(&drone.id) {
            let sample = &mut self.samples[slot];
            sample.pos = drone.pos;
            sample.health = drone.health;
            sample.reached_rally = drone.reached_rally;
        }
    }

    pub fn get(&self, id: u32) -> Option<&DroneSample> {
        self.slots.get(&id).map(|&slot| &self.samples[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DroneSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Read-only world view for one drone update
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub bounds: Vec2,
    pub drones: &'a Occupancy,
    pub bases: &'a [BaseSample],
    pub debris: &'a [Debris],
}

impl<'a> Field<'a> {
    /// Position of a live target, or None if it is gone or dead
    pub fn resolve(&self, target: TargetRef) -> Option<Vec2> {
        match target {
            TargetRef::Drone(id) => self
                .drones
                .get(id)
                .filter(|d| d.is_alive())
                .map(|d| d.pos),
            TargetRef::Base(owner) => self
                .bases
                .iter()
                .find(|b| b.owner == owner && b.is_alive())
                .map(|b| b.pos),
            TargetRef::Debris(id) => self
                .debris
                .iter()
                .find(|d| d.id == id && d.is_alive())
                .map(|d| d.pos),
        }
    }

    /// Whether a drone of `radius` may stand at `pos`
    pub fn can_move_to(&self, pos: Vec2, mover: u32, radius: f32) -> bool {
        if pos.x < radius
            || pos.x > self.bounds.x - radius
            || pos.y < radius
            || pos.y > self.bounds.y - radius
        {
            return false;
        }

        let drone_gap = (radius * 2.0).powi(2);
        if self
            .drones
            .iter()
            .any(|d| d.id != mover && d.is_alive() && d.pos.distance_squared(pos) < drone_gap)
        {
            return false;
        }

        if self
            .bases
            .iter()
            .any(|b| b.pos.distance_squared(pos) < (radius + b.collision_radius).powi(2))
        {
            return false;
        }

        !self
            .debris
            .iter()
            .any(|d| d.pos.distance_squared(pos) < (radius + d.size).powi(2))
    }

    /// Normalized push away from nearby bases, debris and friendly drones
    pub fn avoidance(&self, pos: Vec2, mover: u32, owner: PlayerId, radius: f32) -> Vec2 {
        let avoid_radius = radius * AVOID_RADIUS_FACTOR;
        let mut push = Vec2::ZERO;

        let mut add = |obstacle: Vec2, obstacle_radius: f32| {
            let offset = pos - obstacle;
            let d = offset.length();
            let reach = avoid_radius + obstacle_radius;
            if d > 0.0 && d < reach {
                let force = (reach - d) / d;
                push += offset / d * force;
            }
        };

        for base in self.bases {
            add(base.pos, base.collision_radius);
        }
        for debris in self.debris {
            add(debris.pos, debris.size);
        }
        for drone in self.drones.iter() {
            if drone.owner == owner && drone.id != mover && drone.is_alive() {
                add(drone.pos, radius);
            }
        }

        push.normalize_or_zero()
    }

    /// Whether friendly drones crowd the first stretch of the path to `to`
    pub fn path_blocked(
        &self,
        from: Vec2,
        to: Vec2,
        mover: u32,
        owner: PlayerId,
        radius: f32,
        tuning: &RallyTuning,
    ) -> bool {
        let distance = from.distance(to);
        if distance <= 0.0 || tuning.sample_step <= 0.0 {
            return false;
        }
        let dir = (to - from) / distance;
        let check = distance.min(tuning.check_distance);
        let proximity = (radius * tuning.proximity_factor).powi(2);

        let mut hits = 0u32;
        let mut step = tuning.sample_step;
        while step < check {
            let sample = from + dir * step;
            hits += self
                .drones
                .iter()
                .filter(|d| {
                    d.owner == owner
                        && d.id != mover
                        && d.is_alive()
                        && d.pos.distance_squared(sample) < proximity
                })
                .count() as u32;
            step += tuning.sample_step;
        }

        hits > tuning.blocked_threshold
    }

    /// Arrival radius for a rally point, widened when many drones crowd it
    pub fn rally_arrival_radius(&self, rally: Vec2, owner: PlayerId, rally_range: f32) -> f32 {
        let mut radius = rally_range.max(MIN_RALLY_RADIUS);

        let own = || self.drones.iter().filter(move |d| d.owner == owner && d.is_alive());
        let nearby = own()
            .filter(|d| d.pos.distance(rally) < RALLY_CROWD_RADIUS)
            .count();
        let arrived = own().filter(|d| d.reached_rally).count();

        if nearby > 8 {
            radius += (nearby - 8) as f32 * 5.0;
        }
        if arrived > 5 {
            radius += (arrived / 5) as f32 * 15.0;
        }
        radius.min(MAX_RALLY_RADIUS)
    }

    /// Nearest live drone of another team within `range`
    pub fn nearest_enemy_drone(&self, pos: Vec2, team: usize, range: f32) -> Option<TargetRef> {
        let mut best = range * range;
        let mut found = None;
        for d in self.drones.iter() {
            if d.team == team || !d.is_alive() {
                continue;
            }
            let dist = d.pos.distance_squared(pos);
            if dist < best {
                best = dist;
                found = Some(TargetRef::Drone(d.id));
            }
        }
        found
    }

    /// Nearest live base of another team within `range`
    pub fn nearest_enemy_base(&self, pos: Vec2, team: usize, range: f32) -> Option<TargetRef> {
        let mut best = range * range;
        let mut found = None;
        for b in self.bases {
            if b.team == team || !b.is_alive() {
                continue;
            }
            let dist = b.pos.distance_squared(pos);
            if dist < best {
                best = dist;
                found = Some(TargetRef::Base(b.owner));
            }
        }
        found
    }
}

/// What a projectile struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Drone { player: PlayerId, index: usize },
    Base { player: PlayerId },
    Debris { index: usize },
}

/// Closest overlapping enemy drone, enemy base or debris node.
///
/// Candidates are scanned drones first, then bases, then debris. A candidate
/// only replaces the current best when its squared distance is strictly
/// smaller, so exact ties keep the first one found.
pub fn closest_hit(
    pos: Vec2,
    size: f32,
    team: usize,
    players: &[Player],
    debris: &[Debris],
) -> Option<Hit> {
    let mut best = f32::INFINITY;
    let mut hit = None;

    for player in players.iter().filter(|p| p.team != team) {
        for (index, drone) in player.drones.iter().enumerate() {
            if !drone.is_alive() {
                continue;
            }
            let d = drone.pos.distance_squared(pos);
            if d < (drone.size + size).powi(2) && d < best {
                best = d;
                hit = Some(Hit::Drone {
                    player: player.id,
                    index,
                });
            }
        }
    }

    for player in players.iter().filter(|p| p.team != team) {
        let base = &player.base;
        if !base.is_alive() {
            continue;
        }
        let d = base.pos.distance_squared(pos);
        if d < (base.collision_radius + size).powi(2) && d < best {
            best = d;
            hit = Some(Hit::Base { player: player.id });
        }
    }

    for (index, node) in debris.iter().enumerate() {
        let d = node.pos.distance_squared(pos);
        if d < (node.size + size).powi(2) && d < best {
            best = d;
            hit = Some(Hit::Debris { index });
        }
    }

    hit
}

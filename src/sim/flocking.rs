//! Boids smoothing for idle drones
//!
//! Only drones that have arrived (or have nowhere to go) and are not fighting
//! take part. Once a drone has barely moved for a while the computation is
//! throttled to every tenth eligible tick.

use glam::Vec2;

use super::collision::Field;
use super::entities::Drone;
use crate::consts::FRAME_MS;

const SEPARATION_RADIUS: f32 = 3.0;
const NEIGHBOR_RADIUS: f32 = 5.0;
const SEPARATION_WEIGHT: f32 = 1.5;
const ALIGNMENT_WEIGHT: f32 = 0.3;
const COHESION_WEIGHT: f32 = 0.2;
const COHESION_DAMPING: f32 = 0.01;
/// Fraction of the new steering blended into velocity each pass
const VELOCITY_BLEND: f32 = 0.3;
/// Flocking speed cap as a fraction of move speed
const MAX_SPEED_FACTOR: f32 = 0.3;
const MIN_COMMIT_SPEED: f32 = 0.5;

const STABLE_DELTA: f32 = 0.5;
const STABLE_AFTER: u32 = 30;
const STABLE_THROTTLE: u32 = 10;

/// What a flocking pass did for one drone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlockStep {
    /// Drone is travelling or fighting
    Ineligible,
    /// Stable and not on a throttle tick
    Throttled,
    Computed,
}

/// Run one flocking pass for `drones[index]` against its squad mates
pub fn flock(
    drones: &mut [Drone],
    index: usize,
    rally: Option<Vec2>,
    dt_ms: f32,
    field: &Field,
) -> FlockStep {
    let me = &drones[index];
    if (rally.is_some() && !me.reached_rally) || me.target.is_some() || me.player_target.is_some()
    {
        return FlockStep::Ineligible;
    }

    let radius = me.collision_radius;
    let pos = me.pos;
    let mut separation = Vec2::ZERO;
    let mut separation_count = 0u32;
    let mut alignment = Vec2::ZERO;
    let mut centroid = Vec2::ZERO;
    let mut neighbor_count = 0u32;

    for (i, other) in drones.iter().enumerate() {
        if i == index || !other.is_alive() {
            continue;
        }
        let offset = pos - other.pos;
        let d = offset.length();
        if d > 0.0 && d < radius * SEPARATION_RADIUS {
            separation += offset / d;
            separation_count += 1;
        }
        if d < radius * NEIGHBOR_RADIUS {
            alignment += other.vel;
            centroid += other.pos;
            neighbor_count += 1;
        }
    }

    let me = &mut drones[index];
    if me.pos.distance(me.last_pos) < STABLE_DELTA {
        me.stable_frames += 1;
    } else {
        me.stable_frames = 0;
    }
    me.is_stable = me.stable_frames > STABLE_AFTER;
    me.last_pos = me.pos;

    if me.is_stable && me.stable_frames % STABLE_THROTTLE != 0 {
        return FlockStep::Throttled;
    }

    if separation_count > 0 {
        separation /= separation_count as f32;
    }
    let mut cohesion = Vec2::ZERO;
    if neighbor_count > 0 {
        alignment /= neighbor_count as f32;
        centroid /= neighbor_count as f32;
        cohesion = (centroid - me.pos) * COHESION_DAMPING;
    }

    let steering = separation * SEPARATION_WEIGHT
        + alignment * ALIGNMENT_WEIGHT
        + cohesion * COHESION_WEIGHT;
    me.vel = me.vel * (1.0 - VELOCITY_BLEND) + steering * VELOCITY_BLEND;

    let speed = me.vel.length();
    let max_speed = me.move_speed * MAX_SPEED_FACTOR;
    if speed > max_speed {
        me.vel = me.vel / speed * max_speed;
    }

    if speed > MIN_COMMIT_SPEED {
        let next = me.pos + me.vel * (dt_ms / FRAME_MS);
        if field.can_move_to(next, me.id, me.collision_radius) {
            me.pos = next;
        } else {
            me.vel *= 0.5;
        }
    } else {
        me.vel = Vec2::ZERO;
    }

    FlockStep::Computed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaledValues;
    use crate::sim::collision::Occupancy;
    use crate::sim::entities::{Base, TargetRef, Upgrades};
    use crate::sim::state::Player;

    fn squad(positions: &[Vec2]) -> Player {
        let scale = ScaledValues::default();
        let stats = Upgrades::default().drone_stats(&scale);
        let mut player = Player::new(0, 0, "", true, Base::new(0, Vec2::new(-500.0, -500.0), &scale, 0.0));
        for (i, &pos) in positions.iter().enumerate() {
            let mut drone = Drone::new(i as u32 + 1, 0, pos, stats, &scale, 0.0);
            drone.reached_rally = true;
            player.drones.push(drone);
        }
        player
    }

    fn run_pass(player: &mut Player, occ: &mut Occupancy, rally: Option<Vec2>) -> Vec<FlockStep> {
        let mut steps = Vec::new();
        for i in 0..player.drones.len() {
            let field = Field {
                bounds: Vec2::new(1000.0, 1000.0),
                drones: &*occ,
                bases: &[],
                debris: &[],
            };
            steps.push(flock(&mut player.drones, i, rally, FRAME_MS, &field));
            occ.sync(&player.drones[i]);
        }
        steps
    }

    #[test]
    fn test_travelling_and_fighting_drones_skip() {
        let mut player = squad(&[Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0)]);
        player.drones[0].reached_rally = false;
        player.drones[1].target = Some(TargetRef::Base(1));
        let mut occ = Occupancy::default();
        occ.rebuild(std::slice::from_ref(&player));
        let steps = run_pass(&mut player, &mut occ, Some(Vec2::new(500.0, 500.0)));
        assert_eq!(steps, vec![FlockStep::Ineligible, FlockStep::Ineligible]);
    }

    #[test]
    fn test_cluster_settles_then_throttles() {
        let positions: Vec<Vec2> = (0..6)
            .map(|i| Vec2::new(300.0 + (i % 3) as f32 * 20.0, 300.0 + (i / 3) as f32 * 20.0))
            .collect();
        let mut player = squad(&positions);
        let mut occ = Occupancy::default();
        occ.rebuild(std::slice::from_ref(&player));

        let mut history = Vec::new();
        for _ in 0..120 {
            let before: Vec<Vec2> = player.drones.iter().map(|d| d.pos).collect();
            let steps = run_pass(&mut player, &mut occ, Some(Vec2::new(320.0, 310.0)));
            let max_delta = player
                .drones
                .iter()
                .zip(&before)
                .map(|(d, b)| d.pos.distance(*b))
                .fold(0.0f32, f32::max);
            history.push((steps[0], player.drones[0].stable_frames, max_delta));
        }

        // Settled: nothing moves by the end
        assert!(history[100..].iter().all(|(_, _, delta)| *delta < 0.5));
        assert!(player.drones.iter().all(|d| d.is_stable));

        // Once stable, work only happens on every tenth eligible pass
        for (step, frames, _) in &history[40..] {
            let expected = if frames % 10 == 0 {
                FlockStep::Computed
            } else {
                FlockStep::Throttled
            };
            assert_eq!(*step, expected);
        }
    }

    #[test]
    fn test_isolated_drone_stays_put() {
        let mut player = squad(&[Vec2::new(500.0, 500.0)]);
        let mut occ = Occupancy::default();
        occ.rebuild(std::slice::from_ref(&player));
        for _ in 0..5 {
            run_pass(&mut player, &mut occ, None);
        }
        assert_eq!(player.drones[0].pos, Vec2::new(500.0, 500.0));
        assert_eq!(player.drones[0].vel, Vec2::ZERO);
    }
}

//! Drone movement
//!
//! A drone picks at most one destination per tick and steps toward it in a
//! straight line. When the direct step is blocked it blends in an avoidance
//! push, and failing that slides along the obstacle at fixed angles.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::Vec2;

use super::collision::Field;
use super::entities::Drone;
use super::targeting::DroneContext;
use crate::consts::*;

/// Slide deviations tried in order, first at full step then reduced
const SLIDE_ANGLES: [f32; 4] = [FRAC_PI_4, -FRAC_PI_4, FRAC_PI_2, -FRAC_PI_2];
const SLIDE_STEP_SCALES: [f32; 2] = [1.0, 0.3];

/// Weights of the straight-line direction and the avoidance push when blocked
const DIRECT_WEIGHT: f32 = 0.3;
const AVOID_WEIGHT: f32 = 0.7;

/// Where a drone wants to go this tick
pub fn destination(drone: &mut Drone, ctx: &DroneContext, field: &Field) -> Option<Vec2> {
    let engage_distance = drone.attack_range - ENGAGE_BUFFER;

    if let Some(rally) = ctx.rally
        && drone.has_recent_command(ctx.now)
        && !drone.reached_rally
    {
        return rally_step(drone, rally, field);
    }

    if let Some(assigned) = drone.player_target
        && let Some(pos) = field.resolve(assigned)
    {
        return (drone.pos.distance(pos) > engage_distance).then_some(pos);
    }

    if let Some(target) = drone.target
        && let Some(pos) = field.resolve(target)
    {
        return (drone.pos.distance(pos) > engage_distance).then_some(pos);
    }

    if let Some(rally) = ctx.rally
        && !drone.reached_rally
    {
        return rally_step(drone, rally, field);
    }

    None
}

/// Arrival check for the rally point; returns the rally if still travelling
fn rally_step(drone: &mut Drone, rally: Vec2, field: &Field) -> Option<Vec2> {
    let arrival = field.rally_arrival_radius(rally, drone.owner, drone.rally_range);
    if drone.pos.distance(rally) <= arrival {
        drone.reached_rally = true;
        drone.vel = Vec2::ZERO;
        None
    } else {
        Some(rally)
    }
}

/// Resolve this tick's destination and move toward it
pub fn advance(drone: &mut Drone, ctx: &DroneContext, field: &Field) {
    if drone.interrupt_pending(ctx.now) && ctx.rally.is_some() {
        drone.target = None;
        drone.should_interrupt_attack = false;
    }

    if let Some(dest) = destination(drone, ctx, field) {
        drone.face_toward(dest);
        move_with_pathfinding(drone, dest, ctx.dt_ms, field);
    }
}

/// Step toward `dest`, steering around whatever is in the way
pub fn move_with_pathfinding(drone: &mut Drone, dest: Vec2, dt_ms: f32, field: &Field) {
    let delta = dest - drone.pos;
    let distance = delta.length();
    if distance < ARRIVAL_EPSILON {
        return;
    }

    let slowdown = if distance < SLOWDOWN_DISTANCE {
        (distance / SLOWDOWN_DISTANCE).max(0.3)
    } else {
        1.0
    };
    let step = drone.move_speed * slowdown * dt_ms / FRAME_MS;
    let dir = delta / distance;
    let radius = drone.collision_radius;

    let direct = drone.pos + dir * step;
    if field.can_move_to(direct, drone.id, radius) {
        drone.pos = direct;
        return;
    }

    let avoid = field.avoidance(drone.pos, drone.id, drone.owner, radius);
    if avoid != Vec2::ZERO {
        let steer = (dir * DIRECT_WEIGHT + avoid * AVOID_WEIGHT).normalize_or_zero() * step;
        let next = drone.pos + steer;
        if steer != Vec2::ZERO && field.can_move_to(next, drone.id, radius) {
            drone.pos = next;
            return;
        }
    }

    for scale in SLIDE_STEP_SCALES {
        for angle in SLIDE_ANGLES {
            let next = drone.pos + Vec2::from_angle(angle).rotate(dir) * step * scale;
            if field.can_move_to(next, drone.id, radius) {
                drone.pos = next;
                return;
            }
        }
    }
}

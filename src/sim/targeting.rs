//! Target acquisition
//!
//! Each tick a drone settles on at most one target, in priority order:
//! a fresh interrupting command, the player-assigned target, the rally-focus
//! gate, then the nearest enemy inside auto-attack range.

use glam::Vec2;

use super::collision::Field;
use super::entities::Drone;
use crate::consts::MIN_RALLY_RADIUS;
use crate::settings::RallyTuning;

/// Per-player inputs shared by every drone update in a tick
#[derive(Debug, Clone, Copy)]
pub struct DroneContext {
    pub now: f64,
    pub dt_ms: f32,
    pub team: usize,
    pub rally: Option<Vec2>,
    pub rally_revision: u32,
    pub tuning: RallyTuning,
}

/// Whether a drone heading for `rally` should ignore enemies on the way
pub fn should_focus_on_rally(drone: &Drone, rally: Vec2, field: &Field, tuning: &RallyTuning) -> bool {
    let rally_range = drone.rally_range.max(MIN_RALLY_RADIUS);
    let distance = drone.pos.distance(rally);
    if distance < rally_range * 2.0 {
        return false;
    }

    let blocked = field.path_blocked(
        drone.pos,
        rally,
        drone.id,
        drone.owner,
        drone.collision_radius,
        tuning,
    );
    // Stuck far from the rally: fight where we are
    !(blocked && distance > rally_range * 3.0)
}

/// Pick this tick's target
pub fn find_target(drone: &mut Drone, ctx: &DroneContext, field: &Field) {
    if drone.interrupt_pending(ctx.now) && ctx.rally.is_some() {
        drone.target = None;
        return;
    }

    if let Some(assigned) = drone.player_target {
        if field.resolve(assigned).is_some() {
            // No weapon lock while translating
            drone.target = if drone.is_moving() { None } else { Some(assigned) };
            return;
        }
        drone.player_target = None;
    }

    if drone.is_moving() {
        drone.target = None;
        return;
    }

    if let Some(rally) = ctx.rally
        && !drone.reached_rally
        && should_focus_on_rally(drone, rally, field, &ctx.tuning)
    {
        drone.target = None;
        return;
    }

    let range_sq = drone.auto_attack_range * drone.auto_attack_range;
    if let Some(current) = drone.target
        && let Some(pos) = field.resolve(current)
        && pos.distance_squared(drone.pos) <= range_sq
    {
        return;
    }

    drone.target = field
        .nearest_enemy_drone(drone.pos, ctx.team, drone.auto_attack_range)
        .or_else(|| field.nearest_enemy_base(drone.pos, ctx.team, drone.auto_attack_range));
}

//! Fixed timestep simulation tick
//!
//! Subsystems run in a fixed order: spawn timers, per-player drone update
//! (targeting, movement, firing, then flocking every third tick and the dead
//! drone sweep), projectiles, hit resolution, the throttled AI pass, the
//! round-end check and the throttled HUD refresh.

use serde::{Deserialize, Serialize};

use super::ai;
use super::collision::{BaseSample, Field};
use super::combat;
use super::entities::{PlayerId, TargetRef, UpgradeAttribute};
use super::flocking;
use super::movement;
use super::snapshot::HudSummary;
use super::state::{GameEvent, GamePhase, GameState, RoundOutcome};
use super::targeting::{self, DroneContext};
use crate::consts::*;

/// A command from the human player or the hosting viewport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    SetRallyPoint { x: f32, y: f32 },
    SetAttackTarget(TargetRef),
    RequestUpgrade(UpgradeAttribute),
    /// Viewport change; only entities created afterwards pick up the new scale
    Resize {
        width: f32,
        height: f32,
        device_pixel_ratio: f32,
    },
}

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Commands for the human player, applied in order
    pub commands: Vec<Command>,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the game state by one step of `dt_ms` milliseconds
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: f32) {
    let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };

    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                log::info!("Paused at tick {}", state.frame);
                return;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                log::info!("Resumed after {:.0} ms paused", state.pause_elapsed_ms);
            }
            _ => {}
        }
    }

    match state.phase {
        GamePhase::Paused => {
            state.pause_elapsed_ms += dt_ms as f64;
            return;
        }
        GamePhase::Welcome | GamePhase::GameOver => return,
        GamePhase::Playing => {}
    }

    state.events.clear();
    state.frame += 1;
    state.clock_ms += dt_ms as f64;

    if let Some(human) = state.human() {
        for command in &input.commands {
            apply_command(state, human, command);
        }
    }

    state.expire_explosions();
    run_spawn_timers(state, dt_ms);

    BaseSample::collect_into(&mut state.base_samples, &state.players);
    for player in 0..state.players.len() {
        update_drones(state, player, dt_ms);
        if state.frame % FLOCKING_EVERY == 0 {
            apply_flocking(state, player, dt_ms);
        }
        sweep_dead_drones(state, player);
    }

    state.projectiles.advance(dt_ms, state.bounds);
    combat::resolve_collisions(state);

    if state.frame - state.last_ai_frame > AI_MIN_GAP {
        ai::run_ai_pass(state);
    }

    check_round_end(state);

    if state.frame - state.last_hud_frame > HUD_MIN_GAP {
        refresh_hud(state);
    }
}

fn apply_command(state: &mut GameState, human: PlayerId, command: &Command) {
    match *command {
        Command::SetRallyPoint { x, y } => state.set_rally_point(human, x, y),
        Command::SetAttackTarget(target) => state.set_attack_target(human, target),
        Command::RequestUpgrade(attribute) => {
            if !state.request_upgrade(human, attribute) {
                log::debug!("Upgrade {} refused", attribute.as_str());
            }
        }
        Command::Resize {
            width,
            height,
            device_pixel_ratio,
        } => {
            if width > 0.0 && height > 0.0 {
                state.resize(width, height, device_pixel_ratio);
                log::info!("Viewport resized to {width}x{height}");
            }
        }
    }
}

fn run_spawn_timers(state: &mut GameState, dt_ms: f32) {
    for i in 0..state.players.len() {
        let player = &mut state.players[i];
        if !player.base.is_alive() {
            continue;
        }
        player.spawn_timer_ms += dt_ms as f64;
        if player.spawn_timer_ms >= SPAWN_INTERVAL_MS {
            player.spawn_timer_ms = 0.0;
            state.spawn_drone(i);
        }
    }
}

/// Targeting, movement and firing for every live drone of one player
fn update_drones(state: &mut GameState, player: PlayerId, dt_ms: f32) {
    state.occupancy.rebuild(&state.players);

    let GameState {
        players,
        debris,
        occupancy,
        base_samples,
        projectiles,
        events,
        settings,
        bounds,
        clock_ms,
        ..
    } = state;

    let owner = &mut players[player];
    let ctx = DroneContext {
        now: *clock_ms,
        dt_ms,
        team: owner.team,
        rally: owner.rally,
        rally_revision: owner.rally_revision,
        tuning: settings.rally,
    };

    for drone in owner.drones.iter_mut() {
        if !drone.is_alive() {
            continue;
        }
        if drone.rally_revision != ctx.rally_revision {
            drone.rally_revision = ctx.rally_revision;
            drone.reached_rally = false;
        }

        let field = Field {
            bounds: *bounds,
            drones: &*occupancy,
            bases: base_samples.as_slice(),
            debris: debris.as_slice(),
        };
        targeting::find_target(drone, &ctx, &field);
        movement::advance(drone, &ctx, &field);
        let shot = combat::attack_update(drone, &ctx, &field);
        drone.update_facing(dt_ms);
        occupancy.sync(drone);

        if let Some(shot) = shot {
            projectiles.acquire(&shot, owner.team, &owner.color);
            events.push(GameEvent::WeaponFired {
                owner: player,
                pos: shot.origin,
            });
        }
    }
}

fn apply_flocking(state: &mut GameState, player: PlayerId, dt_ms: f32) {
    let GameState {
        players,
        debris,
        occupancy,
        base_samples,
        bounds,
        ..
    } = state;
    let owner = &mut players[player];

    for index in 0..owner.drones.len() {
        if !owner.drones[index].is_alive() {
            continue;
        }
        let field = Field {
            bounds: *bounds,
            drones: &*occupancy,
            bases: base_samples.as_slice(),
            debris: debris.as_slice(),
        };
        flocking::flock(&mut owner.drones, index, owner.rally, dt_ms, &field);
        occupancy.sync(&owner.drones[index]);
    }
}

/// Remove dead drones back to front so indices stay valid
fn sweep_dead_drones(state: &mut GameState, player: PlayerId) {
    for index in (0..state.players[player].drones.len()).rev() {
        if state.players[player].drones[index].is_alive() {
            continue;
        }
        let owner = &mut state.players[player];
        let drone = owner.drones.remove(index);
        let color = owner.color.clone();
        state.push_explosion(drone.pos, &color);
        state.events.push(GameEvent::DroneDestroyed {
            id: drone.id,
            owner: player,
            pos: drone.pos,
        });
    }
}

/// End the round once at most one team still has a standing base
fn check_round_end(state: &mut GameState) {
    let mut teams: Vec<usize> = state
        .players
        .iter()
        .filter(|p| p.base.is_alive())
        .map(|p| p.team)
        .collect();
    teams.sort_unstable();
    teams.dedup();

    let outcome = match teams.as_slice() {
        [] => RoundOutcome::Draw,
        [team] => {
            let team = *team;
            if let Some(human) = state
                .players
                .iter_mut()
                .find(|p| p.is_human && p.team == team)
            {
                human.resources += VICTORY_BONUS;
            }
            RoundOutcome::Victory { team }
        }
        _ => return,
    };
    state.finish_round(outcome);
    refresh_hud(state);
}

fn refresh_hud(state: &mut GameState) {
    state.last_hud_frame = state.frame;
    if let Some(human) = state.human() {
        state.hud = HudSummary::capture(&state.players[human]);
    }
}

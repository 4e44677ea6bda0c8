//! Combat resolution
//!
//! Drones fire only while stationary, within firing range and off cooldown.
//! Each live projectile strikes at most one thing per tick: the closest
//! overlapping enemy drone, enemy base or debris node.

use glam::Vec2;

use super::collision::{Field, Hit, closest_hit};
use super::entities::{Debris, Drone, PlayerId, Shot, TargetRef};
use super::state::{GameEvent, GameState, Player};
use super::targeting::DroneContext;
use crate::consts::INTERRUPT_AFTER_SHOT_MS;

/// Distress reaches squad mates within this multiple of auto-attack range
const DISTRESS_RADIUS: f32 = 1.5;
/// Responders look for the attacker within this multiple of auto-attack range
const RESPONSE_RADIUS: f32 = 2.0;

/// Fire at the current target if the drone is able to
pub fn attack_update(drone: &mut Drone, ctx: &DroneContext, field: &Field) -> Option<Shot> {
    let target = drone.target?;
    let Some(target_pos) = field.resolve(target) else {
        drone.target = None;
        return None;
    };

    if drone.is_moving() {
        drone.face_toward(target_pos);
        return None;
    }

    let now = ctx.now;
    let interrupt = drone.interrupt_pending(now);
    if interrupt
        && drone
            .last_attack_ms
            .is_some_and(|t| now - t < INTERRUPT_AFTER_SHOT_MS)
    {
        drone.target = None;
        drone.should_interrupt_attack = false;
        return None;
    }

    if drone.pos.distance(target_pos) > drone.attack_range {
        return None;
    }

    let ready = drone
        .last_attack_ms
        .is_none_or(|t| now - t >= drone.attack_cooldown_ms);
    if !ready {
        return None;
    }

    drone.face_toward(target_pos);
    drone.last_attack_ms = Some(now);
    let shot = Shot {
        origin: drone.pos,
        target: target_pos,
        damage: drone.attack,
        owner: drone.owner,
        speed: drone.projectile_speed,
        size: drone.projectile_size,
    };

    if interrupt {
        drone.target = None;
        drone.should_interrupt_attack = false;
    }
    Some(shot)
}

/// Apply every projectile hit for this tick
pub fn resolve_collisions(state: &mut GameState) {
    let now = state.clock_ms;
    let economic_bonus = state.profile().economic_bonus;

    let mut i = 0;
    while i < state.projectiles.active.len() {
        let p = &state.projectiles.active[i];
        let (pos, size, team, owner, damage) = (p.pos, p.size, p.team, p.owner, p.damage);

        let Some(hit) = closest_hit(pos, size, team, &state.players, &state.debris) else {
            i += 1;
            continue;
        };

        match hit {
            Hit::Drone { player, index } => {
                let victim = &mut state.players[player].drones[index];
                if victim.take_damage(damage, now) {
                    let killed = !victim.is_alive();
                    let victim_pos = victim.pos;
                    if killed && let Some(shooter) = state.players.get_mut(owner) {
                        shooter.add_kill();
                    }
                    broadcast_distress(
                        &mut state.players,
                        &state.debris,
                        player,
                        victim_pos,
                        owner,
                        now,
                    );
                }
            }
            Hit::Base { player } => {
                let base = &mut state.players[player].base;
                if base.take_damage(damage, now) && !base.is_alive() {
                    log::info!("Base of player {player} destroyed by player {owner}");
                    state.events.push(GameEvent::BaseDestroyed { owner: player });
                }
            }
            Hit::Debris { index } => {
                if state.debris[index].take_damage(damage) {
                    let node = state.debris.remove(index);
                    let reward = state
                        .players
                        .get_mut(owner)
                        .map(|shooter| {
                            let reward = match economic_bonus {
                                Some(bonus) if !shooter.is_human => {
                                    (node.points as f32 * bonus).floor() as u32
                                }
                                _ => node.points,
                            };
                            shooter.resources += reward;
                            reward
                        })
                        .unwrap_or(0);
                    state.events.push(GameEvent::DebrisDestroyed {
                        id: node.id,
                        by: owner,
                        reward,
                    });
                }
            }
        }

        state.projectiles.release(i);
    }
}

/// Rally squad mates around a damaged drone and flag an AI owner as under attack
pub fn broadcast_distress(
    players: &mut [Player],
    debris: &[Debris],
    victim: PlayerId,
    at: Vec2,
    attacker: PlayerId,
    now: f64,
) {
    if victim == attacker || victim >= players.len() || attacker >= players.len() {
        return;
    }

    let responses: Vec<(usize, TargetRef)> = {
        let view: &[Player] = players;
        let enemy = &view[attacker];
        view[victim]
            .drones
            .iter()
            .enumerate()
            .filter(|(_, drone)| {
                drone.is_alive()
                    && drone.player_target.is_none()
                    && drone.pos.distance(at) <= drone.auto_attack_range * DISTRESS_RADIUS
                    && !drone
                        .target
                        .is_some_and(|t| target_is_live(view, debris, t))
            })
            .filter_map(|(index, drone)| {
                let reach = drone.auto_attack_range * RESPONSE_RADIUS;
                let nearest = enemy
                    .alive_drones()
                    .map(|d| (d.id, d.pos.distance(drone.pos)))
                    .filter(|&(_, dist)| dist <= reach)
                    .min_by(|a, b| a.1.total_cmp(&b.1));

                if let Some((id, _)) = nearest {
                    Some((index, TargetRef::Drone(id)))
                } else if enemy.base.is_alive() && enemy.base.pos.distance(drone.pos) <= reach {
                    Some((index, TargetRef::Base(enemy.id)))
                } else {
                    None
                }
            })
            .collect()
    };

    let defenders = &mut players[victim];
    for (index, target) in responses {
        defenders.drones[index].target = Some(target);
    }

    if !defenders.is_human {
        let awareness = &mut defenders.awareness;
        awareness.under_attack = true;
        awareness.last_attack_ms = now;
        awareness.attacker = Some(attacker);
    }
}

/// Whether a target still exists with health left
pub fn target_is_live(players: &[Player], debris: &[Debris], target: TargetRef) -> bool {
    match target {
        TargetRef::Drone(id) => players
            .iter()
            .any(|p| p.drones.iter().any(|d| d.id == id && d.is_alive())),
        TargetRef::Base(owner) => players.get(owner).is_some_and(|p| p.base.is_alive()),
        TargetRef::Debris(id) => debris.iter().any(|d| d.id == id && d.is_alive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_MS;
    use crate::settings::{Difficulty, RallyTuning, Settings};
    use crate::sim::collision::{BaseSample, Occupancy};
    use crate::sim::entities::Upgrades;

    fn arena(difficulty: Difficulty) -> GameState {
        let mut state = GameState::new(Settings {
            difficulty,
            ..Default::default()
        });
        state.start_round();
        for p in &mut state.players {
            p.drones.clear();
        }
        state.debris.clear();
        state.clock_ms = 10_000.0;
        state
    }

    fn place(state: &mut GameState, owner: PlayerId, pos: Vec2) -> u32 {
        let id = state.next_entity_id();
        let stats = Upgrades::default().drone_stats(&state.values);
        let drone = Drone::new(id, owner, pos, stats, &state.values, 0.0);
        state.players[owner].drones.push(drone);
        id
    }

    fn fire(state: &mut GameState, owner: PlayerId, at: Vec2, damage: f32) {
        let shot = Shot {
            origin: at,
            target: at + Vec2::X,
            damage,
            owner,
            speed: 1.0,
            size: 3.0,
        };
        let team = state.players[owner].team;
        state.projectiles.acquire(&shot, team, "#00ff00");
    }

    fn ctx(now: f64) -> DroneContext {
        DroneContext {
            now,
            dt_ms: FRAME_MS,
            team: 0,
            rally: None,
            rally_revision: 0,
            tuning: RallyTuning::default(),
        }
    }

    #[test]
    fn test_every_fifth_kill_pays_a_resource() {
        let mut state = arena(Difficulty::Medium);
        for i in 0..10 {
            let pos = Vec2::new(300.0 + i as f32 * 40.0, 400.0);
            place(&mut state, 1, pos);
            fire(&mut state, 0, pos, 5.0);
            resolve_collisions(&mut state);
            if i == 3 {
                assert_eq!(state.players[0].resources, 0);
            }
        }
        assert!(state.projectiles.is_empty());
        assert_eq!(state.players[0].kills, 10);
        assert_eq!(state.players[0].resources, 2);
    }

    #[test]
    fn test_projectiles_pass_through_friendlies() {
        let mut state = arena(Difficulty::Medium);
        let pos = Vec2::new(500.0, 400.0);
        place(&mut state, 0, pos);
        fire(&mut state, 0, pos, 5.0);
        resolve_collisions(&mut state);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.players[0].drones[0].health, 1.0);
    }

    #[test]
    fn test_dead_drones_are_not_hit_twice() {
        let mut state = arena(Difficulty::Medium);
        let pos = Vec2::new(500.0, 400.0);
        place(&mut state, 1, pos);
        fire(&mut state, 0, pos, 5.0);
        fire(&mut state, 0, pos, 5.0);
        resolve_collisions(&mut state);
        assert_eq!(state.players[0].kills, 1);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_hard_ai_gets_debris_bonus() {
        let mut state = arena(Difficulty::Hard);
        for (owner, x) in [(0usize, 400.0f32), (1, 700.0)] {
            let id = state.next_entity_id();
            state.debris.push(Debris {
                id,
                pos: Vec2::new(x, 400.0),
                size: 20.0,
                points: 7,
                health: 1.0,
                max_health: 1.0,
            });
            fire(&mut state, owner, Vec2::new(x, 400.0), 1.0);
        }
        resolve_collisions(&mut state);
        assert!(state.debris.is_empty());
        assert_eq!(state.players[0].resources, 7);
        assert_eq!(state.players[1].resources, 8);
    }

    #[test]
    fn test_distress_summons_defenders_and_flags_ai() {
        let mut state = arena(Difficulty::Medium);
        let attacker = place(&mut state, 0, Vec2::new(600.0, 300.0));
        place(&mut state, 1, Vec2::new(600.0, 450.0));
        place(&mut state, 1, Vec2::new(650.0, 450.0));
        state.players[1].drones[0].max_health = 5.0;
        state.players[1].drones[0].health = 5.0;

        fire(&mut state, 0, Vec2::new(600.0, 450.0), 1.0);
        resolve_collisions(&mut state);

        let defenders = &state.players[1];
        assert_eq!(defenders.drones[0].health, 4.0);
        assert!(defenders
            .drones
            .iter()
            .all(|d| d.target == Some(TargetRef::Drone(attacker))));
        assert!(defenders.awareness.under_attack);
        assert_eq!(defenders.awareness.attacker, Some(0));
        assert_eq!(defenders.awareness.last_attack_ms, 10_000.0);
    }

    #[test]
    fn test_attack_update_cooldown_and_range() {
        let mut state = arena(Difficulty::Medium);
        place(&mut state, 0, Vec2::new(400.0, 400.0));
        let near = place(&mut state, 1, Vec2::new(500.0, 400.0));
        let far = place(&mut state, 1, Vec2::new(700.0, 400.0));

        let mut occ = Occupancy::default();
        occ.rebuild(&state.players);
        let mut bases = Vec::new();
        BaseSample::collect_into(&mut bases, &state.players);
        let field = Field {
            bounds: state.bounds,
            drones: &occ,
            bases: &bases,
            debris: &[],
        };

        let mut me = state.players[0].drones[0].clone();
        me.target = Some(TargetRef::Drone(far));
        assert_eq!(attack_update(&mut me, &ctx(1000.0), &field), None);

        me.target = Some(TargetRef::Drone(near));
        let shot = attack_update(&mut me, &ctx(1000.0), &field).expect("in range");
        assert_eq!(shot.target, Vec2::new(500.0, 400.0));
        assert_eq!(me.last_attack_ms, Some(1000.0));

        // Cooldown of 500 ms at base upgrades
        assert_eq!(attack_update(&mut me, &ctx(1499.0), &field), None);
        assert!(attack_update(&mut me, &ctx(1500.0), &field).is_some());

        // Moving drones only turn toward the target
        me.vel = Vec2::new(0.4, 0.0);
        assert_eq!(attack_update(&mut me, &ctx(5000.0), &field), None);
    }

    #[test]
    fn test_never_fires_at_dead_target() {
        let mut state = arena(Difficulty::Medium);
        place(&mut state, 0, Vec2::new(400.0, 400.0));
        let victim = place(&mut state, 1, Vec2::new(450.0, 400.0));
        state.players[1].drones[0].health = 0.0;

        let mut occ = Occupancy::default();
        occ.rebuild(&state.players);
        let field = Field {
            bounds: state.bounds,
            drones: &occ,
            bases: &[],
            debris: &[],
        };
        let mut me = state.players[0].drones[0].clone();
        me.target = Some(TargetRef::Drone(victim));
        assert_eq!(attack_update(&mut me, &ctx(1000.0), &field), None);
        assert_eq!(me.target, None);
    }

    #[test]
    fn test_interrupt_right_after_shot_drops_target() {
        let mut state = arena(Difficulty::Medium);
        place(&mut state, 0, Vec2::new(400.0, 400.0));
        let enemy = place(&mut state, 1, Vec2::new(450.0, 400.0));
        let mut occ = Occupancy::default();
        occ.rebuild(&state.players);
        let field = Field {
            bounds: state.bounds,
            drones: &occ,
            bases: &[],
            debris: &[],
        };
        let mut me = state.players[0].drones[0].clone();
        me.target = Some(TargetRef::Drone(enemy));
        me.last_attack_ms = Some(980.0);
        me.should_interrupt_attack = true;
        me.last_command_ms = Some(990.0);
        assert_eq!(attack_update(&mut me, &ctx(1000.0), &field), None);
        assert_eq!(me.target, None);
        assert!(!me.should_interrupt_attack);
    }
}

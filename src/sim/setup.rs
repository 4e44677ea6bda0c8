//! Round setup: base layout, drone spawn placement and debris scattering

use glam::Vec2;
use rand::Rng;

use super::entities::{Debris, PlayerId};
use super::state::{GameState, random_between};
use crate::polar_to_cartesian;
use crate::settings::GameMode;

/// Bases sit this far inside the playfield
const BASE_MARGIN: f32 = 100.0;
const SPAWN_ATTEMPTS: u32 = 50;
const DEBRIS_MARGIN: f32 = 80.0;
const DEBRIS_BASE_CLEARANCE: f32 = 200.0;
const DEBRIS_ATTEMPTS: u32 = 50;

/// Base position for every player slot
pub fn base_positions(mode: GameMode, bounds: Vec2) -> Vec<Vec2> {
    let (w, h) = (bounds.x, bounds.y);
    let m = BASE_MARGIN;
    match mode {
        GameMode::OneVsOne => vec![Vec2::new(m, m), Vec2::new(w - m, h - m)],
        GameMode::TwoVsTwo => (0..4)
            .map(|i| {
                let x = if i < 2 { m } else { w - m };
                let y = if i % 2 == 0 { m } else { h - m };
                Vec2::new(x, y)
            })
            .collect(),
        GameMode::FreeForAll => {
            let center = bounds / 2.0;
            let radius = w.min(h) / 2.0 - m;
            [0.0f32, 2.094, 4.189]
                .iter()
                .map(|&angle| center + polar_to_cartesian(radius, angle))
                .collect()
        }
    }
}

/// Free spot on a spiral around the player's base for its next drone
pub fn spawn_position(state: &mut GameState, player: PlayerId) -> Vec2 {
    let base = &state.players[player].base;
    let base_pos = base.pos;
    let base_radius = base.collision_radius;
    let drone_radius = state.values.drone_collision_radius;
    let existing = state.players[player].drones.len() as u32;

    for attempt in 0..SPAWN_ATTEMPTS {
        let angle = (existing as f32 + attempt as f32 * 0.1) * 0.5;
        let ring = ((existing + attempt) / 8) as f32;
        let radius = (base_radius + drone_radius + 5.0).max(30.0 + ring * 15.0);
        let pos = base_pos + polar_to_cartesian(radius, angle);
        if spawn_spot_is_free(state, pos, drone_radius) {
            return pos;
        }
    }

    let angle = state.rng.random::<f32>() * std::f32::consts::TAU;
    base_pos + polar_to_cartesian(base_radius + drone_radius + 10.0, angle)
}

fn spawn_spot_is_free(state: &GameState, pos: Vec2, radius: f32) -> bool {
    let b = state.bounds;
    if pos.x < radius || pos.x > b.x - radius || pos.y < radius || pos.y > b.y - radius {
        return false;
    }
    state.players.iter().all(|p| {
        pos.distance(p.base.pos) >= radius + p.base.collision_radius
            && p.drones.iter().all(|d| pos.distance(d.pos) >= radius * 2.0)
    })
}

/// Resource nodes placed away from every base
pub fn scatter_debris(state: &mut GameState, count: usize) -> Vec<Debris> {
    let (w, h) = (state.bounds.x, state.bounds.y);
    let min_size = state.values.debris_min_size * 2.0;
    let max_size = state.values.debris_max_size * 2.0;
    let bases: Vec<Vec2> = state.players.iter().map(|p| p.base.pos).collect();

    let mut debris = Vec::with_capacity(count);
    for _ in 0..count {
        let mut placed = None;
        for _ in 0..DEBRIS_ATTEMPTS {
            let pos = Vec2::new(
                random_between(&mut state.rng, DEBRIS_MARGIN, w - DEBRIS_MARGIN),
                random_between(&mut state.rng, DEBRIS_MARGIN, h - DEBRIS_MARGIN),
            );
            if bases
                .iter()
                .all(|b| b.distance(pos) >= DEBRIS_BASE_CLEARANCE)
            {
                placed = Some(pos);
                break;
            }
        }
        let pos = placed.unwrap_or_else(|| {
            Vec2::new(
                w / 2.0 + random_between(&mut state.rng, -w / 4.0, w / 4.0),
                h / 2.0 + random_between(&mut state.rng, -h / 4.0, h / 4.0),
            )
        });

        let size = random_between(&mut state.rng, min_size, max_size);
        let points = 5 + state.rng.random_range(0..=10u32);
        let health = 50.0 + state.rng.random_range(0..=100u32) as f32;
        let id = state.next_entity_id();
        debris.push(Debris {
            id,
            pos,
            size,
            points,
            health,
            max_health: health,
        });
    }
    debris
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn test_two_vs_two_corners() {
        let bases = base_positions(GameMode::TwoVsTwo, Vec2::new(1200.0, 800.0));
        assert_eq!(
            bases,
            vec![
                Vec2::new(100.0, 100.0),
                Vec2::new(100.0, 700.0),
                Vec2::new(1100.0, 100.0),
                Vec2::new(1100.0, 700.0),
            ]
        );
    }

    #[test]
    fn test_ffa_triangle() {
        let bases = base_positions(GameMode::FreeForAll, Vec2::new(1200.0, 800.0));
        let center = Vec2::new(600.0, 400.0);
        for b in bases {
            assert!((b.distance(center) - 300.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_spawned_drones_do_not_overlap() {
        let mut state = GameState::new(Settings::default());
        state.start_round();
        let r = state.values.drone_collision_radius;
        for p in &state.players {
            for a in &p.drones {
                assert!(a.pos.distance(p.base.pos) >= r + p.base.collision_radius);
            }
            // The first lap of the spiral never needs the fallback ring
            let first_lap = &p.drones[..12];
            for (i, a) in first_lap.iter().enumerate() {
                for b in &first_lap[i + 1..] {
                    assert!(a.pos.distance(b.pos) >= 2.0 * r - 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_debris_keeps_clear_of_bases() {
        let mut state = GameState::new(Settings::default());
        state.start_round();
        for d in &state.debris {
            assert!((5..=15).contains(&d.points));
            assert!(d.health >= 50.0 && d.health <= 150.0);
            assert!(d.size >= 20.0 && d.size <= 40.0);
            for p in &state.players {
                // Fallback placement may land closer; the default field has room
                assert!(d.pos.distance(p.base.pos) >= DEBRIS_BASE_CLEARANCE);
            }
        }
    }
}

//! Read-only views of the battlefield for renderers and relays

use glam::Vec2;
use serde::Serialize;

use super::entities::{Drone, PlayerId, TargetRef, UpgradeAttribute, Upgrades};
use super::state::{GamePhase, GameState, Player, RoundOutcome};

/// Human player's status line
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HudSummary {
    pub resources: u32,
    pub kills: u32,
    pub drones: usize,
    pub base_health: f32,
    pub base_max_health: f32,
    pub upgrades: Upgrades,
    /// Price of the next level per attribute; None once maxed
    pub next_costs: Vec<(UpgradeAttribute, Option<u32>)>,
    /// Whether upgrades can still be bought (base standing)
    pub can_upgrade: bool,
}

impl HudSummary {
    pub fn capture(player: &Player) -> Self {
        Self {
            resources: player.resources,
            kills: player.kills,
            drones: player.alive_drone_count(),
            base_health: player.base.health,
            base_max_health: player.base.max_health,
            upgrades: player.upgrades,
            next_costs: UpgradeAttribute::ALL
                .iter()
                .map(|&attr| (attr, player.upgrades.next_cost(attr)))
                .collect(),
            can_upgrade: player.base.is_alive(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneView {
    pub id: u32,
    pub pos: Vec2,
    pub facing: f32,
    pub health: f32,
    pub max_health: f32,
    pub size: f32,
    pub target: Option<TargetRef>,
    pub invulnerable: bool,
}

impl DroneView {
    fn new(drone: &Drone, now: f64) -> Self {
        Self {
            id: drone.id,
            pos: drone.pos,
            facing: drone.facing,
            health: drone.health,
            max_health: drone.max_health,
            size: drone.size,
            target: drone.player_target.or(drone.target),
            invulnerable: drone.is_invulnerable(now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub team: usize,
    pub color: String,
    pub is_human: bool,
    pub resources: u32,
    pub kills: u32,
    pub rally: Option<Vec2>,
    pub base_pos: Vec2,
    pub base_health: f32,
    pub base_max_health: f32,
    pub base_size: f32,
    pub base_invulnerable: bool,
    pub drones: Vec<DroneView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileView {
    pub pos: Vec2,
    pub size: f32,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebrisView {
    pub id: u32,
    pub pos: Vec2,
    pub size: f32,
    pub health: f32,
    pub max_health: f32,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplosionView {
    pub pos: Vec2,
    pub color: String,
    /// 0 at creation, 1 when the marker expires
    pub progress: f32,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: GamePhase,
    pub outcome: Option<RoundOutcome>,
    pub frame: u64,
    pub clock_ms: f64,
    pub pause_elapsed_ms: f64,
    pub bounds: Vec2,
    pub players: Vec<PlayerView>,
    pub projectiles: Vec<ProjectileView>,
    pub debris: Vec<DebrisView>,
    pub explosions: Vec<ExplosionView>,
    pub hud: HudSummary,
}

impl Snapshot {
    pub fn capture(state: &GameState) -> Self {
        let now = state.clock_ms;
        let players = state
            .players
            .iter()
            .map(|p| PlayerView {
                id: p.id,
                team: p.team,
                color: p.color.clone(),
                is_human: p.is_human,
                resources: p.resources,
                kills: p.kills,
                rally: p.rally,
                base_pos: p.base.pos,
                base_health: p.base.health,
                base_max_health: p.base.max_health,
                base_size: p.base.size,
                base_invulnerable: p.base.is_invulnerable(now),
                drones: p.alive_drones().map(|d| DroneView::new(d, now)).collect(),
            })
            .collect();

        let projectiles = state
            .projectiles
            .active
            .iter()
            .map(|p| ProjectileView {
                pos: p.pos,
                size: p.size,
                color: p.color.clone(),
            })
            .collect();

        let debris = state
            .debris
            .iter()
            .map(|d| DebrisView {
                id: d.id,
                pos: d.pos,
                size: d.size,
                health: d.health,
                max_health: d.max_health,
                points: d.points,
            })
            .collect();

        let explosions = state
            .explosions
            .iter()
            .map(|e| ExplosionView {
                pos: e.pos,
                color: e.color.clone(),
                progress: ((now - e.started_ms) / crate::consts::EXPLOSION_DURATION_MS)
                    .clamp(0.0, 1.0) as f32,
            })
            .collect();

        Self {
            phase: state.phase,
            outcome: state.outcome,
            frame: state.frame,
            clock_ms: now,
            pause_elapsed_ms: state.pause_elapsed_ms,
            bounds: state.bounds,
            players,
            projectiles,
            debris,
            explosions,
            hud: state.hud.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{GameMode, Settings};

    fn running() -> GameState {
        let mut state = GameState::new(Settings {
            mode: GameMode::OneVsOne,
            ..Default::default()
        });
        state.start_round();
        state
    }

    #[test]
    fn test_hud_lists_every_attribute() {
        let state = running();
        let hud = HudSummary::capture(&state.players[0]);
        assert_eq!(hud.drones, 20);
        assert_eq!(hud.next_costs.len(), UpgradeAttribute::ALL.len());
        assert!(hud.next_costs.contains(&(UpgradeAttribute::BaseHealth, Some(10))));
        assert!(hud.can_upgrade);
    }

    #[test]
    fn test_snapshot_covers_all_entities() {
        let state = running();
        let snap = Snapshot::capture(&state);
        assert_eq!(snap.phase, GamePhase::Playing);
        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.players[1].drones.len(), 20);
        assert_eq!(snap.debris.len(), state.debris.len());
        assert!(snap.players[0].base_invulnerable);
    }

    #[test]
    fn test_snapshot_json() {
        let state = running();
        let json = Snapshot::capture(&state).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["phase"], "playing");
        assert_eq!(value["players"][0]["isHuman"], true);
        assert!(value["players"][0]["drones"][0]["facing"].is_number());
    }
}

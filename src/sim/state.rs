//! Game state and core simulation types
//!
//! The whole battlefield lives in `GameState`; subsystems receive it (or the
//! parts of it they need) explicitly. Iteration order is player slot order,
//! then drone creation order, so identical seeds and inputs replay identically.

use std::collections::VecDeque;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{BaseSample, Occupancy};
use super::entities::{
    Base, Debris, Drone, PlayerId, TargetRef, UpgradeAttribute, Upgrades,
};
use super::pool::ProjectilePool;
use super::setup;
use super::snapshot::HudSummary;
use crate::consts::*;
use crate::scale::{Scale, ScaledValues};
use crate::settings::{DifficultyProfile, Settings};

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    /// Menu; no round loaded
    Welcome,
    /// Active gameplay
    Playing,
    /// Round frozen, still rendered
    Paused,
    /// Round ended
    GameOver,
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundOutcome {
    Victory { team: usize },
    Draw,
}

/// Fire-and-forget notifications for audio/UX collaborators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    WeaponFired { owner: PlayerId, pos: Vec2 },
    DroneDestroyed { id: u32, owner: PlayerId, pos: Vec2 },
    BaseDestroyed { owner: PlayerId },
    DebrisDestroyed { id: u32, by: PlayerId, reward: u32 },
    RoundOver(RoundOutcome),
}

/// Visual-only explosion marker
#[derive(Debug, Clone, Serialize)]
pub struct Explosion {
    pub pos: Vec2,
    pub color: String,
    pub started_ms: f64,
}

/// Battlefield awareness kept by AI players
#[derive(Debug, Clone, Default)]
pub struct Awareness {
    pub under_attack: bool,
    pub last_attack_ms: f64,
    pub attacker: Option<PlayerId>,
    /// Recent enemy rally points, oldest first
    pub rally_history: VecDeque<(Vec2, f64)>,
}

impl Awareness {
    pub fn clear_alert(&mut self) {
        self.under_attack = false;
        self.attacker = None;
    }
}

/// A participant: human or AI
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub team: usize,
    pub color: String,
    pub is_human: bool,
    pub base: Base,
    pub drones: Vec<Drone>,
    pub resources: u32,
    pub kills: u32,
    pub upgrades: Upgrades,
    /// Shared destination read by every owned drone each tick
    pub rally: Option<Vec2>,
    /// Bumped whenever `rally` changes
    pub rally_revision: u32,
    pub spawn_timer_ms: f64,
    pub awareness: Awareness,
}

impl Player {
    pub fn new(id: PlayerId, team: usize, color: &str, is_human: bool, base: Base) -> Self {
        Self {
            id,
            team,
            color: color.to_string(),
            is_human,
            base,
            drones: Vec::new(),
            resources: 0,
            kills: 0,
            upgrades: Upgrades::default(),
            rally: None,
            rally_revision: 0,
            spawn_timer_ms: 0.0,
            awareness: Awareness::default(),
        }
    }

    pub fn alive_drones(&self) -> impl Iterator<Item = &Drone> {
        self.drones.iter().filter(|d| d.is_alive())
    }

    pub fn alive_drone_count(&self) -> usize {
        self.alive_drones().count()
    }

    pub fn set_rally(&mut self, rally: Vec2) {
        self.rally = Some(rally);
        self.rally_revision = self.rally_revision.wrapping_add(1);
    }

    /// Record a confirmed kill; every fifth one pays a resource
    pub fn add_kill(&mut self) {
        self.kills += 1;
        if self.kills % KILLS_PER_RESOURCE == 0 {
            self.resources += 1;
        }
    }

    /// Buy one level of `attribute` if affordable
    pub fn try_upgrade(&mut self, attribute: UpgradeAttribute) -> bool {
        if !self.base.is_alive() {
            return false;
        }
        let Some(cost) = self.upgrades.next_cost(attribute) else {
            return false;
        };
        if self.resources < cost {
            return false;
        }

        self.resources -= cost;
        let level = self.upgrades.level_mut(attribute);
        *level += 1;
        let level = *level;

        if attribute == UpgradeAttribute::BaseHealth {
            let bonus = if level <= 4 { 100.0 } else { 50.0 };
            self.base.max_health += bonus;
            self.base.health += bonus;
        }
        true
    }
}

/// Uniform sample in [lo, hi), or `lo` if the range is empty
pub fn random_between(rng: &mut Pcg32, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    pub settings: Settings,
    pub scale: Scale,
    pub values: ScaledValues,
    /// Playfield size (width, height)
    pub bounds: Vec2,
    pub phase: GamePhase,
    pub outcome: Option<RoundOutcome>,
    /// Simulated milliseconds since the round started
    pub clock_ms: f64,
    /// Ticks simulated this round
    pub frame: u64,
    pub players: Vec<Player>,
    pub debris: Vec<Debris>,
    pub projectiles: ProjectilePool,
    pub explosions: VecDeque<Explosion>,
    /// Events raised during the last tick
    pub events: Vec<GameEvent>,
    pub hud: HudSummary,
    pub pause_elapsed_ms: f64,
    pub last_ai_frame: u64,
    pub last_hud_frame: u64,
    pub rng: Pcg32,
    // Per-tick scratch buffers
    pub(crate) occupancy: Occupancy,
    pub(crate) base_samples: Vec<BaseSample>,
    next_id: u32,
}

impl GameState {
    /// Create a game sitting at the welcome screen
    pub fn new(settings: Settings) -> Self {
        let viewport = settings.viewport;
        let scale = Scale::new(viewport.width, viewport.height, viewport.device_pixel_ratio);
        let seed = settings.seed;
        Self {
            settings,
            scale,
            values: scale.values(),
            bounds: Vec2::new(viewport.width, viewport.height),
            phase: GamePhase::Welcome,
            outcome: None,
            clock_ms: 0.0,
            frame: 0,
            players: Vec::new(),
            debris: Vec::new(),
            projectiles: ProjectilePool::new(PROJECTILE_POOL_SIZE),
            explosions: VecDeque::with_capacity(MAX_EXPLOSIONS),
            events: Vec::new(),
            hud: HudSummary::default(),
            pause_elapsed_ms: 0.0,
            last_ai_frame: 0,
            last_hud_frame: 0,
            rng: Pcg32::seed_from_u64(seed),
            occupancy: Occupancy::default(),
            base_samples: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.settings.difficulty.profile()
    }

    /// Slot of the human player, if any
    pub fn human(&self) -> Option<PlayerId> {
        self.players.iter().position(|p| p.is_human)
    }

    /// Apply a viewport change; entities already spawned keep their values
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) {
        self.scale = Scale::new(width, height, device_pixel_ratio);
        self.values = self.scale.values();
        self.bounds = Vec2::new(width, height);
        self.settings.viewport.width = width;
        self.settings.viewport.height = height;
        self.settings.viewport.device_pixel_ratio = device_pixel_ratio;
    }

    /// Set up a fresh round and enter `Playing`
    pub fn start_round(&mut self) {
        self.clear_round();
        self.rng = Pcg32::seed_from_u64(self.settings.seed);

        let mode = self.settings.mode;
        let colors = self.settings.player_colors();
        for (i, pos) in setup::base_positions(mode, self.bounds).into_iter().enumerate() {
            let base = Base::new(i, pos, &self.values, self.clock_ms);
            self.players
                .push(Player::new(i, mode.team_of(i), &colors[i], i == 0, base));
        }

        for i in 0..self.players.len() {
            for _ in 0..INITIAL_DRONES {
                self.spawn_drone(i);
            }
        }

        self.debris = setup::scatter_debris(self, mode.debris_count());
        self.phase = GamePhase::Playing;
        log::info!(
            "Round started: mode={} difficulty={} players={} debris={}",
            mode.as_str(),
            self.settings.difficulty.as_str(),
            self.players.len(),
            self.debris.len()
        );
    }

    /// Drop the round and go back to the menu
    pub fn return_to_welcome(&mut self) {
        self.clear_round();
        self.phase = GamePhase::Welcome;
    }

    /// End a running round as a loss for the human team
    pub fn surrender(&mut self) {
        if !matches!(self.phase, GamePhase::Playing | GamePhase::Paused) {
            return;
        }
        let Some(human) = self.human() else {
            return;
        };
        let human_team = self.players[human].team;
        let winner = self
            .players
            .iter()
            .filter(|p| p.team != human_team)
            .find(|p| p.base.is_alive())
            .or_else(|| self.players.iter().find(|p| p.team != human_team))
            .map(|p| p.team);

        let outcome = match winner {
            Some(team) => RoundOutcome::Victory { team },
            None => RoundOutcome::Draw,
        };
        log::info!("Player surrendered");
        self.finish_round(outcome);
    }

    pub(crate) fn finish_round(&mut self, outcome: RoundOutcome) {
        self.outcome = Some(outcome);
        self.phase = GamePhase::GameOver;
        self.events.push(GameEvent::RoundOver(outcome));
        log::info!("Round over after {} ticks: {:?}", self.frame, outcome);
    }

    fn clear_round(&mut self) {
        self.players.clear();
        self.debris.clear();
        self.projectiles.clear();
        self.explosions.clear();
        self.events.clear();
        self.outcome = None;
        self.clock_ms = 0.0;
        self.frame = 0;
        self.pause_elapsed_ms = 0.0;
        self.last_ai_frame = 0;
        self.last_hud_frame = 0;
        self.hud = HudSummary::default();
        self.next_id = 1;
    }

    /// Add a drone next to a player's base using its current upgrades
    pub fn spawn_drone(&mut self, player: PlayerId) {
        let Some(owner) = self.players.get(player) else {
            return;
        };
        if owner.drones.len() >= MAX_DRONES {
            return;
        }
        let profile = self.profile();
        let mut stats = owner.upgrades.drone_stats(&self.values);
        if !owner.is_human {
            stats.move_speed *= profile.speed_multiplier;
            stats.attack_cooldown_ms = (stats.attack_cooldown_ms
                / profile.attack_speed_multiplier as f64)
                .max(100.0);
        }

        let pos = setup::spawn_position(self, player);
        let id = self.next_entity_id();
        let mut drone = Drone::new(id, player, pos, stats, &self.values, self.clock_ms);
        let owner = &mut self.players[player];
        drone.rally_revision = owner.rally_revision;
        owner.drones.push(drone);
    }

    /// Push an explosion marker, evicting the oldest at the cap
    pub fn push_explosion(&mut self, pos: Vec2, color: &str) {
        if self.explosions.len() >= MAX_EXPLOSIONS {
            self.explosions.pop_front();
        }
        self.explosions.push_back(Explosion {
            pos,
            color: color.to_string(),
            started_ms: self.clock_ms,
        });
    }

    pub fn expire_explosions(&mut self) {
        let now = self.clock_ms;
        self.explosions
            .retain(|e| now - e.started_ms < EXPLOSION_DURATION_MS);
    }

    /// Position and team (None for debris) of a live target
    pub fn locate(&self, target: TargetRef) -> Option<(Vec2, Option<usize>)> {
        match target {
            TargetRef::Drone(id) => self.players.iter().find_map(|p| {
                p.drones
                    .iter()
                    .find(|d| d.id == id && d.is_alive())
                    .map(|d| (d.pos, Some(p.team)))
            }),
            TargetRef::Base(owner) => self
                .players
                .get(owner)
                .filter(|p| p.base.is_alive())
                .map(|p| (p.base.pos, Some(p.team))),
            TargetRef::Debris(id) => self
                .debris
                .iter()
                .find(|d| d.id == id && d.is_alive())
                .map(|d| (d.pos, None)),
        }
    }

    /// Move every drone of `player` toward a new rally point
    pub fn set_rally_point(&mut self, player: PlayerId, x: f32, y: f32) {
        if self.phase != GamePhase::Playing || !x.is_finite() || !y.is_finite() {
            return;
        }
        let point = Vec2::new(
            x.clamp(RALLY_INSET, (self.bounds.x - RALLY_INSET).max(RALLY_INSET)),
            y.clamp(RALLY_INSET, (self.bounds.y - RALLY_INSET).max(RALLY_INSET)),
        );
        let now = self.clock_ms;
        let Some(owner) = self.players.get_mut(player) else {
            return;
        };
        owner.set_rally(point);
        let revision = owner.rally_revision;
        for drone in &mut owner.drones {
            drone.interrupt_current_action(now);
            drone.reached_rally = false;
            drone.rally_revision = revision;
            drone.player_target = None;
            drone.should_interrupt_attack = true;
        }
    }

    /// Focus every drone of `player` on one enemy or debris node
    pub fn set_attack_target(&mut self, player: PlayerId, target: TargetRef) {
        if self.phase != GamePhase::Playing {
            return;
        }
        let Some(team) = self.players.get(player).map(|p| p.team) else {
            return;
        };
        match self.locate(target) {
            Some((_, Some(target_team))) if target_team == team => return,
            None => return,
            _ => {}
        }

        let now = self.clock_ms;
        for drone in &mut self.players[player].drones {
            drone.interrupt_current_action(now);
            drone.player_target = Some(target);
            drone.reached_rally = false;
            drone.should_interrupt_attack = false;
        }
    }

    /// Buy an upgrade for `player`
    pub fn request_upgrade(&mut self, player: PlayerId, attribute: UpgradeAttribute) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        self.players
            .get_mut(player)
            .is_some_and(|p| p.try_upgrade(attribute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GameMode;

    fn playing(mode: GameMode) -> GameState {
        let mut state = GameState::new(Settings {
            mode,
            ..Default::default()
        });
        state.start_round();
        state
    }

    #[test]
    fn test_resize_keeps_spawned_entities() {
        let mut state = playing(GameMode::OneVsOne);
        state.spawn_drone(0);
        let first = state.players[0].drones.last().map(|d| (d.id, d.size, d.collision_radius));
        let base_radius = state.players[0].base.collision_radius;

        state.resize(900.0, 600.0, 1.0);
        state.spawn_drone(0);

        let (first_id, first_size, first_radius) = first.unwrap();
        let kept = state.players[0].drones.iter().find(|d| d.id == first_id).unwrap();
        assert_eq!(kept.size, first_size);
        assert_eq!(kept.collision_radius, first_radius);
        assert_eq!(state.players[0].base.collision_radius, base_radius);

        let second = state.players[0].drones.last().unwrap();
        assert_ne!(second.id, first_id);
        assert!(second.size < first_size);
        assert_eq!(second.size, state.values.drone_size);
    }

    #[test]
    fn test_new_state_is_welcome() {
        let state = GameState::new(Settings::default());
        assert_eq!(state.phase, GamePhase::Welcome);
        assert!(state.players.is_empty());
    }

    #[test]
    fn test_start_round_populates_players() {
        let state = playing(GameMode::OneVsOne);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.players.len(), 2);
        assert!(state.players[0].is_human);
        assert!(!state.players[1].is_human);
        for p in &state.players {
            assert_eq!(p.drones.len(), INITIAL_DRONES);
            assert_eq!(p.base.health, BASE_MAX_HEALTH);
        }
        assert_eq!(state.debris.len(), 5);
    }

    #[test]
    fn test_two_vs_two_has_no_debris_and_paired_teams() {
        let state = playing(GameMode::TwoVsTwo);
        assert_eq!(state.players.len(), 4);
        assert!(state.debris.is_empty());
        let teams: Vec<usize> = state.players.iter().map(|p| p.team).collect();
        assert_eq!(teams, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let state = playing(GameMode::FreeForAll);
        let mut ids: Vec<u32> = state
            .players
            .iter()
            .flat_map(|p| p.drones.iter().map(|d| d.id))
            .chain(state.debris.iter().map(|d| d.id))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_kill_bonus_every_fifth() {
        let mut state = playing(GameMode::OneVsOne);
        let p = &mut state.players[0];
        for _ in 0..4 {
            p.add_kill();
        }
        assert_eq!(p.resources, 0);
        p.add_kill();
        assert_eq!(p.resources, 1);
        assert_eq!(p.kills, 5);
        for _ in 0..5 {
            p.add_kill();
        }
        assert_eq!(p.resources, 2);
        assert_eq!(p.kills, 10);
    }

    #[test]
    fn test_upgrade_spends_and_caps() {
        let mut state = playing(GameMode::OneVsOne);
        state.players[0].resources = 100;
        let mut spent = 0;
        for level in 0..MAX_UPGRADE_LEVEL {
            spent += crate::sim::entities::upgrade_cost(UpgradeAttribute::Attack, level);
            assert!(state.request_upgrade(0, UpgradeAttribute::Attack));
        }
        assert!(!state.request_upgrade(0, UpgradeAttribute::Attack));
        assert_eq!(state.players[0].upgrades.attack, MAX_UPGRADE_LEVEL);
        assert_eq!(state.players[0].resources, 100 - spent);
    }

    #[test]
    fn test_base_health_upgrade() {
        let mut state = playing(GameMode::OneVsOne);
        state.players[0].resources = 9;
        assert!(!state.request_upgrade(0, UpgradeAttribute::BaseHealth));
        state.players[0].resources = 60;
        for _ in 0..5 {
            assert!(state.request_upgrade(0, UpgradeAttribute::BaseHealth));
        }
        let base = &state.players[0].base;
        assert_eq!(base.max_health, BASE_MAX_HEALTH + 450.0);
        assert_eq!(base.health, base.max_health);
        assert_eq!(state.players[0].resources, 10);
    }

    #[test]
    fn test_upgrade_refused_with_dead_base() {
        let mut state = playing(GameMode::TwoVsTwo);
        state.players[0].resources = 10;
        state.players[0].base.health = 0.0;
        assert!(!state.request_upgrade(0, UpgradeAttribute::Health));
        assert_eq!(state.players[0].resources, 10);
    }

    #[test]
    fn test_rally_command_clamps_and_interrupts() {
        let mut state = playing(GameMode::OneVsOne);
        state.players[0].drones[0].player_target = Some(TargetRef::Base(1));
        state.set_rally_point(0, -50.0, 5000.0);
        let player = &state.players[0];
        assert_eq!(player.rally, Some(Vec2::new(RALLY_INSET, 800.0 - RALLY_INSET)));
        for drone in &player.drones {
            assert!(drone.should_interrupt_attack);
            assert_eq!(drone.player_target, None);
            assert_eq!(drone.last_command_ms, Some(state.clock_ms));
        }
    }

    #[test]
    fn test_invalid_rally_is_ignored() {
        let mut state = playing(GameMode::OneVsOne);
        state.set_rally_point(0, f32::NAN, 100.0);
        assert_eq!(state.players[0].rally, None);
    }

    #[test]
    fn test_attack_target_rejects_own_team() {
        let mut state = playing(GameMode::OneVsOne);
        let own = TargetRef::Drone(state.players[0].drones[1].id);
        state.set_attack_target(0, own);
        assert!(state.players[0].drones.iter().all(|d| d.player_target.is_none()));

        state.set_attack_target(0, TargetRef::Base(1));
        assert!(state.players[0]
            .drones
            .iter()
            .all(|d| d.player_target == Some(TargetRef::Base(1)) && !d.should_interrupt_attack));
    }

    #[test]
    fn test_explosions_are_bounded() {
        let mut state = playing(GameMode::OneVsOne);
        for i in 0..(MAX_EXPLOSIONS + 5) {
            state.clock_ms = i as f64;
            state.push_explosion(Vec2::ZERO, "#ffffff");
        }
        assert_eq!(state.explosions.len(), MAX_EXPLOSIONS);
        assert_eq!(state.explosions[0].started_ms, 5.0);

        state.clock_ms = 5.0 + EXPLOSION_DURATION_MS;
        state.expire_explosions();
        assert_eq!(state.explosions[0].started_ms, 6.0);
    }

    #[test]
    fn test_surrender_hands_round_to_ai() {
        let mut state = playing(GameMode::OneVsOne);
        state.surrender();
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.outcome, Some(RoundOutcome::Victory { team: 1 }));
    }

    #[test]
    fn test_return_to_welcome_clears_round() {
        let mut state = playing(GameMode::OneVsOne);
        state.pause_elapsed_ms = 1234.0;
        state.return_to_welcome();
        assert_eq!(state.phase, GamePhase::Welcome);
        assert!(state.players.is_empty());
        assert_eq!(state.pause_elapsed_ms, 0.0);
    }
}

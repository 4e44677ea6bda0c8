//! Entity models: bases, drones, projectiles and debris
//!
//! Entities never hold references to each other. Targets are `TargetRef`
//! handles that are resolved (and checked for health > 0) at the point of use.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::normalize_angle;
use crate::scale::ScaledValues;

/// Index of a player within `GameState::players`
pub type PlayerId = usize;

/// Non-owning handle to something a drone can shoot at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Drone(u32),
    /// A player's base, identified by its owner
    Base(PlayerId),
    Debris(u32),
}

/// A player's base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Base {
    pub owner: PlayerId,
    pub pos: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub size: f32,
    pub collision_radius: f32,
    /// Creation time; damage is ignored for `BASE_INVULNERABLE_MS` after it
    pub created_ms: f64,
}

impl Base {
    pub fn new(owner: PlayerId, pos: Vec2, scale: &ScaledValues, now: f64) -> Self {
        Self {
            owner,
            pos,
            health: BASE_MAX_HEALTH,
            max_health: BASE_MAX_HEALTH,
            size: scale.base_size,
            collision_radius: scale.base_collision_radius,
            created_ms: now,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn is_invulnerable(&self, now: f64) -> bool {
        now - self.created_ms < BASE_INVULNERABLE_MS
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }

    /// Apply damage. Returns false if the hit was absorbed.
    pub fn take_damage(&mut self, amount: f32, now: f64) -> bool {
        if self.is_invulnerable(now) || !self.is_alive() {
            return false;
        }
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        true
    }
}

/// Stats a drone is born with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneStats {
    pub max_health: f32,
    pub attack: f32,
    pub attack_cooldown_ms: f64,
    pub move_speed: f32,
    pub projectile_speed: f32,
}

/// A single combat drone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: u32,
    pub owner: PlayerId,
    pub pos: Vec2,
    /// Flocking velocity (px per reference frame); path movement does not use it
    pub vel: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub attack: f32,
    pub attack_cooldown_ms: f64,
    pub move_speed: f32,
    pub projectile_speed: f32,

    // Values captured from the scale at spawn
    pub size: f32,
    pub collision_radius: f32,
    pub attack_range: f32,
    pub auto_attack_range: f32,
    pub rally_range: f32,
    pub projectile_size: f32,

    pub facing: f32,
    pub target_facing: f32,
    pub spawned_ms: f64,
    pub last_attack_ms: Option<f64>,

    /// Autonomously chosen target
    pub target: Option<TargetRef>,
    /// Target assigned by an attack command
    pub player_target: Option<TargetRef>,

    pub reached_rally: bool,
    /// Rally revision last observed; a change resets `reached_rally`
    pub rally_revision: u32,
    pub should_interrupt_attack: bool,
    pub last_command_ms: Option<f64>,

    // Flocking stability tracking
    pub last_pos: Vec2,
    pub stable_frames: u32,
    pub is_stable: bool,
}

impl Drone {
    pub fn new(
        id: u32,
        owner: PlayerId,
        pos: Vec2,
        stats: DroneStats,
        scale: &ScaledValues,
        now: f64,
    ) -> Self {
        Self {
            id,
            owner,
            pos,
            vel: Vec2::ZERO,
            health: stats.max_health,
            max_health: stats.max_health,
            attack: stats.attack,
            attack_cooldown_ms: stats.attack_cooldown_ms,
            move_speed: stats.move_speed,
            projectile_speed: stats.projectile_speed,
            size: scale.drone_size,
            collision_radius: scale.drone_collision_radius,
            attack_range: scale.drone_attack_range,
            auto_attack_range: scale.drone_auto_attack_range,
            rally_range: scale.drone_rally_range,
            projectile_size: scale.projectile_size,
            facing: 0.0,
            target_facing: 0.0,
            spawned_ms: now,
            last_attack_ms: None,
            target: None,
            player_target: None,
            reached_rally: false,
            rally_revision: 0,
            should_interrupt_attack: false,
            last_command_ms: None,
            last_pos: pos,
            stable_frames: 0,
            is_stable: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn is_invulnerable(&self, now: f64) -> bool {
        now - self.spawned_ms < DRONE_INVULNERABLE_MS
    }

    /// Translating under flocking velocity
    pub fn is_moving(&self) -> bool {
        self.vel.x.abs() > MOVING_EPSILON || self.vel.y.abs() > MOVING_EPSILON
    }

    /// A player command arrived within the command window
    pub fn has_recent_command(&self, now: f64) -> bool {
        self.last_command_ms
            .is_some_and(|t| now - t < COMMAND_WINDOW_MS)
    }

    /// A recent command asked for current attacks to be dropped
    pub fn interrupt_pending(&self, now: f64) -> bool {
        self.should_interrupt_attack && self.has_recent_command(now)
    }

    /// Apply damage. Returns false if the hit was absorbed.
    pub fn take_damage(&mut self, amount: f32, now: f64) -> bool {
        if self.is_invulnerable(now) || !self.is_alive() {
            return false;
        }
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        true
    }

    /// Drop whatever the drone was doing in response to a player command
    pub fn interrupt_current_action(&mut self, now: f64) {
        self.target = None;
        self.reached_rally = false;
        self.vel = Vec2::ZERO;
        self.stable_frames = 0;
        self.is_stable = false;
        self.last_command_ms = Some(now);
    }

    pub fn face_toward(&mut self, point: Vec2) {
        let d = point - self.pos;
        if d.length_squared() > 0.0 {
            self.target_facing = d.y.atan2(d.x);
        }
    }

    /// Rotate facing toward `target_facing` at a bounded turn rate
    pub fn update_facing(&mut self, dt_ms: f32) {
        let mut delta = normalize_angle(self.target_facing) - normalize_angle(self.facing);
        // Handle wraparound
        if delta > std::f32::consts::PI {
            delta -= std::f32::consts::TAU;
        } else if delta < -std::f32::consts::PI {
            delta += std::f32::consts::TAU;
        }

        if delta.abs() < FACING_SNAP {
            self.facing = normalize_angle(self.target_facing);
            return;
        }

        let max_delta = FACING_SPEED * dt_ms / FRAME_MS;
        self.facing = normalize_angle(self.facing + delta.clamp(-max_delta, max_delta));
    }
}

/// A shot in flight. Aimed at a point, never retargets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    /// Displacement per reference frame
    pub vel: Vec2,
    pub damage: f32,
    pub owner: PlayerId,
    pub team: usize,
    pub color: String,
    pub speed: f32,
    pub size: f32,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            damage: 0.0,
            owner: 0,
            team: 0,
            color: String::new(),
            speed: 0.0,
            size: 0.0,
        }
    }
}

/// Everything needed to launch a projectile
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub origin: Vec2,
    pub target: Vec2,
    pub damage: f32,
    pub owner: PlayerId,
    pub speed: f32,
    pub size: f32,
}

impl Projectile {
    /// Re-arm this projectile for a new shot
    pub fn launch(&mut self, shot: &Shot, team: usize, color: &str) {
        let dir = (shot.target - shot.origin).normalize_or_zero();
        self.pos = shot.origin;
        self.vel = dir * shot.speed;
        self.damage = shot.damage;
        self.owner = shot.owner;
        self.team = team;
        self.color.clear();
        self.color.push_str(color);
        self.speed = shot.speed;
        self.size = shot.size;
    }

    /// Advance along the fixed heading
    pub fn advance(&mut self, dt_ms: f32) {
        self.pos += self.vel * (dt_ms / FRAME_MS);
    }

    pub fn is_out_of_bounds(&self, bounds: Vec2) -> bool {
        self.pos.x < 0.0 || self.pos.x > bounds.x || self.pos.y < 0.0 || self.pos.y > bounds.y
    }
}

/// A destructible resource node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debris {
    pub id: u32,
    pub pos: Vec2,
    pub size: f32,
    pub points: u32,
    pub health: f32,
    pub max_health: f32,
}

impl Debris {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Apply damage and report whether the node is destroyed
    pub fn take_damage(&mut self, amount: f32) -> bool {
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        self.health <= 0.0
    }
}

/// Upgradeable attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeAttribute {
    Attack,
    AttackSpeed,
    MoveSpeed,
    Health,
    BaseHealth,
}

impl UpgradeAttribute {
    pub const ALL: [UpgradeAttribute; 5] = [
        UpgradeAttribute::Attack,
        UpgradeAttribute::AttackSpeed,
        UpgradeAttribute::MoveSpeed,
        UpgradeAttribute::Health,
        UpgradeAttribute::BaseHealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeAttribute::Attack => "attack",
            UpgradeAttribute::AttackSpeed => "attackSpeed",
            UpgradeAttribute::MoveSpeed => "moveSpeed",
            UpgradeAttribute::Health => "health",
            UpgradeAttribute::BaseHealth => "baseHealth",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "attack" => Some(UpgradeAttribute::Attack),
            "attackSpeed" | "attack_speed" => Some(UpgradeAttribute::AttackSpeed),
            "moveSpeed" | "move_speed" => Some(UpgradeAttribute::MoveSpeed),
            "health" => Some(UpgradeAttribute::Health),
            "baseHealth" | "base_health" => Some(UpgradeAttribute::BaseHealth),
            _ => None,
        }
    }
}

/// Cost of buying the next level of `attribute` when it is at `level`
pub fn upgrade_cost(attribute: UpgradeAttribute, level: u32) -> u32 {
    if attribute == UpgradeAttribute::BaseHealth {
        return BASE_HEALTH_UPGRADE_COST;
    }
    match level {
        0..=3 => 1,
        4..=6 => 2,
        _ => 3,
    }
}

/// Bonus from `level` upgrades of `step` each; levels past 4 give half
pub fn upgrade_bonus(level: u32, step: f32) -> f32 {
    if level <= 4 {
        level as f32 * step
    } else {
        4.0 * step + (level - 4) as f32 * step * 0.5
    }
}

/// Upgrade levels for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrades {
    pub attack: u32,
    pub attack_speed: u32,
    pub move_speed: u32,
    pub health: u32,
    pub base_health: u32,
}

impl Upgrades {
    pub fn level(&self, attribute: UpgradeAttribute) -> u32 {
        match attribute {
            UpgradeAttribute::Attack => self.attack,
            UpgradeAttribute::AttackSpeed => self.attack_speed,
            UpgradeAttribute::MoveSpeed => self.move_speed,
            UpgradeAttribute::Health => self.health,
            UpgradeAttribute::BaseHealth => self.base_health,
        }
    }

    pub fn level_mut(&mut self, attribute: UpgradeAttribute) -> &mut u32 {
        match attribute {
            UpgradeAttribute::Attack => &mut self.attack,
            UpgradeAttribute::AttackSpeed => &mut self.attack_speed,
            UpgradeAttribute::MoveSpeed => &mut self.move_speed,
            UpgradeAttribute::Health => &mut self.health,
            UpgradeAttribute::BaseHealth => &mut self.base_health,
        }
    }

    /// Price of the next level, or None at the cap
    pub fn next_cost(&self, attribute: UpgradeAttribute) -> Option<u32> {
        let level = self.level(attribute);
        (level < MAX_UPGRADE_LEVEL).then(|| upgrade_cost(attribute, level))
    }

    /// Stats for a drone spawned with these upgrades
    pub fn drone_stats(&self, scale: &ScaledValues) -> DroneStats {
        DroneStats {
            max_health: 1.0 + upgrade_bonus(self.health, 0.5),
            attack: 1.0 + upgrade_bonus(self.attack, 0.5),
            attack_cooldown_ms: 500.0 - upgrade_bonus(self.attack_speed, 10.0) as f64,
            move_speed: scale.drone_base_speed
                + upgrade_bonus(self.move_speed, scale.drone_speed_upgrade),
            projectile_speed: scale.projectile_base_speed
                + upgrade_bonus(self.move_speed, scale.projectile_speed_upgrade),
        }
    }
}

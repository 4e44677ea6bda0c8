//! Drone Swarm - a real-time strategy simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (drones, combat, AI, game flow)
//! - `scale`: Viewport-dependent gameplay constants
//! - `settings`: Round configuration (mode, difficulty, tuning)

pub mod scale;
pub mod settings;
pub mod sim;

pub use scale::{Scale, ScaledValues};
pub use settings::{Difficulty, GameMode, Settings, SettingsError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Reference frame length in milliseconds; per-frame speeds are scaled by `dt / FRAME_MS`
    pub const FRAME_MS: f32 = 16.67;
    /// Fixed simulation timestep used by the headless driver (ms)
    pub const SIM_DT_MS: f32 = FRAME_MS;

    /// Design resolution the scale factor is measured against
    pub const BASE_WIDTH: f32 = 1200.0;
    pub const BASE_HEIGHT: f32 = 800.0;

    /// Canonical team palette
    pub const PLAYER_COLORS: [&str; 4] = ["#00ff00", "#0099ff", "#ff0000", "#ffba00"];

    /// Drone production
    pub const INITIAL_DRONES: usize = 20;
    pub const MAX_DRONES: usize = 30;
    pub const SPAWN_INTERVAL_MS: f64 = 1000.0;

    /// Invulnerability windows (ms)
    pub const DRONE_INVULNERABLE_MS: f64 = 1000.0;
    pub const BASE_INVULNERABLE_MS: f64 = 2000.0;

    pub const BASE_MAX_HEALTH: f32 = 1000.0;

    /// Window in which a player command overrides autonomous behavior (ms)
    pub const COMMAND_WINDOW_MS: f64 = 100.0;
    /// Shots fired this recently are followed by an immediate retarget on interrupt (ms)
    pub const INTERRUPT_AFTER_SHOT_MS: f64 = 50.0;

    /// Facing turn rate (radians per reference frame) and snap threshold
    pub const FACING_SPEED: f32 = 0.1;
    pub const FACING_SNAP: f32 = 0.05;

    /// Movement stops inside this distance of the destination
    pub const ARRIVAL_EPSILON: f32 = 5.0;
    /// Speed ramps down inside this distance
    pub const SLOWDOWN_DISTANCE: f32 = 30.0;
    /// Drones stop short of the firing radius by this buffer
    pub const ENGAGE_BUFFER: f32 = 15.0;
    /// Velocity component above which a drone counts as translating
    pub const MOVING_EPSILON: f32 = 0.1;

    /// Rally arrival radius bounds
    pub const MIN_RALLY_RADIUS: f32 = 25.0;
    pub const MAX_RALLY_RADIUS: f32 = 100.0;

    /// Projectile pool capacity
    pub const PROJECTILE_POOL_SIZE: usize = 100;

    /// Kills needed per bonus resource
    pub const KILLS_PER_RESOURCE: u32 = 5;

    /// Upgrades
    pub const MAX_UPGRADE_LEVEL: u32 = 10;
    pub const BASE_HEALTH_UPGRADE_COST: u32 = 10;

    /// Explosion markers
    pub const MAX_EXPLOSIONS: usize = 20;
    pub const EXPLOSION_DURATION_MS: f64 = 400.0;

    /// Tick cadences
    pub const FLOCKING_EVERY: u64 = 3;
    pub const AI_MIN_GAP: u64 = 10;
    pub const HUD_MIN_GAP: u64 = 30;

    /// Resources granted to a winning human player
    pub const VICTORY_BONUS: u32 = 10;

    /// Rally points are kept this far inside the playfield
    pub const RALLY_INSET: f32 = 20.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Angle of the vector from `from` to `to`
#[inline]
pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

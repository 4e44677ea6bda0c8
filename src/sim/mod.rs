//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Simulated clock only, advanced by the tick
//! - Seeded RNG only
//! - Stable iteration order (player slot, then drone creation order)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod combat;
pub mod entities;
pub mod flocking;
pub mod movement;
pub mod pool;
pub mod setup;
pub mod snapshot;
pub mod state;
pub mod targeting;
pub mod tick;

pub use entities::{
    Base, Debris, Drone, DroneStats, PlayerId, Projectile, Shot, TargetRef, UpgradeAttribute,
    Upgrades,
};
pub use pool::ProjectilePool;
pub use snapshot::{HudSummary, Snapshot};
pub use state::{Explosion, GameEvent, GamePhase, GameState, Player, RoundOutcome};
pub use tick::{Command, TickInput, tick};

//! Viewport scaling
//!
//! Gameplay constants are authored against a 1200x800 design resolution and
//! multiplied by a uniform factor derived from the live viewport. Entities
//! capture the values they need when they are created, so a resize only
//! affects what spawns afterwards.

use serde::{Deserialize, Serialize};

use crate::consts::{BASE_HEIGHT, BASE_WIDTH};

const MIN_SCALE: f32 = 0.3;
const MAX_SCALE: f32 = 2.0;
const MOBILE_WIDTH: f32 = 768.0;
const SMALL_MOBILE_WIDTH: f32 = 480.0;

/// Design-space values before scaling
mod design {
    pub const DRONE_SIZE: f32 = 8.0;
    pub const DRONE_COLLISION_RADIUS: f32 = 9.0;
    pub const DRONE_BASE_SPEED: f32 = 1.5;
    pub const DRONE_SPEED_UPGRADE: f32 = 0.4;
    pub const DRONE_ATTACK_RANGE: f32 = 160.0;
    pub const DRONE_AUTO_ATTACK_RANGE: f32 = 180.0;
    pub const DRONE_RALLY_RANGE: f32 = 30.0;
    pub const PROJECTILE_BASE_SPEED: f32 = 1.65;
    pub const PROJECTILE_SPEED_UPGRADE: f32 = 0.33;
    pub const PROJECTILE_SIZE: f32 = 3.0;
    pub const BASE_SIZE: f32 = 40.0;
    pub const BASE_COLLISION_RADIUS: f32 = 45.0;
    pub const DEBRIS_MIN_SIZE: f32 = 10.0;
    pub const DEBRIS_MAX_SIZE: f32 = 20.0;
}

/// Uniform scale factor for a viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
    pub factor: f32,
}

impl Scale {
    /// Compute the scale for a viewport. Pure function of its inputs.
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        let mut factor = (width / BASE_WIDTH).min(height / BASE_HEIGHT);

        if width <= MOBILE_WIDTH {
            let dpr = if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            };
            let dpi_adjust = (2.0 / dpr).clamp(1.0, 1.5);
            let multiplier = if width <= SMALL_MOBILE_WIDTH { 1.4 } else { 1.2 };
            factor *= multiplier * dpi_adjust;
        }

        Self {
            width,
            height,
            device_pixel_ratio,
            factor: factor.clamp(MIN_SCALE, MAX_SCALE),
        }
    }

    pub fn values(&self) -> ScaledValues {
        ScaledValues::from_factor(self.factor)
    }
}

/// Gameplay constants after scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledValues {
    pub drone_size: f32,
    pub drone_collision_radius: f32,
    pub drone_base_speed: f32,
    pub drone_speed_upgrade: f32,
    pub drone_attack_range: f32,
    pub drone_auto_attack_range: f32,
    pub drone_rally_range: f32,
    pub projectile_base_speed: f32,
    pub projectile_speed_upgrade: f32,
    pub projectile_size: f32,
    pub base_size: f32,
    pub base_collision_radius: f32,
    pub debris_min_size: f32,
    pub debris_max_size: f32,
}

impl ScaledValues {
    pub fn from_factor(f: f32) -> Self {
        Self {
            drone_size: design::DRONE_SIZE * f,
            drone_collision_radius: design::DRONE_COLLISION_RADIUS * f,
            drone_base_speed: design::DRONE_BASE_SPEED * f,
            drone_speed_upgrade: design::DRONE_SPEED_UPGRADE * f,
            drone_attack_range: design::DRONE_ATTACK_RANGE * f,
            drone_auto_attack_range: design::DRONE_AUTO_ATTACK_RANGE * f,
            drone_rally_range: design::DRONE_RALLY_RANGE * f,
            projectile_base_speed: design::PROJECTILE_BASE_SPEED * f,
            projectile_speed_upgrade: design::PROJECTILE_SPEED_UPGRADE * f,
            projectile_size: design::PROJECTILE_SIZE * f,
            base_size: design::BASE_SIZE * f,
            base_collision_radius: design::BASE_COLLISION_RADIUS * f,
            debris_min_size: design::DEBRIS_MIN_SIZE * f,
            debris_max_size: design::DEBRIS_MAX_SIZE * f,
        }
    }
}

impl Default for ScaledValues {
    fn default() -> Self {
        Self::from_factor(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_resolution_is_unit_scale() {
        let scale = Scale::new(1200.0, 800.0, 1.0);
        assert_eq!(scale.factor, 1.0);
        assert_eq!(scale.values().drone_attack_range, 160.0);
    }

    #[test]
    fn test_scale_uses_limiting_axis() {
        let scale = Scale::new(2400.0, 800.0, 1.0);
        assert_eq!(scale.factor, 1.0);
        let scale = Scale::new(1800.0, 1200.0, 1.0);
        assert!((scale.factor - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_scale_is_clamped() {
        assert_eq!(Scale::new(10_000.0, 10_000.0, 1.0).factor, 2.0);
        assert_eq!(Scale::new(1000.0, 100.0, 1.0).factor, MIN_SCALE);
    }

    #[test]
    fn test_mobile_multiplier() {
        // 768 wide tablet at dpr 2: dpi adjust is 1.0, multiplier 1.2
        let scale = Scale::new(768.0, 1024.0, 2.0);
        assert!((scale.factor - 0.64 * 1.2).abs() < 1e-5);

        // small phone at dpr 1: dpi adjust capped to 1.5, multiplier 1.4
        let scale = Scale::new(400.0, 800.0, 1.0);
        let expected = (400.0 / 1200.0) * 1.4 * 1.5;
        assert!((scale.factor - expected).abs() < 1e-5);
    }

    #[test]
    fn test_scale_is_deterministic() {
        assert_eq!(Scale::new(900.0, 700.0, 1.5), Scale::new(900.0, 700.0, 1.5));
    }
}

//! Round settings
//!
//! Loaded from a JSON file by the headless driver; every field has a default
//! so partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::PLAYER_COLORS;

/// Errors from loading a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Match format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameMode {
    #[default]
    #[serde(rename = "1v1")]
    OneVsOne,
    #[serde(rename = "2v2")]
    TwoVsTwo,
    #[serde(rename = "ffa")]
    FreeForAll,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::OneVsOne => "1v1",
            GameMode::TwoVsTwo => "2v2",
            GameMode::FreeForAll => "ffa",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1v1" => Some(GameMode::OneVsOne),
            "2v2" => Some(GameMode::TwoVsTwo),
            "ffa" | "free-for-all" => Some(GameMode::FreeForAll),
            _ => None,
        }
    }

    pub fn player_count(&self) -> usize {
        match self {
            GameMode::OneVsOne => 2,
            GameMode::TwoVsTwo => 4,
            GameMode::FreeForAll => 3,
        }
    }

    pub fn team_count(&self) -> usize {
        match self {
            GameMode::OneVsOne | GameMode::TwoVsTwo => 2,
            GameMode::FreeForAll => 3,
        }
    }

    /// Team index for a player slot
    pub fn team_of(&self, player: usize) -> usize {
        match self {
            GameMode::TwoVsTwo => player / 2,
            _ => player,
        }
    }

    /// Number of debris nodes scattered at round start
    pub fn debris_count(&self) -> usize {
        match self {
            GameMode::TwoVsTwo => 0,
            _ => 5,
        }
    }
}

/// AI difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Fixed behavior table for this tier
    pub fn profile(&self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile {
                upgrade_ratio: 0.0,
                attack_range: 150.0,
                retreat_threshold: 0.3,
                reaction_ms: 2000.0,
                speed_multiplier: 0.8,
                attack_speed_multiplier: 0.8,
                economic_bonus: None,
                resource_priority: false,
                decision_interval: 100,
                upgrade_interval: 200,
            },
            Difficulty::Medium => DifficultyProfile {
                upgrade_ratio: 0.5,
                attack_range: 300.0,
                retreat_threshold: 0.2,
                reaction_ms: 1000.0,
                speed_multiplier: 1.0,
                attack_speed_multiplier: 1.0,
                economic_bonus: None,
                resource_priority: true,
                decision_interval: 100,
                upgrade_interval: 200,
            },
            Difficulty::Hard => DifficultyProfile {
                upgrade_ratio: 1.0,
                attack_range: 500.0,
                retreat_threshold: 0.05,
                reaction_ms: 500.0,
                speed_multiplier: 1.3,
                attack_speed_multiplier: 1.5,
                economic_bonus: Some(1.2),
                resource_priority: true,
                decision_interval: 50,
                upgrade_interval: 150,
            },
        }
    }
}

/// Tuning values for one difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// Fraction of resources spent per upgrade cycle
    pub upgrade_ratio: f32,
    /// Patrol/engagement radius used by decisions
    pub attack_range: f32,
    /// Base health ratio below which the AI retreats
    pub retreat_threshold: f32,
    /// How long a distress flag keeps the AI in emergency mode (ms)
    pub reaction_ms: f64,
    pub speed_multiplier: f32,
    pub attack_speed_multiplier: f32,
    /// Multiplier on debris rewards
    pub economic_bonus: Option<f32>,
    pub resource_priority: bool,
    /// Ticks between strategic decisions
    pub decision_interval: u64,
    /// Ticks between upgrade cycles
    pub upgrade_interval: u64,
}

/// Rally-focus heuristic tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RallyTuning {
    /// Spacing between path samples (px)
    pub sample_step: f32,
    /// How far along the path samples are taken (px)
    pub check_distance: f32,
    /// Friendly proximity radius as a multiple of the drone collision radius
    pub proximity_factor: f32,
    /// Path counts as blocked above this many proximity hits
    pub blocked_threshold: u32,
}

impl Default for RallyTuning {
    fn default() -> Self {
        Self {
            sample_step: 20.0,
            check_distance: 100.0,
            proximity_factor: 2.0,
            blocked_threshold: 3,
        }
    }
}

/// Viewport description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Round settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    /// Human player's colour, one of the palette entries
    pub player_color: String,
    pub viewport: Viewport,
    /// Seed for AI rolls and debris placement
    pub seed: u64,
    pub rally: RallyTuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            difficulty: Difficulty::default(),
            player_color: PLAYER_COLORS[0].to_string(),
            viewport: Viewport::default(),
            seed: 12345,
            rally: RallyTuning::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_from(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                log::warn!("{err}; using default settings");
                Self::default()
            }
        }
    }

    /// Player colours in slot order: the human colour first, AIs take the rest of the palette
    pub fn player_colors(&self) -> Vec<String> {
        let human = PLAYER_COLORS
            .iter()
            .find(|c| c.eq_ignore_ascii_case(&self.player_color))
            .copied()
            .unwrap_or(PLAYER_COLORS[0]);
        let remaining: Vec<&str> = PLAYER_COLORS
            .iter()
            .copied()
            .filter(|c| *c != human)
            .collect();

        (0..self.mode.player_count())
            .map(|i| {
                if i == 0 {
                    human.to_string()
                } else {
                    remaining[(i - 1) % remaining.len()].to_string()
                }
            })
            .collect()
    }
}

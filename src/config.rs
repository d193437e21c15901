//! Tunables for the core.
//!
//! Everything defaults to the values the game ships with. A JSON file in
//! the user's config directory can override any subset of them.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::game::hex::EVEN_ROW_WIDTH;

/// Points and bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoring {
    /// Per token popped by a color match.
    pub destroy_points: u32,
    /// Per token destroyed by an ability.
    pub power_destroy_points: u32,
    /// Per token dropped because it lost its path to the ceiling.
    pub floating_bonus: u32,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            destroy_points: 10,
            power_destroy_points: 15,
            floating_bonus: 20,
        }
    }
}

/// Projectile physics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Pixels travelled per tick.
    pub speed: f32,
    /// Maximum angle from vertical (in radians).
    pub max_aim_angle: f32,
    /// A token is hit once the projectile center is closer than this
    /// fraction of the diameter.
    pub collision_fraction: f32,
    /// Flight ticks before the shot is declared a runaway.
    pub max_flight_ticks: u32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 10.0,
            max_aim_angle: 1.3, // About 75 degrees
            collision_fraction: 0.8,
            max_flight_ticks: 10_000,
        }
    }
}

/// Area the freeze ability covers around the struck token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezeBand {
    /// Columns either side of the struck column.
    pub half_width: i32,
    /// Rows above the struck row (toward the ceiling).
    pub rows_above: i32,
}

impl Default for FreezeBand {
    fn default() -> Self {
        Self {
            half_width: 2,
            rows_above: 3,
        }
    }
}

/// End-of-level rewards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub coins_per_star: u32,
    /// Score needed for each extra coin.
    pub score_per_coin: u32,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            coins_per_star: 10,
            score_per_coin: 100,
        }
    }
}

/// Resource holding every core tunable.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub token_diameter: f32,
    /// Exclusive row bound of the grid.
    pub max_rows: i32,
    /// Vertical position the shooter fires from.
    pub shooter_y: f32,
    /// Ticks between a shot resolving and its floating tokens being reported.
    pub floating_cascade_delay: u32,
    /// First level that gets a reinforced color.
    pub reinforced_from_level: u32,
    pub projectile: ProjectileTuning,
    pub scoring: Scoring,
    pub freeze: FreezeBand,
    pub rewards: Rewards,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            token_diameter: 40.0,
            max_rows: 14,
            shooter_y: 560.0,
            floating_cascade_delay: 12,
            reinforced_from_level: 4,
            projectile: ProjectileTuning::default(),
            scoring: Scoring::default(),
            freeze: FreezeBand::default(),
            rewards: Rewards::default(),
        }
    }
}

impl CoreConfig {
    pub fn token_radius(&self) -> f32 {
        self.token_diameter / 2.0
    }

    /// Right wall of the playfield; the left wall is `x = 0`.
    pub fn playfield_width(&self) -> f32 {
        EVEN_ROW_WIDTH as f32 * self.token_diameter
    }

    /// Where every shot starts: centered above the shooter.
    pub fn shooter_origin(&self) -> Vec2 {
        Vec2::new(self.playfield_width() / 2.0, self.shooter_y)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get the default file path for the config.
    pub fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hexpop").join("core.json"))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            warn!("Could not determine config directory, using default core config");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load from `path`, falling back to defaults when it is missing or broken.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No core config found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!("Loaded core config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse core config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read core config file: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config =
            CoreConfig::from_json(r#"{ "max_rows": 20, "scoring": { "floating_bonus": 50 } }"#).unwrap();
        assert_eq!(config.max_rows, 20);
        assert_eq!(config.scoring.floating_bonus, 50);
        assert_eq!(config.scoring.destroy_points, 10);
        assert_eq!(config.projectile, ProjectileTuning::default());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(CoreConfig::from_json("{ max_rows: ").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("hexpop-definitely-missing").join("core.json");
        assert_eq!(CoreConfig::load_from(&path), CoreConfig::default());
    }

    #[test]
    fn test_shooter_is_centered() {
        let config = CoreConfig::default();
        assert_eq!(config.playfield_width(), 360.0);
        assert_eq!(config.shooter_origin(), Vec2::new(180.0, 560.0));
    }
}

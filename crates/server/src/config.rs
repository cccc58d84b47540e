//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub orb: OrbConfig,
    #[serde(default)]
    pub snake: SnakeConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            arena: ArenaConfig::default(),
            orb: OrbConfig::default(),
            snake: SnakeConfig::default(),
            leaderboard: LeaderboardConfig::default(),
        }
    }
}

/// Server networking settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    9000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}

/// Arena geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArenaConfig {
    /// Half-extent of the square arena on both axes.
    #[serde(default = "default_half_extent")]
    pub half_extent: f64,
    /// Collision radius of each snake body segment.
    #[serde(default = "default_segment_radius")]
    pub segment_radius: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_extent: default_half_extent(),
            segment_radius: default_segment_radius(),
        }
    }
}

fn default_half_extent() -> f64 {
    1500.0
}
fn default_segment_radius() -> f64 {
    35.0
}

/// Orb economy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrbConfig {
    /// Natural orb capacity per match (death orbs are additive headroom).
    #[serde(default = "default_orb_max_count")]
    pub max_count: usize,
    /// Inset from each arena wall inside which orbs spawn.
    #[serde(default = "default_orb_margin")]
    pub margin: f64,
    /// Replenishment interval in seconds.
    #[serde(default = "default_orb_interval")]
    pub generation_interval_secs: u64,
    /// Probability that a newly generated orb is SMALL.
    #[serde(default = "default_orb_small_weight")]
    pub small_weight: f64,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            max_count: default_orb_max_count(),
            margin: default_orb_margin(),
            generation_interval_secs: default_orb_interval(),
            small_weight: default_orb_small_weight(),
        }
    }
}

fn default_orb_max_count() -> usize {
    150
}
fn default_orb_margin() -> f64 {
    100.0
}
fn default_orb_interval() -> u64 {
    5
}
fn default_orb_small_weight() -> f64 {
    0.75
}

/// Snake spawn and growth settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnakeConfig {
    /// X coordinate of the spawn column.
    #[serde(default = "default_spawn_x")]
    pub spawn_x: f64,
    /// Y coordinate of the first spawn segment.
    #[serde(default = "default_spawn_y")]
    pub spawn_y: f64,
    /// Spacing between consecutive spawn segments.
    #[serde(default = "default_segment_spacing")]
    pub segment_spacing: f64,
    /// Number of segments a freshly spawned snake has.
    #[serde(default = "default_initial_length")]
    pub initial_length: usize,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            spawn_x: default_spawn_x(),
            spawn_y: default_spawn_y(),
            segment_spacing: default_segment_spacing(),
            initial_length: default_initial_length(),
        }
    }
}

fn default_spawn_x() -> f64 {
    600.0
}
fn default_spawn_y() -> f64 {
    100.0
}
fn default_segment_spacing() -> f64 {
    5.0
}
fn default_initial_length() -> usize {
    20
}

/// Score board settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaderboardConfig {
    /// Broadcast interval in seconds.
    #[serde(default = "default_leaderboard_interval")]
    pub update_interval_secs: u64,
    /// Score every player starts with.
    #[serde(default = "default_initial_score")]
    pub initial_score: i64,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_leaderboard_interval(),
            initial_score: default_initial_score(),
        }
    }
}

fn default_leaderboard_interval() -> u64 {
    1
}
fn default_initial_score() -> i64 {
    20
}

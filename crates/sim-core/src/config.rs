//! Configuration
//!
//! Runtime knobs for the simulation, loaded from a TOML file with serde
//! defaults per section. CLI flags override the handful that matter for a
//! run (seed, tick count).

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Complete simulation configuration.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub decision: DecisionConfig,
    pub spawn: SpawnConfig,
    pub decay: NeedDecayConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// World geometry and clock settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    /// Edge length of one spatial grid cell.
    pub cell_size: f64,
    /// How far inside the walls agents are kept.
    pub boundary_buffer: f64,
    pub seconds_per_tick: u64,
    /// Edge length of the home base square.
    pub home_size: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            cell_size: 50.0,
            boundary_buffer: 5.0,
            seconds_per_tick: 1,
            home_size: 30.0,
        }
    }
}

/// Decision loop throttling and population limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Decide once every this many ticks.
    pub person_period: u32,
    pub animal_period: u32,
    /// Offset of the animal pass so the two passes never share a tick.
    pub animal_offset: u32,
    /// Mate advertisements are filtered out above this population.
    pub person_limit: u32,
    /// Delta multiplier applied by player task priorities.
    pub task_multiplier: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            person_period: 8,
            animal_period: 8,
            animal_offset: 4,
            person_limit: 20,
            task_multiplier: 5.0,
        }
    }
}

/// Spawn pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Animals stop spawning above this total entity count.
    pub max_entity_count: usize,
    /// Per-tick chance of a wild animal appearing.
    pub animal_spawn_chance: f64,
    /// Ticks between ambient item drops.
    pub item_spawn_period: u32,
    pub initial_people: u32,
    pub initial_plants: u32,
    pub initial_apple_trees: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            max_entity_count: 100,
            // Averages one spawn every few seconds of simulated time.
            animal_spawn_chance: 0.0069,
            item_spawn_period: 1000,
            initial_people: 6,
            initial_plants: 10,
            initial_apple_trees: 3,
        }
    }
}

/// Need decay per decision period, and the proximity boosts that push
/// back against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedDecayConfig {
    pub hunger: f64,
    pub social: f64,
    pub lust: f64,
    pub tiredness: f64,
    pub boredom: f64,
    pub job_fulfillment: f64,
    pub warmth: f64,
    /// Social recovered per period when other people are nearby.
    pub company_social: f64,
    /// Warmth recovered per period near a campfire.
    pub campfire_warmth: f64,
}

impl Default for NeedDecayConfig {
    fn default() -> Self {
        Self {
            hunger: 0.010,
            social: 0.001,
            lust: 0.001,
            tiredness: 0.002,
            boredom: 0.001,
            job_fulfillment: 0.003,
            warmth: 0.001,
            company_social: 0.005,
            campfire_warmth: 0.005,
        }
    }
}

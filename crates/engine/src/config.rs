use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::MAX_ENTITIES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chance {
    pub numerator: u32,
    pub denominator: u32,
}

impl Chance {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn roll<R: Rng + ?Sized>(self, rng: &mut R) -> bool {
        if self.denominator == 0 {
            return false;
        }
        rng.gen_range(0..self.denominator) < self.numerator
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementConfig {
    pub move_delay_ticks: u32,
    pub progress_per_tick: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_delay_ticks: 6,
            progress_per_tick: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
    pub sight_range: u32,
    pub lose_range: u32,
    pub wander_start_chance: Chance,
    pub wander_step_chance: Chance,
    pub chase_replan_interval: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            sight_range: 5,
            lose_range: 7,
            wander_start_chance: Chance::new(1, 200),
            wander_step_chance: Chance::new(2, 100),
            chase_replan_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CombatConfig {
    pub trigger_range: u32,
    pub clear_range: u32,
    pub max_action_points: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            trigger_range: 5,
            clear_range: 7,
            max_action_points: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub movement: MovementConfig,
    pub ai: AiConfig,
    pub combat: CombatConfig,
    pub explore_move_budget: u32,
    pub max_entities: usize,
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            movement: MovementConfig::default(),
            ai: AiConfig::default(),
            combat: CombatConfig::default(),
            explore_move_budget: 10,
            max_entities: MAX_ENTITIES,
            rng_seed: 0x5EED,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config = match serde_path_to_error::deserialize::<_, SimConfig>(&mut deserializer) {
            Ok(config) => config,
            Err(error) => {
                let path = error.path().to_string();
                let message = error.into_inner().to_string();
                return Err(ConfigError::Parse { path, message });
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let progress = self.movement.progress_per_tick;
        if !progress.is_finite() || progress <= 0.0 || progress > 1.0 {
            return Err(ConfigError::Invalid {
                field: "movement.progress_per_tick",
                reason: "must be in (0, 1]",
            });
        }
        for (field, chance) in [
            ("ai.wander_start_chance", self.ai.wander_start_chance),
            ("ai.wander_step_chance", self.ai.wander_step_chance),
        ] {
            if chance.denominator == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "denominator must be non-zero",
                });
            }
            if chance.numerator > chance.denominator {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "numerator exceeds denominator",
                });
            }
        }
        if self.ai.chase_replan_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "ai.chase_replan_interval",
                reason: "must be non-zero",
            });
        }
        if self.ai.lose_range < self.ai.sight_range {
            return Err(ConfigError::Invalid {
                field: "ai.lose_range",
                reason: "must be at least ai.sight_range",
            });
        }
        if self.combat.clear_range < self.combat.trigger_range {
            return Err(ConfigError::Invalid {
                field: "combat.clear_range",
                reason: "must be at least combat.trigger_range",
            });
        }
        if self.max_entities == 0 {
            return Err(ConfigError::Invalid {
                field: "max_entities",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }
}

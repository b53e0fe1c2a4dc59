//! Tunable rule numbers that are not card stats.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_HP: u8 = 20;
pub const MAX_ENERGY: u8 = 10;
pub const STARTING_ENERGY: u8 = 5;
pub const ODD_TURN_INCOME: u8 = 2;
pub const EVEN_TURN_INCOME: u8 = 3;

pub const WALL_HP: u8 = 12;
pub const WALL_DECAY_PER_TURN: u8 = 4;
pub const PROJECTILE_DAMAGE: u8 = 3;
pub const CONTINUOUS_DAMAGE: u8 = 8;
pub const DEFLECTION_VS_CONTINUOUS: u8 = 4;

pub const TURN_TIMER_MS: u64 = 10_000;
pub const DRAFT_TIMER_SHORT_MS: u64 = 12_000;
pub const DRAFT_TIMER_LONG_MS: u64 = 15_000;

pub const HISTORY_LIMIT: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum ConfigError {
    #[error("config is not valid JSON: {message}")]
    Parse { message: String },
    #[error("`{field}` must be greater than zero")]
    ZeroValue { field: String },
    #[error("starting energy {starting} exceeds the cap {max}")]
    StartingEnergyAboveCap { starting: u8, max: u8 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    pub max_hp: u8,
    pub max_energy: u8,
    pub starting_energy: u8,
    pub odd_turn_income: u8,
    pub even_turn_income: u8,
    pub wall_decay_per_turn: u8,
    pub deflection_vs_continuous: u8,
    pub turn_timer_ms: u64,
    pub draft_timer_short_ms: u64,
    pub draft_timer_long_ms: u64,
    /// Turn records and discard entries kept per match; older entries are dropped.
    pub history_limit: usize,
}

impl GameConfig {
    /// Parses a (possibly partial) override document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json).map_err(|err| ConfigError::Parse {
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("max_hp", u64::from(self.max_hp)),
            ("max_energy", u64::from(self.max_energy)),
            ("turn_timer_ms", self.turn_timer_ms),
            ("draft_timer_short_ms", self.draft_timer_short_ms),
            ("draft_timer_long_ms", self.draft_timer_long_ms),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroValue {
                field: (*field).to_string(),
            });
        }
        if self.starting_energy > self.max_energy {
            return Err(ConfigError::StartingEnergyAboveCap {
                starting: self.starting_energy,
                max: self.max_energy,
            });
        }
        Ok(())
    }

    /// Energy granted once `turn_number` has resolved.
    pub fn income_after_turn(&self, turn_number: u32) -> u8 {
        if turn_number % 2 == 1 {
            self.odd_turn_income
        } else {
            self.even_turn_income
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_hp: MAX_HP,
            max_energy: MAX_ENERGY,
            starting_energy: STARTING_ENERGY,
            odd_turn_income: ODD_TURN_INCOME,
            even_turn_income: EVEN_TURN_INCOME,
            wall_decay_per_turn: WALL_DECAY_PER_TURN,
            deflection_vs_continuous: DEFLECTION_VS_CONTINUOUS,
            turn_timer_ms: TURN_TIMER_MS,
            draft_timer_short_ms: DRAFT_TIMER_SHORT_MS,
            draft_timer_long_ms: DRAFT_TIMER_LONG_MS,
            history_limit: HISTORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let config = GameConfig::from_json(r#"{ "max_hp": 30 }"#).expect("config should parse");
        assert_eq!(config.max_hp, 30);
        assert_eq!(config.max_energy, MAX_ENERGY);
        assert_eq!(config.wall_decay_per_turn, WALL_DECAY_PER_TURN);
    }

    #[test]
    fn starting_energy_above_cap_is_rejected() {
        let error = GameConfig::from_json(r#"{ "max_energy": 4 }"#)
            .expect_err("starting energy 5 should exceed cap 4");
        assert_eq!(
            error,
            ConfigError::StartingEnergyAboveCap {
                starting: STARTING_ENERGY,
                max: 4
            }
        );
    }

    #[test]
    fn income_alternates_by_turn_parity() {
        let config = GameConfig::default();
        assert_eq!(config.income_after_turn(1), 2);
        assert_eq!(config.income_after_turn(2), 3);
        assert_eq!(config.income_after_turn(7), 2);
    }
}

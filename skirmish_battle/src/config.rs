// Data-driven battle configuration.
//
// Every tunable number an effect computer uses lives in `BattleConfig`:
// healing percentages, counter thresholds, proc chances, buff sizes,
// animation pacing. Effect code never hard-codes balance values.
//
// Both peers must run with identical configs. The host and guest exchange
// `content_hash()` in the relay handshake and the relay rejects a peer whose
// hash differs. Guests mostly don't need the numbers (they apply outcomes,
// not formulas), but the start-of-battle setup in `state.rs` reads them on
// both sides and must agree.
//
// Configs are loaded from JSON; any omitted field takes its default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Fnv;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Frost bite creature attack parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrostBiteParams {
    pub base_damage: u32,
    pub damage_per_level: u32,
    /// Chance (0–100) that a surviving target is frozen.
    pub freeze_chance_percent: u32,
    pub freeze_stacks: u32,
}

impl Default for FrostBiteParams {
    fn default() -> Self {
        Self {
            base_damage: 20,
            damage_per_level: 10,
            freeze_chance_percent: 35,
            freeze_stacks: 1,
        }
    }
}

/// Battle cry mass-buff parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleCryParams {
    pub attack_bonus: u32,
    pub marker_stacks: u32,
}

impl Default for BattleCryParams {
    fn default() -> Self {
        Self {
            attack_bonus: 10,
            marker_stacks: 1,
        }
    }
}

/// Cosmetic pacing for presentation cues. Never gates state changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationParams {
    pub strike_delay_ms: u64,
    pub heal_delay_ms: u64,
    pub buff_delay_ms: u64,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            strike_delay_ms: 300,
            heal_delay_ms: 200,
            buff_delay_ms: 150,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Percent of basic-attack damage healed per Cannibalism level.
    pub cannibalism_heal_percent: u32,
    /// Resistance charges granted per Resistance level at battle start.
    pub resistance_charges_per_level: u32,
    /// Inventing counters needed for one payout.
    pub inventing_threshold: u32,
    /// Cards drawn per inventing payout.
    pub inventing_cards_per_payout: u32,
    pub frost_bite: FrostBiteParams,
    pub battle_cry: BattleCryParams,
    /// HP restored per potion level.
    pub healing_potion_hp: u32,
    /// Percent of basic-attack damage reflected by Thorned Mail.
    pub thorned_mail_reflect_percent: u32,
    pub animation: AnimationParams,
    /// Presentation speed, 100 = normal, 200 = twice as fast.
    pub battle_speed_percent: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            cannibalism_heal_percent: 10,
            resistance_charges_per_level: 1,
            inventing_threshold: 5,
            inventing_cards_per_payout: 1,
            frost_bite: FrostBiteParams::default(),
            battle_cry: BattleCryParams::default(),
            healing_potion_hp: 50,
            thorned_mail_reflect_percent: 20,
            animation: AnimationParams::default(),
            battle_speed_percent: 100,
        }
    }
}

impl BattleConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inventing_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "inventing_threshold",
                reason: "must be at least 1",
            });
        }
        if self.battle_speed_percent == 0 {
            return Err(ConfigError::Invalid {
                field: "battle_speed_percent",
                reason: "must be at least 1",
            });
        }
        if self.frost_bite.freeze_chance_percent > 100 {
            return Err(ConfigError::Invalid {
                field: "frost_bite.freeze_chance_percent",
                reason: "must be between 0 and 100",
            });
        }
        if self.battle_cry.marker_stacks == 0 {
            return Err(ConfigError::Invalid {
                field: "battle_cry.marker_stacks",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// FNV-1a over every gameplay value, for handshake comparison.
    ///
    /// Animation pacing and battle speed are per-player and excluded: two
    /// peers may watch at different speeds.
    pub fn content_hash(&self) -> u64 {
        let Self {
            cannibalism_heal_percent,
            resistance_charges_per_level,
            inventing_threshold,
            inventing_cards_per_payout,
            frost_bite:
                FrostBiteParams {
                    base_damage,
                    damage_per_level,
                    freeze_chance_percent,
                    freeze_stacks,
                },
            battle_cry:
                BattleCryParams {
                    attack_bonus,
                    marker_stacks,
                },
            healing_potion_hp,
            thorned_mail_reflect_percent,
            animation: _,
            battle_speed_percent: _,
        } = self;
        let mut h = Fnv::new();
        for value in [
            cannibalism_heal_percent,
            resistance_charges_per_level,
            inventing_threshold,
            inventing_cards_per_payout,
            base_damage,
            damage_per_level,
            freeze_chance_percent,
            freeze_stacks,
            attack_bonus,
            marker_stacks,
            healing_potion_hp,
            thorned_mail_reflect_percent,
        ] {
            h.write_u32(*value);
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = BattleConfig::from_json("{}").unwrap();
        assert_eq!(config, BattleConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            BattleConfig::from_json(r#"{"frost_bite":{"freeze_chance_percent":100}}"#).unwrap();
        assert_eq!(config.frost_bite.freeze_chance_percent, 100);
        assert_eq!(config.frost_bite.base_damage, 20);
        assert_eq!(config.cannibalism_heal_percent, 10);
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = BattleConfig::from_json(r#"{"inventing_threshold":0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "inventing_threshold",
                ..
            }
        ));
    }

    #[test]
    fn zero_battle_cry_stacks_are_rejected() {
        let err =
            BattleConfig::from_json(r#"{"battle_cry":{"marker_stacks":0}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "battle_cry.marker_stacks",
                ..
            }
        ));
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        assert!(matches!(
            BattleConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn content_hash_ignores_cosmetic_fields() {
        let base = BattleConfig::default();
        let faster = BattleConfig {
            battle_speed_percent: 300,
            animation: AnimationParams {
                strike_delay_ms: 1,
                ..AnimationParams::default()
            },
            ..BattleConfig::default()
        };
        assert_eq!(base.content_hash(), faster.content_hash());

        let rebalanced = BattleConfig {
            cannibalism_heal_percent: 15,
            ..BattleConfig::default()
        };
        assert_ne!(base.content_hash(), rebalanced.content_hash());

        let colder = BattleConfig {
            frost_bite: FrostBiteParams {
                freeze_stacks: 2,
                ..FrostBiteParams::default()
            },
            ..BattleConfig::default()
        };
        assert_ne!(base.content_hash(), colder.content_hash());
    }

    #[test]
    fn json_roundtrip_preserves_values() {
        let config = BattleConfig {
            healing_potion_hp: 75,
            ..BattleConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(BattleConfig::from_json(&json).unwrap(), config);
    }
}

// Typed capability and marker vocabulary.
//
// Abilities, artifacts, creature specials and status effects are closed
// enums rather than name strings, so a content module that matches on them
// gets an exhaustiveness check from the compiler. All of them serialize as
// snake_case for config files, combat-log fields and checksum input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Hero abilities that participate in replicated effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Resistance,
    Cannibalism,
    Inventing,
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resistance => "resistance",
            Self::Cannibalism => "cannibalism",
            Self::Inventing => "inventing",
        })
    }
}

/// Per-hero ability levels. A level of zero means the hero lacks it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySet {
    levels: BTreeMap<Ability, u32>,
}

impl AbilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ability: Ability, level: u32) -> Self {
        self.set_level(ability, level);
        self
    }

    pub fn set_level(&mut self, ability: Ability, level: u32) {
        if level == 0 {
            self.levels.remove(&ability);
        } else {
            self.levels.insert(ability, level);
        }
    }

    pub fn level(&self, ability: Ability) -> u32 {
        self.levels.get(&ability).copied().unwrap_or(0)
    }

    pub fn has(&self, ability: Ability) -> bool {
        self.level(ability) > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ability, u32)> + '_ {
        self.levels.iter().map(|(&a, &l)| (a, l))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    ThornedMail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatureSpecial {
    FrostBite,
}

/// Stackable status effects and markers.
///
/// `ResistanceCharge` tracks the remaining spell negations granted by the
/// Resistance ability. `Emboldened` is the battle cry marker that prevents a
/// target from being buffed twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEffect {
    ResistanceCharge,
    Frozen,
    Burned,
    Stunned,
    Emboldened,
}

impl fmt::Display for StatusEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ResistanceCharge => "resistance charge",
            Self::Frozen => "frozen",
            Self::Burned => "burned",
            Self::Stunned => "stunned",
            Self::Emboldened => "emboldened",
        })
    }
}

/// Named per-hero counters that are not status effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    Inventing,
}

/// Severity of a combat log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Success,
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_level_removes_ability() {
        let mut set = AbilitySet::new().with(Ability::Cannibalism, 2);
        assert!(set.has(Ability::Cannibalism));
        assert_eq!(set.level(Ability::Cannibalism), 2);
        set.set_level(Ability::Cannibalism, 0);
        assert!(!set.has(Ability::Cannibalism));
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn missing_ability_is_level_zero() {
        let set = AbilitySet::new().with(Ability::Inventing, 3);
        assert_eq!(set.level(Ability::Resistance), 0);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StatusEffect::ResistanceCharge).unwrap(),
            r#""resistance_charge""#
        );
    }
}

// Heroes, creatures, and the addressing used to reach them.
//
// A hero occupies one formation slot and owns an ordered list of creatures.
// Creature indices are positions in that list; removing a creature shifts
// the ones after it, which is why a stale `creature_index` in an envelope
// can legitimately fail to resolve.
//
// `Vitals` is the only place HP is mutated. Every setter clamps to
// `[0, max_hp]` and keeps `alive` consistent with `current_hp`, so neither
// host computation nor guest replication can produce an out-of-range value.
//
// `EntityAddress` is the local-perspective twin of the wire `EntityRef`: it
// names an entity by `LocalSide`, which is what battle code naturally has in
// hand. The locator converts between the two.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EntityKind, LocalSide, Position};

use crate::status::StatusEffects;
use crate::types::{AbilitySet, Artifact, CounterKind, CreatureSpecial};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    current_hp: u32,
    max_hp: u32,
    alive: bool,
}

impl Vitals {
    pub fn new(max_hp: u32) -> Self {
        Self {
            current_hp: max_hp,
            max_hp,
            alive: max_hp > 0,
        }
    }

    pub fn current_hp(&self) -> u32 {
        self.current_hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    /// Write an absolute HP value, clamped. Reaching zero kills.
    pub fn set_hp(&mut self, hp: u32) {
        self.current_hp = hp.min(self.max_hp);
        if self.current_hp == 0 {
            self.alive = false;
        }
    }

    /// Write HP and liveness exactly as the host reported them. Used by
    /// guest replication, where `alive` is part of the outcome.
    pub fn set_state(&mut self, hp: u32, alive: bool) {
        self.current_hp = hp.min(self.max_hp);
        self.alive = alive && self.current_hp > 0;
    }

    /// Subtract damage, clamped at zero. Returns the HP actually lost.
    pub fn damage(&mut self, amount: u32) -> u32 {
        let before = self.current_hp;
        self.set_hp(before.saturating_sub(amount));
        before - self.current_hp
    }

    /// Add healing, clamped at `max_hp`. Returns the HP actually gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.current_hp;
        self.set_hp(before.saturating_add(amount));
        self.current_hp - before
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    pub name: String,
    pub vitals: Vitals,
    pub attack: u32,
    pub level: u32,
    pub special: Option<CreatureSpecial>,
    pub statuses: StatusEffects,
}

impl Creature {
    pub fn new(name: impl Into<String>, max_hp: u32, attack: u32) -> Self {
        Self {
            name: name.into(),
            vitals: Vitals::new(max_hp),
            attack,
            level: 1,
            special: None,
            statuses: StatusEffects::new(),
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_special(mut self, special: CreatureSpecial) -> Self {
        self.special = Some(special);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub name: String,
    pub vitals: Vitals,
    pub attack: u32,
    pub abilities: AbilitySet,
    pub artifacts: Vec<Artifact>,
    pub statuses: StatusEffects,
    pub counters: BTreeMap<CounterKind, u32>,
    pub creatures: Vec<Creature>,
}

impl Hero {
    pub fn new(name: impl Into<String>, max_hp: u32, attack: u32) -> Self {
        Self {
            name: name.into(),
            vitals: Vitals::new(max_hp),
            attack,
            abilities: AbilitySet::new(),
            artifacts: Vec::new(),
            statuses: StatusEffects::new(),
            counters: BTreeMap::new(),
            creatures: Vec::new(),
        }
    }

    pub fn with_abilities(mut self, abilities: AbilitySet) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_creature(mut self, creature: Creature) -> Self {
        self.creatures.push(creature);
        self
    }

    pub fn has_artifact(&self, artifact: Artifact) -> bool {
        self.artifacts.contains(&artifact)
    }

    pub fn counter(&self, kind: CounterKind) -> u32 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    pub fn set_counter(&mut self, kind: CounterKind, value: u32) {
        if value == 0 {
            self.counters.remove(&kind);
        } else {
            self.counters.insert(kind, value);
        }
    }
}

/// Local-perspective address of a hero or creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityAddress {
    pub side: LocalSide,
    pub position: Position,
    pub kind: EntityKind,
}

impl EntityAddress {
    pub const fn hero(side: LocalSide, position: Position) -> Self {
        Self {
            side,
            position,
            kind: EntityKind::Hero,
        }
    }

    pub const fn creature(side: LocalSide, position: Position, index: u32) -> Self {
        Self {
            side,
            position,
            kind: EntityKind::Creature { index },
        }
    }

    /// Address of the hero that owns this entity (itself, for heroes).
    pub fn owner(self) -> Self {
        Self::hero(self.side, self.position)
    }
}

/// Shared borrow of a resolved entity.
#[derive(Clone, Copy, Debug)]
pub enum EntityView<'a> {
    Hero(&'a Hero),
    Creature(&'a Creature),
}

impl<'a> EntityView<'a> {
    pub fn vitals(&self) -> &'a Vitals {
        match self {
            Self::Hero(h) => &h.vitals,
            Self::Creature(c) => &c.vitals,
        }
    }

    pub fn statuses(&self) -> &'a StatusEffects {
        match self {
            Self::Hero(h) => &h.statuses,
            Self::Creature(c) => &c.statuses,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Hero(h) => &h.name,
            Self::Creature(c) => &c.name,
        }
    }

    pub fn attack(&self) -> u32 {
        match self {
            Self::Hero(h) => h.attack,
            Self::Creature(c) => c.attack,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.vitals().alive()
    }

    pub fn as_hero(&self) -> Option<&'a Hero> {
        match self {
            Self::Hero(h) => Some(h),
            Self::Creature(_) => None,
        }
    }

    pub fn as_creature(&self) -> Option<&'a Creature> {
        match self {
            Self::Hero(_) => None,
            Self::Creature(c) => Some(c),
        }
    }
}

/// Exclusive borrow of a resolved entity.
#[derive(Debug)]
pub enum EntityMut<'a> {
    Hero(&'a mut Hero),
    Creature(&'a mut Creature),
}

impl EntityMut<'_> {
    pub fn vitals(&mut self) -> &mut Vitals {
        match self {
            Self::Hero(h) => &mut h.vitals,
            Self::Creature(c) => &mut c.vitals,
        }
    }

    pub fn statuses(&mut self) -> &mut StatusEffects {
        match self {
            Self::Hero(h) => &mut h.statuses,
            Self::Creature(c) => &mut c.statuses,
        }
    }

    pub fn attack_mut(&mut self) -> &mut u32 {
        match self {
            Self::Hero(h) => &mut h.attack,
            Self::Creature(c) => &mut c.attack,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Hero(h) => &h.name,
            Self::Creature(c) => &c.name,
        }
    }

    pub fn as_hero_mut(&mut self) -> Option<&mut Hero> {
        match self {
            Self::Hero(h) => Some(h),
            Self::Creature(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_and_kills() {
        let mut v = Vitals::new(30);
        assert_eq!(v.damage(12), 12);
        assert_eq!(v.current_hp(), 18);
        assert!(v.alive());
        assert_eq!(v.damage(100), 18);
        assert_eq!(v.current_hp(), 0);
        assert!(!v.alive());
    }

    #[test]
    fn heal_clamps_to_max() {
        let mut v = Vitals::new(100);
        v.set_hp(94);
        assert_eq!(v.heal(14), 6);
        assert_eq!(v.current_hp(), 100);
    }

    #[test]
    fn set_hp_above_max_is_clamped() {
        let mut v = Vitals::new(50);
        v.set_hp(500);
        assert_eq!(v.current_hp(), 50);
    }

    #[test]
    fn set_state_never_reports_alive_at_zero() {
        let mut v = Vitals::new(50);
        v.set_state(0, true);
        assert!(!v.alive());
        v.set_state(20, false);
        assert_eq!(v.current_hp(), 20);
        assert!(!v.alive());
    }

    #[test]
    fn zero_counter_is_removed() {
        let mut hero = Hero::new("Tinker", 80, 5);
        hero.set_counter(CounterKind::Inventing, 4);
        assert_eq!(hero.counter(CounterKind::Inventing), 4);
        hero.set_counter(CounterKind::Inventing, 0);
        assert!(hero.counters.is_empty());
    }

    #[test]
    fn owner_of_creature_is_its_hero() {
        let addr = EntityAddress::creature(LocalSide::Opponent, Position::Right, 2);
        assert_eq!(
            addr.owner(),
            EntityAddress::hero(LocalSide::Opponent, Position::Right)
        );
    }
}

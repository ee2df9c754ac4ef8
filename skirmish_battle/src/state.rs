// Battle state as seen by one peer.
//
// Heroes are keyed by `(LocalSide, Position)`: each peer stores the battle
// from its own perspective, so the host's `Player` heroes are the guest's
// `Opponent` heroes and vice versa. `mirrored()` produces the other peer's
// view of the same battle and is how tests (and the demo setup) build a
// consistent guest state from a host state.
//
// `checksum(me)` hashes the state in *absolute* order (host side first, then
// guest side) so that two peers in sync produce the same value even though
// their maps are keyed differently. Only gameplay fields enter the hash:
// names, HP, liveness, attack, ability levels, artifacts, statuses, counters
// and creature lists. The hash is FNV-1a over a fixed little-endian
// encoding, which is stable across platforms.
//
// All collections are `BTreeMap`s or sorted vectors so iteration order is
// deterministic.

use std::collections::BTreeMap;

use skirmish_protocol::{AbsoluteSide, LocalSide, Position};
use tracing::debug;

use crate::config::BattleConfig;
use crate::entity::{Creature, Hero};
use crate::status::StatusEffects;
use crate::types::{Ability, StatusEffect};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a accumulator.
pub(crate) struct Fnv(u64);

impl Fnv {
    pub(crate) fn new() -> Self {
        Self(FNV_OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write(s.as_bytes());
    }

    fn write_statuses(&mut self, statuses: &StatusEffects) {
        self.write_u32(statuses.iter().count() as u32);
        for (effect, stacks) in statuses.iter() {
            self.write_u8(effect as u8);
            self.write_u32(stacks);
        }
    }

    pub(crate) fn finish(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BattleState {
    heroes: BTreeMap<(LocalSide, Position), Hero>,
}

impl BattleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a hero, replacing whatever occupied the slot.
    pub fn insert_hero(&mut self, side: LocalSide, position: Position, hero: Hero) -> Option<Hero> {
        self.heroes.insert((side, position), hero)
    }

    pub fn with_hero(mut self, side: LocalSide, position: Position, hero: Hero) -> Self {
        self.insert_hero(side, position, hero);
        self
    }

    pub fn hero(&self, side: LocalSide, position: Position) -> Option<&Hero> {
        self.heroes.get(&(side, position))
    }

    pub fn hero_mut(&mut self, side: LocalSide, position: Position) -> Option<&mut Hero> {
        self.heroes.get_mut(&(side, position))
    }

    pub fn heroes(&self) -> impl Iterator<Item = ((LocalSide, Position), &Hero)> {
        self.heroes.iter().map(|(&k, v)| (k, v))
    }

    /// Heroes on one side, in formation order.
    pub fn side(&self, side: LocalSide) -> impl Iterator<Item = (Position, &Hero)> {
        Position::ALL
            .into_iter()
            .filter_map(move |pos| self.hero(side, pos).map(|h| (pos, h)))
    }

    /// The same battle as seen from the other peer.
    pub fn mirrored(&self) -> Self {
        Self {
            heroes: self
                .heroes
                .iter()
                .map(|(&(side, pos), hero)| ((side.opposite(), pos), hero.clone()))
                .collect(),
        }
    }

    /// Remove a creature from its hero's list, shifting later indices down.
    pub fn remove_creature(
        &mut self,
        side: LocalSide,
        position: Position,
        index: u32,
    ) -> Option<Creature> {
        let hero = self.hero_mut(side, position)?;
        let index = index as usize;
        if index < hero.creatures.len() {
            Some(hero.creatures.remove(index))
        } else {
            None
        }
    }

    /// Start-of-battle setup run identically on both peers: grant each
    /// Resistance hero its spell-negation charges.
    pub fn arm_start_of_battle(&mut self, config: &BattleConfig) {
        for ((side, pos), hero) in self.heroes.iter_mut() {
            let level = hero.abilities.level(Ability::Resistance);
            if level > 0 {
                let charges = level.saturating_mul(config.resistance_charges_per_level);
                hero.statuses.set(StatusEffect::ResistanceCharge, charges);
                debug!(?side, ?pos, hero = %hero.name, charges, "resistance armed");
            }
        }
    }

    /// Perspective-independent hash of all gameplay fields.
    pub fn checksum(&self, me: AbsoluteSide) -> u64 {
        let mut h = Fnv::new();
        for absolute in [AbsoluteSide::Host, AbsoluteSide::Guest] {
            let local = absolute.to_local(me);
            for pos in Position::ALL {
                let Some(hero) = self.hero(local, pos) else {
                    continue;
                };
                h.write_u8(absolute as u8);
                h.write_u8(pos as u8);
                hash_hero(&mut h, hero);
            }
        }
        h.finish()
    }
}

fn hash_hero(h: &mut Fnv, hero: &Hero) {
    h.write_str(&hero.name);
    h.write_u32(hero.vitals.current_hp());
    h.write_u32(hero.vitals.max_hp());
    h.write_u8(u8::from(hero.vitals.alive()));
    h.write_u32(hero.attack);
    for (ability, level) in hero.abilities.iter() {
        h.write_u8(ability as u8);
        h.write_u32(level);
    }
    h.write_u32(hero.artifacts.len() as u32);
    for &artifact in &hero.artifacts {
        h.write_u8(artifact as u8);
    }
    h.write_statuses(&hero.statuses);
    for (&kind, &value) in &hero.counters {
        h.write_u8(kind as u8);
        h.write_u32(value);
    }
    h.write_u32(hero.creatures.len() as u32);
    for creature in &hero.creatures {
        h.write_str(&creature.name);
        h.write_u32(creature.vitals.current_hp());
        h.write_u32(creature.vitals.max_hp());
        h.write_u8(u8::from(creature.vitals.alive()));
        h.write_u32(creature.attack);
        h.write_u32(creature.level);
        h.write_statuses(&creature.statuses);
    }
}

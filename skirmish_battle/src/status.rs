// Per-entity status effect stacks.
//
// Every hero and creature owns a `StatusEffects`. Entities rarely carry more
// than a handful of effects, so storage is an inline `SmallVec` of
// `(StatusEffect, stacks)` pairs kept sorted by effect; iteration order is
// therefore deterministic, which the state checksum relies on.
//
// Stack counts never go negative. An effect whose stacks reach zero is
// removed outright, so `has` and `stacks() > 0` always agree.
//
// Host code uses `apply` / `consume`. Guest replication uses `set`, which
// writes an absolute count received from the host.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::types::StatusEffect;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffects {
    entries: SmallVec<[(StatusEffect, u32); 4]>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, effect: StatusEffect) -> Result<usize, usize> {
        self.entries.binary_search_by(|(e, _)| e.cmp(&effect))
    }

    pub fn stacks(&self, effect: StatusEffect) -> u32 {
        match self.find(effect) {
            Ok(i) => self.entries[i].1,
            Err(_) => 0,
        }
    }

    pub fn has(&self, effect: StatusEffect) -> bool {
        self.stacks(effect) > 0
    }

    /// Add `stacks` to the effect, returning the new total.
    pub fn apply(&mut self, effect: StatusEffect, stacks: u32) -> u32 {
        let total = self.stacks(effect).saturating_add(stacks);
        self.set(effect, total);
        total
    }

    /// Overwrite the stack count. Zero removes the effect.
    pub fn set(&mut self, effect: StatusEffect, stacks: u32) {
        match (self.find(effect), stacks) {
            (Ok(i), 0) => {
                self.entries.remove(i);
            }
            (Ok(i), n) => self.entries[i].1 = n,
            (Err(_), 0) => {}
            (Err(i), n) => self.entries.insert(i, (effect, n)),
        }
    }

    pub fn remove(&mut self, effect: StatusEffect) -> bool {
        match self.find(effect) {
            Ok(i) => {
                self.entries.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Spend one stack. Returns the remaining count, or `None` if there was
    /// nothing to spend.
    pub fn consume(&mut self, effect: StatusEffect) -> Option<u32> {
        let current = self.stacks(effect);
        if current == 0 {
            return None;
        }
        let remaining = current - 1;
        self.set(effect, remaining);
        Some(remaining)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatusEffect, u32)> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_accumulates() {
        let mut s = StatusEffects::new();
        assert_eq!(s.apply(StatusEffect::Frozen, 1), 1);
        assert_eq!(s.apply(StatusEffect::Frozen, 2), 3);
        assert!(s.has(StatusEffect::Frozen));
        assert!(!s.has(StatusEffect::Burned));
    }

    #[test]
    fn consume_floors_at_zero() {
        let mut s = StatusEffects::new();
        s.apply(StatusEffect::ResistanceCharge, 1);
        assert_eq!(s.consume(StatusEffect::ResistanceCharge), Some(0));
        assert_eq!(s.consume(StatusEffect::ResistanceCharge), None);
        assert_eq!(s.stacks(StatusEffect::ResistanceCharge), 0);
        assert!(!s.has(StatusEffect::ResistanceCharge));
    }

    #[test]
    fn set_zero_removes() {
        let mut s = StatusEffects::new();
        s.set(StatusEffect::Stunned, 4);
        s.set(StatusEffect::Stunned, 0);
        assert_eq!(s.iter().count(), 0);
        s.set(StatusEffect::Stunned, 0);
        assert_eq!(s.iter().count(), 0);
    }

    #[test]
    fn iteration_is_sorted_regardless_of_insert_order() {
        let mut a = StatusEffects::new();
        a.apply(StatusEffect::Emboldened, 1);
        a.apply(StatusEffect::Frozen, 2);
        let mut b = StatusEffects::new();
        b.apply(StatusEffect::Frozen, 2);
        b.apply(StatusEffect::Emboldened, 1);
        assert_eq!(a, b);
        assert_eq!(
            a.iter().collect::<Vec<_>>(),
            vec![(StatusEffect::Frozen, 2), (StatusEffect::Emboldened, 1)]
        );
    }

    #[test]
    fn remove_reports_presence() {
        let mut s = StatusEffects::new();
        assert!(!s.remove(StatusEffect::Burned));
        s.apply(StatusEffect::Burned, 1);
        assert!(s.remove(StatusEffect::Burned));
    }
}

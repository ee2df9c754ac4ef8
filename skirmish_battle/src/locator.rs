// EntityLocator: wire references <-> local entities.
//
// `resolve` / `resolve_mut` turn an `EntityRef` received from the other
// peer into a borrow of the matching hero or creature in *this* peer's
// state. The absolute side is first converted to a local side using the
// caller's own absolute side; the rest is a map lookup and, for creatures,
// an index into the hero's creature list.
//
// Absence is a normal outcome (the slot is empty, or the creature died and
// the list shifted), so these functions return `Option` and log at debug.
// The caller decides whether that is worth a warning.
//
// `reference_for` is the inverse, used on the host when building envelopes.

use skirmish_protocol::{AbsoluteSide, EntityKind, EntityRef};
use tracing::debug;

use crate::entity::{EntityAddress, EntityMut, EntityView};
use crate::state::BattleState;

/// Local address of a wire reference.
pub fn address_of(r: EntityRef, me: AbsoluteSide) -> EntityAddress {
    EntityAddress {
        side: r.absolute_side.to_local(me),
        position: r.position,
        kind: r.kind,
    }
}

/// Wire reference of a local address.
pub fn reference_for(addr: EntityAddress, me: AbsoluteSide) -> EntityRef {
    EntityRef {
        absolute_side: addr.side.to_absolute(me),
        position: addr.position,
        kind: addr.kind,
    }
}

pub fn resolve(r: EntityRef, me: AbsoluteSide, state: &BattleState) -> Option<EntityView<'_>> {
    let view = lookup(address_of(r, me), state);
    if view.is_none() {
        debug!(target_ref = %r, "entity reference did not resolve");
    }
    view
}

pub fn resolve_mut(
    r: EntityRef,
    me: AbsoluteSide,
    state: &mut BattleState,
) -> Option<EntityMut<'_>> {
    let entity = lookup_mut(address_of(r, me), state);
    if entity.is_none() {
        debug!(target_ref = %r, "entity reference did not resolve");
    }
    entity
}

/// Resolve a local address directly.
pub fn lookup(addr: EntityAddress, state: &BattleState) -> Option<EntityView<'_>> {
    let hero = state.hero(addr.side, addr.position)?;
    match addr.kind {
        EntityKind::Hero => Some(EntityView::Hero(hero)),
        EntityKind::Creature { index } => hero
            .creatures
            .get(index as usize)
            .map(EntityView::Creature),
    }
}

pub fn lookup_mut(addr: EntityAddress, state: &mut BattleState) -> Option<EntityMut<'_>> {
    let hero = state.hero_mut(addr.side, addr.position)?;
    match addr.kind {
        EntityKind::Hero => Some(EntityMut::Hero(hero)),
        EntityKind::Creature { index } => hero
            .creatures
            .get_mut(index as usize)
            .map(EntityMut::Creature),
    }
}

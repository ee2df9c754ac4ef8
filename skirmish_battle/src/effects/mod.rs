// Content modules: host-side effect computers and their guest handlers.
//
// Each submodule owns one effect type and follows the same shape:
//
// - an `EffectType` constant and a typed outcome struct (serde);
// - one `authoritative_*` function, run only on the host, that checks
//   preconditions, computes the result (rolling the host PRNG if needed),
//   mutates host state, emits local presentation, and publishes exactly one
//   envelope. On a failed precondition it returns `EffectSkip` having done
//   nothing;
// - a unit struct implementing `ReplicatedEffect`, which validates the
//   envelope against guest state and then writes the outcome's final
//   values.
//
// The helpers below carry the plumbing that every module would otherwise
// repeat: authority checks, skip logging, envelope dispatch, and reference
// resolution on the guest.

pub mod battle_cry;
pub mod cannibalism;
pub mod damage;
pub mod frost_bite;
pub mod healing_potion;
pub mod inventing;
pub mod resistance;
pub mod thorned_mail;

use serde::Serialize;
use skirmish_protocol::{EffectType, EntityRef, UpdateEnvelope};
use tracing::{debug, error};

use crate::context::{BattleContext, PresentationEvent, VisualCue};
use crate::entity::{EntityAddress, EntityMut, EntityView, Vitals};
use crate::envelope::build_envelope;
use crate::error::{EffectSkip, ReplicationError};
use crate::locator;
use crate::replicator::GuestReplicator;
use crate::state::BattleState;

/// Register the guest handler of every built-in effect.
pub fn register_all(replicator: &mut GuestReplicator) {
    replicator.register_effect::<damage::DamageApplied>();
    replicator.register_effect::<damage::CreatureRemoved>();
    replicator.register_effect::<resistance::ResistanceUsed>();
    replicator.register_effect::<cannibalism::CannibalismHealing>();
    replicator.register_effect::<inventing::InventingCounters>();
    replicator.register_effect::<frost_bite::FrostBite>();
    replicator.register_effect::<battle_cry::BattleCry>();
    replicator.register_effect::<healing_potion::HealingPotion>();
    replicator.register_effect::<thorned_mail::ThornedMailReflect>();
}

/// Log a skip and pass the result through.
pub(crate) fn logged<T>(
    effect_type: &EffectType,
    result: Result<T, EffectSkip>,
) -> Result<T, EffectSkip> {
    if let Err(reason) = &result {
        match reason {
            EffectSkip::MissingCollaborator(_) => {
                error!(%effect_type, %reason, "effect abandoned");
            }
            _ => debug!(%effect_type, %reason, "effect skipped"),
        }
    }
    result
}

pub(crate) fn require_authority(ctx: &BattleContext) -> Result<(), EffectSkip> {
    if ctx.is_authoritative() {
        Ok(())
    } else {
        Err(EffectSkip::NotAuthoritative)
    }
}

/// Resolve a host-local address that must exist and be alive.
pub(crate) fn living(
    state: &BattleState,
    addr: EntityAddress,
    missing: EffectSkip,
    dead: EffectSkip,
) -> Result<EntityView<'_>, EffectSkip> {
    let entity = locator::lookup(addr, state).ok_or(missing)?;
    if entity.is_alive() { Ok(entity) } else { Err(dead) }
}

/// Host-local mutable lookup of an address already validated.
pub(crate) fn entity_mut(
    state: &mut BattleState,
    addr: EntityAddress,
) -> Result<EntityMut<'_>, EffectSkip> {
    locator::lookup_mut(addr, state).ok_or(EffectSkip::TargetMissing)
}

/// Build and send an envelope. State has already changed at this point,
/// so failures are logged, not returned.
pub(crate) fn publish<O: Serialize>(
    ctx: &mut BattleContext,
    effect_type: EffectType,
    source: Option<EntityAddress>,
    target: Option<EntityAddress>,
    outcome: &O,
) {
    match build_envelope(effect_type.clone(), source, target, outcome, ctx.my_side()) {
        Ok(envelope) => {
            ctx.publish(envelope);
        }
        Err(e) => error!(%effect_type, error = %e, "could not encode outcome"),
    }
}

pub(crate) fn health_changed(ctx: &mut BattleContext, entity: EntityAddress, vitals: &Vitals) {
    ctx.push_presentation(PresentationEvent::HealthChanged {
        entity,
        current_hp: vitals.current_hp(),
        max_hp: vitals.max_hp(),
    });
}

pub(crate) fn cue(ctx: &mut BattleContext, entity: EntityAddress, cue: VisualCue, base_ms: u64) {
    let delay = ctx.speed_adjusted_delay(base_ms);
    ctx.push_presentation(PresentationEvent::Cue { entity, cue, delay });
}

pub(crate) fn target_ref(envelope: &UpdateEnvelope) -> Result<EntityRef, ReplicationError> {
    envelope
        .target()
        .ok_or(ReplicationError::MissingReference("target"))
}

/// Guest-side check of the envelope's source, if it names one. Runs before
/// any mutation. Returns the source's name for the combat log.
pub(crate) fn resolve_source(
    envelope: &UpdateEnvelope,
    state: &BattleState,
    ctx: &BattleContext,
) -> Result<Option<String>, ReplicationError> {
    let Some(r) = envelope.source() else {
        return Ok(None);
    };
    let entity =
        locator::resolve(r, ctx.my_side(), state).ok_or(ReplicationError::SourceNotFound(r))?;
    Ok(Some(entity.name().to_owned()))
}

/// Like `resolve_source`, for effects the host always publishes with one.
pub(crate) fn required_source(
    envelope: &UpdateEnvelope,
    state: &BattleState,
    ctx: &BattleContext,
) -> Result<String, ReplicationError> {
    resolve_source(envelope, state, ctx)?.ok_or(ReplicationError::MissingReference("source"))
}

/// Guest-side resolution of the envelope's target.
pub(crate) fn resolve_target<'s>(
    envelope: &UpdateEnvelope,
    state: &'s mut BattleState,
    ctx: &BattleContext,
) -> Result<(EntityAddress, EntityMut<'s>), ReplicationError> {
    let r = target_ref(envelope)?;
    let entity =
        locator::resolve_mut(r, ctx.my_side(), state).ok_or(ReplicationError::TargetNotFound(r))?;
    Ok((locator::address_of(r, ctx.my_side()), entity))
}

// Battle cry: a mass-buff spell over the caster's whole side.
//
// Every living hero and creature on the caster's side that is not already
// `Emboldened` gains `attack_bonus` attack and the marker. The envelope
// lists each buffed entity with its final attack value, so the guest
// overwrites attack instead of adding a bonus a second time.
//
// On the guest, every listed reference is resolved before anything is
// written. A single stale reference drops the whole envelope.

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EffectType, EntityKind, EntityRef, UpdateEnvelope};

use super::{cue, living, logged, publish, require_authority, required_source};
use crate::context::{BattleContext, PresentationEvent, VisualCue};
use crate::entity::EntityAddress;
use crate::error::{EffectSkip, ReplicationError};
use crate::locator;
use crate::replicator::ReplicatedEffect;
use crate::state::BattleState;
use crate::types::{LogSeverity, StatusEffect};

pub const BATTLE_CRY: EffectType = EffectType::from_static("battle_cry");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffedTarget {
    pub entity: EntityRef,
    pub attack: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleCryOutcome {
    pub targets: Vec<BuffedTarget>,
    /// `Emboldened` stacks each target now carries.
    pub stacks: u32,
}

pub fn authoritative_battle_cry(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    caster: EntityAddress,
) -> Result<BattleCryOutcome, EffectSkip> {
    logged(&BATTLE_CRY, battle_cry(state, ctx, caster))
}

/// Living allies of `side` that don't carry the marker yet, in formation
/// order with each hero before its creatures.
fn eligible(state: &BattleState, caster: EntityAddress) -> Vec<EntityAddress> {
    let mut out = Vec::new();
    for (pos, hero) in state.side(caster.side) {
        if hero.vitals.alive() && !hero.statuses.has(StatusEffect::Emboldened) {
            out.push(EntityAddress::hero(caster.side, pos));
        }
        for (i, creature) in hero.creatures.iter().enumerate() {
            if creature.vitals.alive() && !creature.statuses.has(StatusEffect::Emboldened) {
                out.push(EntityAddress::creature(caster.side, pos, i as u32));
            }
        }
    }
    out
}

fn battle_cry(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    caster: EntityAddress,
) -> Result<BattleCryOutcome, EffectSkip> {
    require_authority(ctx)?;
    if caster.kind != EntityKind::Hero {
        return Err(EffectSkip::IllegalTarget("only heroes cast spells"));
    }
    let caster_name = living(state, caster, EffectSkip::SourceMissing, EffectSkip::SourceDead)?
        .name()
        .to_owned();
    let addresses = eligible(state, caster);
    if addresses.is_empty() {
        return Err(EffectSkip::NothingToDo);
    }

    let params = ctx.config().battle_cry.clone();
    let me = ctx.my_side();
    let mut targets = Vec::with_capacity(addresses.len());
    for addr in addresses {
        let Some(mut entity) = locator::lookup_mut(addr, state) else {
            continue;
        };
        let attack = entity.attack_mut();
        *attack = attack.saturating_add(params.attack_bonus);
        let attack = *attack;
        entity
            .statuses()
            .set(StatusEffect::Emboldened, params.marker_stacks);
        targets.push(BuffedTarget {
            entity: locator::reference_for(addr, me),
            attack,
        });
        ctx.push_presentation(PresentationEvent::StatusChanged {
            entity: addr,
            effect: StatusEffect::Emboldened,
            stacks: params.marker_stacks,
        });
        let buff_ms = ctx.config().animation.buff_delay_ms;
        cue(ctx, addr, VisualCue::Rally, buff_ms);
    }

    log_cry(ctx, &caster_name, targets.len());
    let outcome = BattleCryOutcome {
        targets,
        stacks: params.marker_stacks,
    };
    publish(ctx, BATTLE_CRY, Some(caster), None, &outcome);
    Ok(outcome)
}

fn log_cry(ctx: &mut BattleContext, caster: &str, emboldened: usize) {
    ctx.add_combat_log(
        format!("{caster} lets out a battle cry! {emboldened} allies emboldened"),
        LogSeverity::Success,
    );
}

pub struct BattleCry;

impl ReplicatedEffect for BattleCry {
    const EFFECT_TYPE: EffectType = BATTLE_CRY;
    type Outcome = BattleCryOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: BattleCryOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let caster_name = required_source(envelope, state, ctx)?;
        let me = ctx.my_side();
        if let Some(missing) = outcome
            .targets
            .iter()
            .find(|t| locator::resolve(t.entity, me, state).is_none())
        {
            return Err(ReplicationError::TargetNotFound(missing.entity));
        }

        for target in &outcome.targets {
            let addr = locator::address_of(target.entity, me);
            let Some(mut entity) = locator::lookup_mut(addr, state) else {
                continue;
            };
            *entity.attack_mut() = target.attack;
            entity
                .statuses()
                .set(StatusEffect::Emboldened, outcome.stacks);
            ctx.push_presentation(PresentationEvent::StatusChanged {
                entity: addr,
                effect: StatusEffect::Emboldened,
                stacks: outcome.stacks,
            });
            let buff_ms = ctx.config().animation.buff_delay_ms;
            cue(ctx, addr, VisualCue::Rally, buff_ms);
        }
        log_cry(ctx, &caster_name, outcome.targets.len());
        Ok(())
    }
}

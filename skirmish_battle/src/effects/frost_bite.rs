// Frost bite: a creature special attack that may freeze its target.
//
// damage = base_damage + damage_per_level * (level - 1)
//
// If the target survives, the host rolls `freeze_chance_percent` on its own
// PRNG and on success adds `freeze_stacks` of `Frozen`. The guest receives
// the resulting HP, liveness and total frozen stacks and never rolls.

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EffectType, EntityKind, UpdateEnvelope};

use super::damage::{apply_damage_local, log_defeat};
use super::{
    cue, entity_mut, health_changed, living, logged, publish, require_authority,
    required_source, resolve_target,
};
use crate::context::{BattleContext, PresentationEvent, VisualCue};
use crate::entity::EntityAddress;
use crate::error::{EffectSkip, ReplicationError};
use crate::replicator::ReplicatedEffect;
use crate::state::BattleState;
use crate::types::{CreatureSpecial, LogSeverity, StatusEffect};

pub const FROST_BITE: EffectType = EffectType::from_static("frost_bite");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrostBiteOutcome {
    pub amount: u32,
    pub new_hp: u32,
    pub alive: bool,
    pub frozen_stacks: u32,
}

pub fn authoritative_frost_bite(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    attacker: EntityAddress,
    target: EntityAddress,
) -> Result<FrostBiteOutcome, EffectSkip> {
    logged(&FROST_BITE, frost_bite(state, ctx, attacker, target))
}

fn frost_bite(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    attacker: EntityAddress,
    target: EntityAddress,
) -> Result<FrostBiteOutcome, EffectSkip> {
    require_authority(ctx)?;
    if !matches!(attacker.kind, EntityKind::Creature { .. }) {
        return Err(EffectSkip::IllegalTarget("frost bite is a creature attack"));
    }
    let creature = living(state, attacker, EffectSkip::SourceMissing, EffectSkip::SourceDead)?
        .as_creature()
        .ok_or(EffectSkip::SourceMissing)?;
    if creature.special != Some(CreatureSpecial::FrostBite) {
        return Err(EffectSkip::MissingSpecial(CreatureSpecial::FrostBite));
    }
    let attacker_name = creature.name.clone();
    let level = creature.level.max(1);
    let target_name = living(state, target, EffectSkip::TargetMissing, EffectSkip::TargetDead)?
        .name()
        .to_owned();
    if ctx.rng_mut().is_none() {
        return Err(EffectSkip::MissingCollaborator("rng"));
    }

    let params = ctx.config().frost_bite.clone();
    let amount = params
        .base_damage
        .saturating_add(params.damage_per_level.saturating_mul(level - 1));
    let hit = apply_damage_local(state, ctx, target, amount)?;

    let froze = hit.alive
        && ctx
            .rng_mut()
            .is_some_and(|rng| rng.roll_percent(params.freeze_chance_percent));
    let mut entity = entity_mut(state, target)?;
    let frozen_stacks = if froze {
        entity
            .statuses()
            .apply(StatusEffect::Frozen, params.freeze_stacks)
    } else {
        entity.statuses().stacks(StatusEffect::Frozen)
    };

    log_bite(ctx, &attacker_name, &target_name, amount);
    log_defeat(ctx, &target_name, hit.alive);
    if froze {
        ctx.add_combat_log(format!("{target_name} is frozen!"), LogSeverity::Warning);
        ctx.push_presentation(PresentationEvent::StatusChanged {
            entity: target,
            effect: StatusEffect::Frozen,
            stacks: frozen_stacks,
        });
    }
    let strike_ms = ctx.config().animation.strike_delay_ms;
    cue(ctx, target, VisualCue::Frost, strike_ms);

    let outcome = FrostBiteOutcome {
        amount,
        new_hp: hit.new_hp,
        alive: hit.alive,
        frozen_stacks,
    };
    publish(ctx, FROST_BITE, Some(attacker), Some(target), &outcome);
    Ok(outcome)
}

fn log_bite(ctx: &mut BattleContext, attacker: &str, target: &str, amount: u32) {
    ctx.add_combat_log(
        format!("{attacker}'s frost bite deals {amount} damage to {target}"),
        LogSeverity::Info,
    );
}

pub struct FrostBite;

impl ReplicatedEffect for FrostBite {
    const EFFECT_TYPE: EffectType = FROST_BITE;
    type Outcome = FrostBiteOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: FrostBiteOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let attacker_name = required_source(envelope, state, ctx)?;
        let (addr, mut entity) = resolve_target(envelope, state, ctx)?;
        let vitals = entity.vitals();
        vitals.set_state(outcome.new_hp, outcome.alive);
        let vitals = vitals.clone();
        let previous = entity.statuses().stacks(StatusEffect::Frozen);
        entity
            .statuses()
            .set(StatusEffect::Frozen, outcome.frozen_stacks);
        let name = entity.name().to_owned();

        health_changed(ctx, addr, &vitals);
        log_bite(ctx, &attacker_name, &name, outcome.amount);
        log_defeat(ctx, &name, outcome.alive);
        if outcome.frozen_stacks != previous {
            ctx.add_combat_log(format!("{name} is frozen!"), LogSeverity::Warning);
            ctx.push_presentation(PresentationEvent::StatusChanged {
                entity: addr,
                effect: StatusEffect::Frozen,
                stacks: outcome.frozen_stacks,
            });
        }
        let strike_ms = ctx.config().animation.strike_delay_ms;
        cue(ctx, addr, VisualCue::Frost, strike_ms);
        Ok(())
    }
}

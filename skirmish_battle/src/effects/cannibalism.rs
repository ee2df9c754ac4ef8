// Cannibalism: attacking heroes heal a share of the damage they deal.
//
// heal = floor(damage * cannibalism_heal_percent / 100) * level
//
// The floor is applied before multiplying by level, so 37 damage at 10%
// and level 2 heals 3 * 2 = 6, not 7. Healing clamps at max HP and the
// outcome reports the HP actually gained.

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EffectType, EntityKind, UpdateEnvelope};

use super::{
    cue, entity_mut, health_changed, living, logged, publish, require_authority, resolve_target,
};
use crate::context::{BattleContext, VisualCue};
use crate::entity::EntityAddress;
use crate::error::{EffectSkip, ReplicationError};
use crate::replicator::ReplicatedEffect;
use crate::state::BattleState;
use crate::types::{Ability, LogSeverity};

pub const CANNIBALISM_HEALING: EffectType = EffectType::from_static("cannibalism_healing");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannibalismOutcome {
    pub new_hp: u32,
    pub max_hp: u32,
    pub healed: u32,
}

pub fn heal_amount(damage: u32, percent: u32, level: u32) -> u32 {
    let base = u64::from(damage) * u64::from(percent) / 100;
    u32::try_from(base.saturating_mul(u64::from(level))).unwrap_or(u32::MAX)
}

/// Heal `attacker` after its basic attack dealt `damage_dealt`.
pub fn authoritative_cannibalism_heal(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    attacker: EntityAddress,
    damage_dealt: u32,
) -> Result<CannibalismOutcome, EffectSkip> {
    logged(
        &CANNIBALISM_HEALING,
        cannibalism_heal(state, ctx, attacker, damage_dealt),
    )
}

fn cannibalism_heal(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    attacker: EntityAddress,
    damage_dealt: u32,
) -> Result<CannibalismOutcome, EffectSkip> {
    require_authority(ctx)?;
    if attacker.kind != EntityKind::Hero {
        return Err(EffectSkip::IllegalTarget("only heroes have abilities"));
    }
    let hero = living(state, attacker, EffectSkip::SourceMissing, EffectSkip::SourceDead)?
        .as_hero()
        .ok_or(EffectSkip::SourceMissing)?;
    let level = hero.abilities.level(Ability::Cannibalism);
    if level == 0 {
        return Err(EffectSkip::MissingCapability(Ability::Cannibalism));
    }
    let amount = heal_amount(damage_dealt, ctx.config().cannibalism_heal_percent, level);
    if amount == 0 {
        return Err(EffectSkip::NothingToDo);
    }

    let mut entity = entity_mut(state, attacker)?;
    let vitals = entity.vitals();
    let healed = vitals.heal(amount);
    let vitals = vitals.clone();
    let name = entity.name().to_owned();

    ctx.add_combat_log(
        format!("{name} devours and recovers {healed} HP"),
        LogSeverity::Success,
    );
    health_changed(ctx, attacker, &vitals);
    let heal_ms = ctx.config().animation.heal_delay_ms;
    cue(ctx, attacker, VisualCue::Heal, heal_ms);

    let outcome = CannibalismOutcome {
        new_hp: vitals.current_hp(),
        max_hp: vitals.max_hp(),
        healed,
    };
    publish(ctx, CANNIBALISM_HEALING, None, Some(attacker), &outcome);
    Ok(outcome)
}

pub struct CannibalismHealing;

impl ReplicatedEffect for CannibalismHealing {
    const EFFECT_TYPE: EffectType = CANNIBALISM_HEALING;
    type Outcome = CannibalismOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: CannibalismOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let (addr, mut entity) = resolve_target(envelope, state, ctx)?;
        let vitals = entity.vitals();
        vitals.set_hp(outcome.new_hp);
        let vitals = vitals.clone();
        let name = entity.name().to_owned();

        ctx.add_combat_log(
            format!("{name} devours and recovers {} HP", outcome.healed),
            LogSeverity::Success,
        );
        health_changed(ctx, addr, &vitals);
        let heal_ms = ctx.config().animation.heal_delay_ms;
        cue(ctx, addr, VisualCue::Heal, heal_ms);
        Ok(())
    }
}

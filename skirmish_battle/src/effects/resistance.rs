// Resistance: a hero ability that negates incoming spells.
//
// At battle start each Resistance hero receives charges
// (`BattleState::arm_start_of_battle`). When a spell targets the hero and a
// charge is available, the spell is negated and one charge is spent. The
// spell caller checks the `Ok` result to know the spell was resisted.
//
// Creatures never resist, even when their owner has the ability.

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EffectType, EntityKind, UpdateEnvelope};

use super::{cue, living, logged, publish, require_authority, resolve_target, target_ref};
use crate::context::{BattleContext, PresentationEvent, VisualCue};
use crate::entity::{EntityAddress, EntityMut};
use crate::error::{EffectSkip, ReplicationError};
use crate::replicator::ReplicatedEffect;
use crate::state::BattleState;
use crate::types::{Ability, LogSeverity, StatusEffect};

pub const RESISTANCE_USED: EffectType = EffectType::from_static("resistance_used");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResistanceOutcome {
    pub remaining_stacks: u32,
}

/// Try to negate a spell aimed at `target`. `Ok` means the spell is
/// resisted and must not take effect.
pub fn authoritative_resist_spell(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    target: EntityAddress,
) -> Result<ResistanceOutcome, EffectSkip> {
    logged(&RESISTANCE_USED, resist_spell(state, ctx, target))
}

fn resist_spell(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    target: EntityAddress,
) -> Result<ResistanceOutcome, EffectSkip> {
    require_authority(ctx)?;
    if target.kind != EntityKind::Hero {
        return Err(EffectSkip::IllegalTarget("creatures cannot resist spells"));
    }
    let hero = living(state, target, EffectSkip::TargetMissing, EffectSkip::TargetDead)?
        .as_hero()
        .ok_or(EffectSkip::TargetMissing)?;
    if !hero.abilities.has(Ability::Resistance) {
        return Err(EffectSkip::MissingCapability(Ability::Resistance));
    }

    let Some(EntityMut::Hero(hero)) = crate::locator::lookup_mut(target, state) else {
        return Err(EffectSkip::TargetMissing);
    };
    let remaining_stacks = hero
        .statuses
        .consume(StatusEffect::ResistanceCharge)
        .ok_or(EffectSkip::NoStacks)?;
    let name = hero.name.clone();

    ctx.add_combat_log(
        format!("{name} resists the spell! ({remaining_stacks} charges left)"),
        LogSeverity::Success,
    );
    ctx.push_presentation(PresentationEvent::StatusChanged {
        entity: target,
        effect: StatusEffect::ResistanceCharge,
        stacks: remaining_stacks,
    });
    let buff_ms = ctx.config().animation.buff_delay_ms;
    cue(ctx, target, VisualCue::Shield, buff_ms);

    let outcome = ResistanceOutcome { remaining_stacks };
    publish(ctx, RESISTANCE_USED, None, Some(target), &outcome);
    Ok(outcome)
}

pub struct ResistanceUsed;

impl ReplicatedEffect for ResistanceUsed {
    const EFFECT_TYPE: EffectType = RESISTANCE_USED;
    type Outcome = ResistanceOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: ResistanceOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let r = target_ref(envelope)?;
        if r.kind != EntityKind::Hero {
            return Err(ReplicationError::WrongKind(r, "hero"));
        }
        let (addr, mut entity) = resolve_target(envelope, state, ctx)?;
        entity
            .statuses()
            .set(StatusEffect::ResistanceCharge, outcome.remaining_stacks);
        let name = entity.name().to_owned();

        ctx.add_combat_log(
            format!(
                "{name} resists the spell! ({} charges left)",
                outcome.remaining_stacks
            ),
            LogSeverity::Success,
        );
        ctx.push_presentation(PresentationEvent::StatusChanged {
            entity: addr,
            effect: StatusEffect::ResistanceCharge,
            stacks: outcome.remaining_stacks,
        });
        let buff_ms = ctx.config().animation.buff_delay_ms;
        cue(ctx, addr, VisualCue::Shield, buff_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use skirmish_protocol::{LocalSide, Position};

    use super::*;
    use crate::config::BattleConfig;
    use crate::effects::test_support::{Pair, duel};
    use crate::entity::Hero;
    use crate::types::AbilitySet;

    fn pair(level: u32) -> Pair {
        let mut state = duel(
            Hero::new("Ghuul", 100, 12),
            Hero::new("Sera", 90, 8)
                .with_abilities(AbilitySet::new().with(Ability::Resistance, level)),
        );
        let config = BattleConfig::default();
        state.arm_start_of_battle(&config);
        Pair::new(state, config, 3)
    }

    fn sera() -> EntityAddress {
        EntityAddress::hero(LocalSide::Opponent, Position::Center)
    }

    #[test]
    fn spends_one_charge_per_spell() {
        let mut p = pair(2);
        let outcome = authoritative_resist_spell(&mut p.host, &mut p.host_ctx, sera()).unwrap();
        assert_eq!(outcome.remaining_stacks, 1);
        p.flush();
        let on_guest = p.guest.hero(LocalSide::Player, Position::Center).unwrap();
        assert_eq!(on_guest.statuses.stacks(StatusEffect::ResistanceCharge), 1);
        assert!(p.in_sync());
    }

    #[test]
    fn exhausted_charges_skip_without_envelope() {
        let mut p = pair(1);
        authoritative_resist_spell(&mut p.host, &mut p.host_ctx, sera()).unwrap();
        p.flush();
        let err = authoritative_resist_spell(&mut p.host, &mut p.host_ctx, sera()).unwrap_err();
        assert!(matches!(err, EffectSkip::NoStacks));
        assert!(p.outbox.is_empty());
        let hero = p.host.hero(LocalSide::Opponent, Position::Center).unwrap();
        assert_eq!(hero.statuses.stacks(StatusEffect::ResistanceCharge), 0);
    }

    #[test]
    fn creatures_never_resist() {
        let mut p = pair(2);
        let golem = EntityAddress::creature(LocalSide::Opponent, Position::Center, 0);
        assert!(matches!(
            authoritative_resist_spell(&mut p.host, &mut p.host_ctx, golem),
            Err(EffectSkip::IllegalTarget(_))
        ));
    }

    #[test]
    fn hero_without_ability_is_skipped() {
        let mut p = pair(2);
        let ghuul = EntityAddress::hero(LocalSide::Player, Position::Center);
        assert!(matches!(
            authoritative_resist_spell(&mut p.host, &mut p.host_ctx, ghuul),
            Err(EffectSkip::MissingCapability(Ability::Resistance))
        ));
    }
}

// Healing potion: restores `healing_potion_hp * potion_level` HP to a
// living hero, clamped at max HP.

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
use crate::types::LogSeverity;

pub const HEALING_POTION: EffectType = EffectType::from_static("healing_potion");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingPotionOutcome {
    pub new_hp: u32,
    pub max_hp: u32,
    pub healed: u32,
}

pub fn authoritative_drink_healing_potion(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    drinker: EntityAddress,
    potion_level: u32,
) -> Result<HealingPotionOutcome, EffectSkip> {
    logged(
        &HEALING_POTION,
        drink_healing_potion(state, ctx, drinker, potion_level),
    )
}

fn drink_healing_potion(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    drinker: EntityAddress,
    potion_level: u32,
) -> Result<HealingPotionOutcome, EffectSkip> {
    require_authority(ctx)?;
    if drinker.kind != EntityKind::Hero {
        return Err(EffectSkip::IllegalTarget("only heroes drink potions"));
    }
    living(state, drinker, EffectSkip::TargetMissing, EffectSkip::TargetDead)?;
    let amount = ctx.config().healing_potion_hp.saturating_mul(potion_level);
    if amount == 0 {
        return Err(EffectSkip::NothingToDo);
    }

    let mut entity = entity_mut(state, drinker)?;
    let vitals = entity.vitals();
    let healed = vitals.heal(amount);
    let vitals = vitals.clone();
    let name = entity.name().to_owned();

    log_drink(ctx, &name, healed);
    health_changed(ctx, drinker, &vitals);
    let heal_ms = ctx.config().animation.heal_delay_ms;
    cue(ctx, drinker, VisualCue::Potion, heal_ms);

    let outcome = HealingPotionOutcome {
        new_hp: vitals.current_hp(),
        max_hp: vitals.max_hp(),
        healed,
    };
    publish(ctx, HEALING_POTION, None, Some(drinker), &outcome);
    Ok(outcome)
}

fn log_drink(ctx: &mut BattleContext, name: &str, healed: u32) {
    ctx.add_combat_log(
        format!("{name} drinks a healing potion and recovers {healed} HP"),
        LogSeverity::Success,
    );
}

pub struct HealingPotion;

impl ReplicatedEffect for HealingPotion {
    const EFFECT_TYPE: EffectType = HEALING_POTION;
    type Outcome = HealingPotionOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: HealingPotionOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let (addr, mut entity) = resolve_target(envelope, state, ctx)?;
        let vitals = entity.vitals();
        vitals.set_hp(outcome.new_hp);
        let vitals = vitals.clone();
        let name = entity.name().to_owned();

        log_drink(ctx, &name, outcome.healed);
        health_changed(ctx, addr, &vitals);
        let heal_ms = ctx.config().animation.heal_delay_ms;
        cue(ctx, addr, VisualCue::Potion, heal_ms);
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

    fn pair(hp: u32) -> Pair {
        let mut sera = Hero::new("Sera", 200, 8);
        sera.vitals.set_hp(hp);
        Pair::new(
            duel(Hero::new("Ghuul", 100, 12), sera),
            BattleConfig::default(),
            9,
        )
    }

    fn sera() -> EntityAddress {
        EntityAddress::hero(LocalSide::Opponent, Position::Center)
    }

    #[test]
    fn heal_scales_with_potion_level() {
        let mut p = pair(20);
        let outcome =
            authoritative_drink_healing_potion(&mut p.host, &mut p.host_ctx, sera(), 2).unwrap();
        assert_eq!(
            outcome,
            HealingPotionOutcome {
                new_hp: 120,
                max_hp: 200,
                healed: 100,
            }
        );
        p.flush();
        assert!(p.in_sync());
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut p = pair(190);
        let outcome =
            authoritative_drink_healing_potion(&mut p.host, &mut p.host_ctx, sera(), 3).unwrap();
        assert_eq!(outcome.new_hp, 200);
        assert_eq!(outcome.healed, 10);
        p.flush();
        let host = &p.host_ctx.combat_log()[0].message;
        assert_eq!(host, "Sera drinks a healing potion and recovers 10 HP");
        assert_eq!(&p.guest_ctx.combat_log()[0].message, host);
    }

    #[test]
    fn creature_cannot_drink() {
        let mut p = pair(20);
        let golem = EntityAddress::creature(LocalSide::Opponent, Position::Center, 0);
        assert!(matches!(
            authoritative_drink_healing_potion(&mut p.host, &mut p.host_ctx, golem, 1),
            Err(EffectSkip::IllegalTarget(_))
        ));
    }
}

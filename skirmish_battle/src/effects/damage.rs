// Core damage and creature removal.
//
// `authoritative_apply_damage` is the single entry point through which the
// host lowers HP on a hero or creature. Other modules (frost bite, thorned
// mail) use `apply_damage_local` to mutate, then publish their own richer
// envelope instead of a second `damage_applied`.
//
// Dead creatures stay in their hero's list until the host explicitly
// removes them with `authoritative_remove_creature`, which shifts the
// indices of later creatures on both peers in the same envelope order.

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EffectType, EntityKind, UpdateEnvelope};
use tracing::debug;

use super::{
    cue, entity_mut, health_changed, logged, publish, require_authority, resolve_source,
    resolve_target, target_ref,
};
use crate::context::{BattleContext, PresentationEvent, VisualCue};
use crate::entity::EntityAddress;
use crate::error::{EffectSkip, ReplicationError};
use crate::locator;
use crate::replicator::ReplicatedEffect;
use crate::state::BattleState;
use crate::types::LogSeverity;

pub const DAMAGE_APPLIED: EffectType = EffectType::from_static("damage_applied");
pub const CREATURE_REMOVED: EffectType = EffectType::from_static("creature_removed");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub amount: u32,
    pub new_hp: u32,
    pub alive: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureRemovedOutcome {
    pub remaining_creatures: u32,
}

/// Mutate host state only. Caller has validated that `target` exists and
/// writes the combat log once it has its own damage line.
pub(crate) fn apply_damage_local(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    target: EntityAddress,
    amount: u32,
) -> Result<DamageOutcome, EffectSkip> {
    let mut entity = entity_mut(state, target)?;
    let vitals = entity.vitals();
    vitals.damage(amount);
    let vitals = vitals.clone();
    health_changed(ctx, target, &vitals);
    Ok(DamageOutcome {
        amount,
        new_hp: vitals.current_hp(),
        alive: vitals.alive(),
    })
}

/// Follows the damage line of a hit. Host and guest both call it.
pub(crate) fn log_defeat(ctx: &mut BattleContext, name: &str, alive: bool) {
    if !alive {
        ctx.add_combat_log(format!("{name} is defeated!"), LogSeverity::Error);
    }
}

fn log_hit(ctx: &mut BattleContext, name: &str, outcome: &DamageOutcome) {
    ctx.add_combat_log(
        format!(
            "{name} takes {} damage ({} HP left)",
            outcome.amount, outcome.new_hp
        ),
        LogSeverity::Info,
    );
    log_defeat(ctx, name, outcome.alive);
}

/// Deal `amount` damage to a living hero or creature.
pub fn authoritative_apply_damage(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    source: Option<EntityAddress>,
    target: EntityAddress,
    amount: u32,
) -> Result<DamageOutcome, EffectSkip> {
    logged(&DAMAGE_APPLIED, apply_damage(state, ctx, source, target, amount))
}

fn apply_damage(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    source: Option<EntityAddress>,
    target: EntityAddress,
    amount: u32,
) -> Result<DamageOutcome, EffectSkip> {
    require_authority(ctx)?;
    let name = super::living(state, target, EffectSkip::TargetMissing, EffectSkip::TargetDead)?
        .name()
        .to_owned();
    if amount == 0 {
        return Err(EffectSkip::NothingToDo);
    }
    let outcome = apply_damage_local(state, ctx, target, amount)?;
    log_hit(ctx, &name, &outcome);
    let strike_ms = ctx.config().animation.strike_delay_ms;
    cue(ctx, target, VisualCue::Strike, strike_ms);
    publish(ctx, DAMAGE_APPLIED, source, Some(target), &outcome);
    Ok(outcome)
}

/// Remove a creature from its hero's list. Later creatures shift down.
pub fn authoritative_remove_creature(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    creature: EntityAddress,
) -> Result<CreatureRemovedOutcome, EffectSkip> {
    logged(&CREATURE_REMOVED, remove_creature(state, ctx, creature))
}

fn remove_creature(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    creature: EntityAddress,
) -> Result<CreatureRemovedOutcome, EffectSkip> {
    require_authority(ctx)?;
    let EntityKind::Creature { index } = creature.kind else {
        return Err(EffectSkip::IllegalTarget("only creatures can be removed"));
    };
    let removed = state
        .remove_creature(creature.side, creature.position, index)
        .ok_or(EffectSkip::TargetMissing)?;
    let remaining_creatures = state
        .hero(creature.side, creature.position)
        .map_or(0, |h| h.creatures.len() as u32);
    debug!(creature = %removed.name, index, "creature removed");
    ctx.push_presentation(PresentationEvent::CreatureRemoved {
        owner: creature.owner(),
        index,
    });
    let outcome = CreatureRemovedOutcome {
        remaining_creatures,
    };
    publish(ctx, CREATURE_REMOVED, None, Some(creature), &outcome);
    Ok(outcome)
}

pub struct DamageApplied;

impl ReplicatedEffect for DamageApplied {
    const EFFECT_TYPE: EffectType = DAMAGE_APPLIED;
    type Outcome = DamageOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: DamageOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        resolve_source(envelope, state, ctx)?;
        let (addr, mut entity) = resolve_target(envelope, state, ctx)?;
        let vitals = entity.vitals();
        vitals.set_state(outcome.new_hp, outcome.alive);
        let vitals = vitals.clone();
        let name = entity.name().to_owned();
        log_hit(ctx, &name, &outcome);
        health_changed(ctx, addr, &vitals);
        let strike_ms = ctx.config().animation.strike_delay_ms;
        cue(ctx, addr, VisualCue::Strike, strike_ms);
        Ok(())
    }
}

pub struct CreatureRemoved;

impl ReplicatedEffect for CreatureRemoved {
    const EFFECT_TYPE: EffectType = CREATURE_REMOVED;
    type Outcome = CreatureRemovedOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: CreatureRemovedOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let r = target_ref(envelope)?;
        let EntityKind::Creature { index } = r.kind else {
            return Err(ReplicationError::WrongKind(r, "creature"));
        };
        let addr = locator::address_of(r, ctx.my_side());
        state
            .remove_creature(addr.side, addr.position, index)
            .ok_or(ReplicationError::TargetNotFound(r))?;
        let remaining = state
            .hero(addr.side, addr.position)
            .map_or(0, |h| h.creatures.len() as u32);
        if remaining != outcome.remaining_creatures {
            debug!(
                remaining,
                expected = outcome.remaining_creatures,
                "creature count differs from host"
            );
        }
        ctx.push_presentation(PresentationEvent::CreatureRemoved {
            owner: addr.owner(),
            index,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use skirmish_protocol::{AbsoluteSide, EntityRef, LocalSide, Position};

    use super::*;
    use crate::config::BattleConfig;
    use crate::effects::test_support::{Pair, duel};
    use crate::entity::Hero;

    fn pair() -> Pair {
        Pair::new(
            duel(Hero::new("Ghuul", 100, 12), Hero::new("Sera", 90, 8)),
            BattleConfig::default(),
            7,
        )
    }

    #[test]
    fn damage_replicates_to_guest() {
        let mut p = pair();
        let target = EntityAddress::hero(LocalSide::Opponent, Position::Center);
        let outcome = authoritative_apply_damage(&mut p.host, &mut p.host_ctx, None, target, 25)
            .unwrap();
        assert_eq!(
            outcome,
            DamageOutcome {
                amount: 25,
                new_hp: 65,
                alive: true
            }
        );
        assert_eq!(p.flush(), 1);
        let on_guest = p.guest.hero(LocalSide::Player, Position::Center).unwrap();
        assert_eq!(on_guest.vitals.current_hp(), 65);
        assert!(p.in_sync());
    }

    #[test]
    fn overkill_clamps_and_kills() {
        let mut p = pair();
        let wolf = EntityAddress::creature(LocalSide::Player, Position::Center, 0);
        let outcome =
            authoritative_apply_damage(&mut p.host, &mut p.host_ctx, None, wolf, 500).unwrap();
        assert_eq!(outcome.new_hp, 0);
        assert!(!outcome.alive);
        p.flush();
        assert!(p.in_sync());
    }

    #[test]
    fn dead_target_is_skipped_without_envelope() {
        let mut p = pair();
        let wolf = EntityAddress::creature(LocalSide::Player, Position::Center, 0);
        authoritative_apply_damage(&mut p.host, &mut p.host_ctx, None, wolf, 500).unwrap();
        p.flush();
        let err =
            authoritative_apply_damage(&mut p.host, &mut p.host_ctx, None, wolf, 5).unwrap_err();
        assert!(matches!(err, EffectSkip::TargetDead));
        assert!(p.outbox.is_empty());
    }

    #[test]
    fn guest_cannot_compute() {
        let mut p = pair();
        let target = EntityAddress::hero(LocalSide::Player, Position::Center);
        let err = authoritative_apply_damage(&mut p.guest, &mut p.guest_ctx, None, target, 5)
            .unwrap_err();
        assert!(matches!(err, EffectSkip::NotAuthoritative));
        assert_eq!(
            p.guest
                .hero(LocalSide::Player, Position::Center)
                .unwrap()
                .vitals
                .current_hp(),
            90
        );
    }

    #[test]
    fn creature_removal_replicates() {
        let mut p = pair();
        let golem = EntityAddress::creature(LocalSide::Opponent, Position::Center, 0);
        let outcome =
            authoritative_remove_creature(&mut p.host, &mut p.host_ctx, golem).unwrap();
        assert_eq!(outcome.remaining_creatures, 0);
        p.flush();
        assert!(
            p.guest
                .hero(LocalSide::Player, Position::Center)
                .unwrap()
                .creatures
                .is_empty()
        );
        assert!(p.in_sync());
    }

    #[test]
    fn removing_a_hero_is_illegal() {
        let mut p = pair();
        let hero = EntityAddress::hero(LocalSide::Opponent, Position::Center);
        assert!(matches!(
            authoritative_remove_creature(&mut p.host, &mut p.host_ctx, hero),
            Err(EffectSkip::IllegalTarget(_))
        ));
    }

    fn log_lines(ctx: &BattleContext) -> Vec<&str> {
        ctx.combat_log().iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn guest_log_matches_host() {
        let mut p = pair();
        let wolf = EntityAddress::creature(LocalSide::Player, Position::Center, 0);
        let sera = EntityAddress::hero(LocalSide::Opponent, Position::Center);
        authoritative_apply_damage(&mut p.host, &mut p.host_ctx, None, wolf, 500).unwrap();
        authoritative_apply_damage(&mut p.host, &mut p.host_ctx, Some(wolf), sera, 30).unwrap();
        assert_eq!(p.flush(), 2);
        assert_eq!(
            log_lines(&p.host_ctx),
            [
                "Wolf takes 500 damage (0 HP left)",
                "Wolf is defeated!",
                "Sera takes 30 damage (60 HP left)",
            ]
        );
        assert_eq!(log_lines(&p.guest_ctx), log_lines(&p.host_ctx));
    }

    #[test]
    fn unknown_source_is_rejected_before_mutation() {
        let mut p = pair();
        let ghost = EntityRef::creature(AbsoluteSide::Host, Position::Left, 7);
        let sera = EntityRef::hero(AbsoluteSide::Guest, Position::Center);
        let envelope = UpdateEnvelope::new(
            DAMAGE_APPLIED,
            Some(ghost),
            Some(sera),
            &DamageOutcome {
                amount: 80,
                new_hp: 10,
                alive: true,
            },
        )
        .unwrap();
        let err = p
            .replicator
            .handle(&envelope, &mut p.guest, &mut p.guest_ctx)
            .unwrap_err();
        assert!(matches!(err, ReplicationError::SourceNotFound(r) if r == ghost));
        let on_guest = p.guest.hero(LocalSide::Player, Position::Center).unwrap();
        assert_eq!(on_guest.vitals.current_hp(), 90);
        assert!(p.guest_ctx.combat_log().is_empty());
    }
}

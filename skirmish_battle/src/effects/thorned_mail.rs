// Thorned mail: an artifact that reflects part of basic-attack damage.
//
// reflect = floor(damage_taken * thorned_mail_reflect_percent / 100)
//
// The wearer need not survive the hit for the thorns to fire; the attacker
// must still be alive to take the reflected damage.

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EffectType, EntityKind, UpdateEnvelope};

use super::damage::{DamageOutcome, apply_damage_local, log_defeat};
use super::{
    cue, health_changed, living, logged, publish, require_authority, required_source,
    resolve_target,
};
use crate::context::{BattleContext, VisualCue};
use crate::entity::EntityAddress;
use crate::error::{EffectSkip, ReplicationError};
use crate::locator;
use crate::replicator::ReplicatedEffect;
use crate::state::BattleState;
use crate::types::{Artifact, LogSeverity};

pub const THORNED_MAIL_REFLECT: EffectType = EffectType::from_static("thorned_mail_reflect");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThornsOutcome {
    pub new_hp: u32,
    pub alive: bool,
    pub reflected: u32,
}

pub fn reflected_damage(damage_taken: u32, percent: u32) -> u32 {
    u32::try_from(u64::from(damage_taken) * u64::from(percent) / 100).unwrap_or(u32::MAX)
}

pub fn authoritative_thorned_mail_reflect(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    wearer: EntityAddress,
    attacker: EntityAddress,
    damage_taken: u32,
) -> Result<ThornsOutcome, EffectSkip> {
    logged(
        &THORNED_MAIL_REFLECT,
        thorned_mail_reflect(state, ctx, wearer, attacker, damage_taken),
    )
}

fn thorned_mail_reflect(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    wearer: EntityAddress,
    attacker: EntityAddress,
    damage_taken: u32,
) -> Result<ThornsOutcome, EffectSkip> {
    require_authority(ctx)?;
    if wearer.kind != EntityKind::Hero {
        return Err(EffectSkip::IllegalTarget("only heroes wear artifacts"));
    }
    let hero = locator::lookup(wearer, state)
        .and_then(|e| e.as_hero())
        .ok_or(EffectSkip::SourceMissing)?;
    if !hero.has_artifact(Artifact::ThornedMail) {
        return Err(EffectSkip::MissingArtifact(Artifact::ThornedMail));
    }
    let wearer_name = hero.name.clone();
    let attacker_name = living(state, attacker, EffectSkip::TargetMissing, EffectSkip::TargetDead)?
        .name()
        .to_owned();
    let reflected = reflected_damage(damage_taken, ctx.config().thorned_mail_reflect_percent);
    if reflected == 0 {
        return Err(EffectSkip::NothingToDo);
    }

    let DamageOutcome { new_hp, alive, .. } =
        apply_damage_local(state, ctx, attacker, reflected)?;
    log_reflect(ctx, &wearer_name, &attacker_name, reflected, alive);
    let strike_ms = ctx.config().animation.strike_delay_ms;
    cue(ctx, attacker, VisualCue::Thorns, strike_ms);

    let outcome = ThornsOutcome {
        new_hp,
        alive,
        reflected,
    };
    publish(ctx, THORNED_MAIL_REFLECT, Some(wearer), Some(attacker), &outcome);
    Ok(outcome)
}

fn log_reflect(
    ctx: &mut BattleContext,
    wearer: &str,
    attacker: &str,
    reflected: u32,
    alive: bool,
) {
    ctx.add_combat_log(
        format!("{wearer}'s thorned mail reflects {reflected} damage to {attacker}"),
        LogSeverity::Info,
    );
    log_defeat(ctx, attacker, alive);
}

pub struct ThornedMailReflect;

impl ReplicatedEffect for ThornedMailReflect {
    const EFFECT_TYPE: EffectType = THORNED_MAIL_REFLECT;
    type Outcome = ThornsOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: ThornsOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let wearer_name = required_source(envelope, state, ctx)?;
        let (addr, mut entity) = resolve_target(envelope, state, ctx)?;
        let vitals = entity.vitals();
        vitals.set_state(outcome.new_hp, outcome.alive);
        let vitals = vitals.clone();
        let name = entity.name().to_owned();

        log_reflect(ctx, &wearer_name, &name, outcome.reflected, outcome.alive);
        health_changed(ctx, addr, &vitals);
        let strike_ms = ctx.config().animation.strike_delay_ms;
        cue(ctx, addr, VisualCue::Thorns, strike_ms);
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
            duel(
                Hero::new("Ghuul", 100, 12),
                Hero::new("Sera", 90, 8).with_artifact(Artifact::ThornedMail),
            ),
            BattleConfig::default(),
            4,
        )
    }

    fn sera() -> EntityAddress {
        EntityAddress::hero(LocalSide::Opponent, Position::Center)
    }

    fn ghuul() -> EntityAddress {
        EntityAddress::hero(LocalSide::Player, Position::Center)
    }

    #[test]
    fn reflects_a_fifth_of_damage() {
        let mut p = pair();
        let outcome =
            authoritative_thorned_mail_reflect(&mut p.host, &mut p.host_ctx, sera(), ghuul(), 37)
                .unwrap();
        assert_eq!(outcome.reflected, 7);
        assert_eq!(outcome.new_hp, 93);
        p.flush();
        let on_guest = p.guest.hero(LocalSide::Opponent, Position::Center).unwrap();
        assert_eq!(on_guest.vitals.current_hp(), 93);
        assert!(p.in_sync());
    }

    #[test]
    fn no_artifact_no_reflect() {
        let mut p = pair();
        assert!(matches!(
            authoritative_thorned_mail_reflect(&mut p.host, &mut p.host_ctx, ghuul(), sera(), 50),
            Err(EffectSkip::MissingArtifact(Artifact::ThornedMail))
        ));
    }

    #[test]
    fn small_hits_reflect_nothing() {
        let mut p = pair();
        assert!(matches!(
            authoritative_thorned_mail_reflect(&mut p.host, &mut p.host_ctx, sera(), ghuul(), 4),
            Err(EffectSkip::NothingToDo)
        ));
        assert!(p.outbox.is_empty());
    }

    #[test]
    fn guest_log_names_wearer_and_attacker() {
        let mut p = pair();
        authoritative_thorned_mail_reflect(&mut p.host, &mut p.host_ctx, sera(), ghuul(), 37)
            .unwrap();
        assert_eq!(p.flush(), 1);
        let host: Vec<_> = p.host_ctx.combat_log().iter().map(|e| &e.message).collect();
        let guest: Vec<_> = p.guest_ctx.combat_log().iter().map(|e| &e.message).collect();
        assert_eq!(host, ["Sera's thorned mail reflects 7 damage to Ghuul"]);
        assert_eq!(guest, host);
    }

    #[test]
    fn unknown_wearer_is_rejected_before_mutation() {
        let mut p = pair();
        let ghost = EntityRef::creature(AbsoluteSide::Guest, Position::Left, 7);
        let envelope = UpdateEnvelope::new(
            THORNED_MAIL_REFLECT,
            Some(ghost),
            Some(EntityRef::hero(AbsoluteSide::Host, Position::Center)),
            &ThornsOutcome {
                new_hp: 1,
                alive: true,
                reflected: 99,
            },
        )
        .unwrap();
        let err = p
            .replicator
            .handle(&envelope, &mut p.guest, &mut p.guest_ctx)
            .unwrap_err();
        assert!(matches!(err, ReplicationError::SourceNotFound(r) if r == ghost));
        let on_guest = p.guest.hero(LocalSide::Opponent, Position::Center).unwrap();
        assert_eq!(on_guest.vitals.current_hp(), 100);
    }
}

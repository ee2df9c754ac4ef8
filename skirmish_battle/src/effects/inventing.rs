// Inventing: a hero ability that accumulates counters and pays out cards.
//
// Each trigger adds `level` counters. While the total is at or above
// `inventing_threshold` the threshold is subtracted and the hero's owner
// draws `inventing_cards_per_payout` cards through the `HandManager`.
//
// The hand manager is checked before anything is mutated: a host without
// one cannot honor the payout, so the trigger is abandoned entirely.

use serde::{Deserialize, Serialize};
use skirmish_protocol::{EffectType, EntityKind, UpdateEnvelope};

use super::{
    cue, living, logged, publish, require_authority, resolve_source, resolve_target,
};
use crate::context::{BattleContext, PresentationEvent, VisualCue};
use crate::entity::{EntityAddress, EntityMut};
use crate::error::{EffectSkip, ReplicationError};
use crate::locator;
use crate::replicator::ReplicatedEffect;
use crate::state::BattleState;
use crate::types::{Ability, CounterKind, LogSeverity};

pub const INVENTING_COUNTERS: EffectType = EffectType::from_static("inventing_counters");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventingOutcome {
    pub counters: u32,
    pub cards_drawn: u32,
}

/// Split `counters` into (payouts, remainder) for a threshold.
pub fn payouts(counters: u32, threshold: u32) -> (u32, u32) {
    let threshold = threshold.max(1);
    (counters / threshold, counters % threshold)
}

pub fn authoritative_inventing_trigger(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    hero: EntityAddress,
) -> Result<InventingOutcome, EffectSkip> {
    logged(&INVENTING_COUNTERS, inventing_trigger(state, ctx, hero))
}

fn inventing_trigger(
    state: &mut BattleState,
    ctx: &mut BattleContext,
    addr: EntityAddress,
) -> Result<InventingOutcome, EffectSkip> {
    require_authority(ctx)?;
    if addr.kind != EntityKind::Hero {
        return Err(EffectSkip::IllegalTarget("only heroes have abilities"));
    }
    let hero = living(state, addr, EffectSkip::SourceMissing, EffectSkip::SourceDead)?
        .as_hero()
        .ok_or(EffectSkip::SourceMissing)?;
    let level = hero.abilities.level(Ability::Inventing);
    if level == 0 {
        return Err(EffectSkip::MissingCapability(Ability::Inventing));
    }
    if ctx.hand_manager_mut().is_none() {
        return Err(EffectSkip::MissingCollaborator("hand manager"));
    }

    let total = hero.counter(CounterKind::Inventing).saturating_add(level);
    let (payout_count, counters) = payouts(total, ctx.config().inventing_threshold);
    let requested = payout_count.saturating_mul(ctx.config().inventing_cards_per_payout);
    let owner = locator::reference_for(addr, ctx.my_side()).absolute_side;

    let Some(EntityMut::Hero(hero)) = locator::lookup_mut(addr, state) else {
        return Err(EffectSkip::SourceMissing);
    };
    hero.set_counter(CounterKind::Inventing, counters);
    let name = hero.name.clone();

    let cards_drawn = match ctx.hand_manager_mut() {
        Some(hand) if requested > 0 => hand.draw_cards(owner, requested),
        _ => 0,
    };

    ctx.push_presentation(PresentationEvent::CounterChanged {
        entity: addr,
        counter: CounterKind::Inventing,
        value: counters,
    });
    if cards_drawn > 0 {
        ctx.add_combat_log(
            format!("{name} invents something and draws {cards_drawn} card(s)"),
            LogSeverity::Success,
        );
        let buff_ms = ctx.config().animation.buff_delay_ms;
        cue(ctx, addr, VisualCue::Invent, buff_ms);
    }

    let outcome = InventingOutcome {
        counters,
        cards_drawn,
    };
    publish(ctx, INVENTING_COUNTERS, Some(addr), Some(addr), &outcome);
    Ok(outcome)
}

pub struct InventingCounters;

impl ReplicatedEffect for InventingCounters {
    const EFFECT_TYPE: EffectType = INVENTING_COUNTERS;
    type Outcome = InventingOutcome;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: InventingOutcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        resolve_source(envelope, state, ctx)?;
        let (addr, mut entity) = resolve_target(envelope, state, ctx)?;
        let Some(hero) = entity.as_hero_mut() else {
            return Err(ReplicationError::WrongKind(
                locator::reference_for(addr, ctx.my_side()),
                "hero",
            ));
        };
        hero.set_counter(CounterKind::Inventing, outcome.counters);
        let name = hero.name.clone();

        ctx.push_presentation(PresentationEvent::CounterChanged {
            entity: addr,
            counter: CounterKind::Inventing,
            value: outcome.counters,
        });
        if outcome.cards_drawn > 0 {
            ctx.add_combat_log(
                format!(
                    "{name} invents something and draws {} card(s)",
                    outcome.cards_drawn
                ),
                LogSeverity::Success,
            );
            let buff_ms = ctx.config().animation.buff_delay_ms;
            cue(ctx, addr, VisualCue::Invent, buff_ms);
        }
        Ok(())
    }
}

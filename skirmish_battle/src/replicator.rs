// GuestReplicator: applies host envelopes to the guest's mirrored state.
//
// A dispatch table maps each `EffectType` to a handler function. Handlers
// resolve the envelope's entity references through the locator and write
// the outcome's final values straight into state: they never compute,
// never roll, and never send anything back.
//
// Per-envelope pipeline in `handle`:
// 1. Sequence check. An envelope at or below the last applied sequence is a
//    duplicate and is dropped. A jump past `last + 1` is a gap: it is
//    counted and logged, and the envelope is still applied (outcomes are
//    absolute values, so later envelopes overwrite whatever a lost one
//    would have set). Undispatched envelopes (sequence 0) skip the check.
// 2. Unknown effect type: warn, drop.
// 3. Handler. Any `ReplicationError` (unresolved reference, malformed
//    outcome, wrong entity kind) is logged at warn and the envelope is
//    dropped. Handlers validate before mutating, so a dropped envelope
//    leaves state untouched. Nothing is retried or rolled back, and later
//    envelopes keep flowing.
//
// Registration is explicit (`register` / `register_effect`), usually via
// `effects::register_all`. Registering a type twice replaces the old
// handler with a warning.

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use skirmish_protocol::{EffectType, UpdateEnvelope, UpdateSequence};
use tracing::{debug, warn};

use crate::context::BattleContext;
use crate::error::ReplicationError;
use crate::state::BattleState;

pub type HandlerFn =
    fn(&UpdateEnvelope, &mut BattleState, &mut BattleContext) -> Result<(), ReplicationError>;

/// Guest side of one replicated effect, with a typed outcome.
pub trait ReplicatedEffect {
    const EFFECT_TYPE: EffectType;
    type Outcome: DeserializeOwned;

    fn replicate(
        envelope: &UpdateEnvelope,
        outcome: Self::Outcome,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError>;
}

fn dispatch_typed<E: ReplicatedEffect>(
    envelope: &UpdateEnvelope,
    state: &mut BattleState,
    ctx: &mut BattleContext,
) -> Result<(), ReplicationError> {
    let outcome = envelope
        .outcome::<E::Outcome>()
        .map_err(|source| ReplicationError::MalformedOutcome {
            effect_type: E::EFFECT_TYPE,
            source,
        })?;
    E::replicate(envelope, outcome, state, ctx)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplicatorStats {
    pub applied: u64,
    pub dropped: u64,
    pub duplicates: u64,
    pub gaps: u64,
}

#[derive(Debug, Default)]
pub struct GuestReplicator {
    handlers: FxHashMap<EffectType, HandlerFn>,
    last_applied: UpdateSequence,
    stats: ReplicatorStats,
}

impl GuestReplicator {
    /// Empty table. See `with_default_effects` for the usual setup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in effect registered.
    pub fn with_default_effects() -> Self {
        let mut replicator = Self::new();
        crate::effects::register_all(&mut replicator);
        replicator
    }

    pub fn register(&mut self, effect_type: EffectType, handler: HandlerFn) {
        if self.handlers.insert(effect_type.clone(), handler).is_some() {
            warn!(%effect_type, "replacing existing replication handler");
        }
    }

    pub fn register_effect<E: ReplicatedEffect>(&mut self) {
        self.register(E::EFFECT_TYPE, dispatch_typed::<E>);
    }

    pub fn is_registered(&self, effect_type: &EffectType) -> bool {
        self.handlers.contains_key(effect_type)
    }

    pub fn stats(&self) -> ReplicatorStats {
        self.stats
    }

    pub fn last_applied(&self) -> UpdateSequence {
        self.last_applied
    }

    /// Apply one incoming envelope. Errors are already logged; callers may
    /// ignore them.
    pub fn handle(
        &mut self,
        envelope: &UpdateEnvelope,
        state: &mut BattleState,
        ctx: &mut BattleContext,
    ) -> Result<(), ReplicationError> {
        let sequence = envelope.sequence();
        if sequence.0 != 0 {
            if sequence <= self.last_applied {
                self.stats.duplicates += 1;
                debug!(
                    sequence = sequence.0,
                    last = self.last_applied.0,
                    "dropping duplicate envelope"
                );
                return Err(ReplicationError::Duplicate {
                    received: sequence,
                    last: self.last_applied,
                });
            }
            if sequence != self.last_applied.next() {
                self.stats.gaps += 1;
                warn!(
                    expected = self.last_applied.next().0,
                    received = sequence.0,
                    "gap in update sequence"
                );
            }
            self.last_applied = sequence;
        }

        let effect_type = envelope.effect_type();
        let Some(handler) = self.handlers.get(effect_type).copied() else {
            self.stats.dropped += 1;
            warn!(%effect_type, sequence = sequence.0, "no handler for effect type");
            return Err(ReplicationError::UnknownEffect(effect_type.clone()));
        };

        match handler(envelope, state, ctx) {
            Ok(()) => {
                self.stats.applied += 1;
                debug!(%effect_type, sequence = sequence.0, "update applied");
                Ok(())
            }
            Err(e) => {
                self.stats.dropped += 1;
                warn!(%effect_type, sequence = sequence.0, error = %e, "update dropped");
                Err(e)
            }
        }
    }
}

// The update envelope: one host-computed effect outcome, on the wire.
//
// An envelope names the effect (`effect_type`), the entities involved (as
// `EntityRef`s, never live objects) and the *result* of the effect as a JSON
// object. The outcome must always be a final value (`new_hp`,
// `remaining_stacks`), never a delta or a formula input, so that the guest
// can write it straight into its mirrored state without recomputing
// anything or rolling any dice.
//
// Envelopes are immutable once built. The only post-construction step is
// `dispatched`, which consumes the envelope and returns a copy stamped with
// the host's sequence number and an advisory timestamp. Fields are private
// and exposed through getters so nothing downstream can rewrite a sent
// envelope in place.
//
// The outcome stays an untyped `serde_json::Value` here: the protocol crate
// knows nothing about individual effects. Content modules decode it into
// their own typed outcome structs with `UpdateEnvelope::outcome::<T>()`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{EffectType, EntityRef, UpdateSequence};

/// Serialized description of one effect's computed outcome, host → guest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateEnvelope {
    #[serde(default)]
    sequence: UpdateSequence,
    effect_type: EffectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<EntityRef>,
    outcome: serde_json::Value,
    /// Advisory wall-clock milliseconds, for diagnostics only.
    #[serde(default)]
    timestamp_ms: u64,
}

impl UpdateEnvelope {
    /// Build an undispatched envelope. Fails only if `outcome` cannot be
    /// represented as JSON (e.g. a map with non-string keys).
    pub fn new<O: Serialize>(
        effect_type: EffectType,
        source: Option<EntityRef>,
        target: Option<EntityRef>,
        outcome: &O,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            sequence: UpdateSequence::default(),
            effect_type,
            source,
            target,
            outcome: serde_json::to_value(outcome)?,
            timestamp_ms: 0,
        })
    }

    /// Stamp the envelope at dispatch time.
    pub fn dispatched(self, sequence: UpdateSequence, timestamp_ms: u64) -> Self {
        Self {
            sequence,
            timestamp_ms,
            ..self
        }
    }

    pub fn sequence(&self) -> UpdateSequence {
        self.sequence
    }

    pub fn effect_type(&self) -> &EffectType {
        &self.effect_type
    }

    pub fn source(&self) -> Option<EntityRef> {
        self.source
    }

    pub fn target(&self) -> Option<EntityRef> {
        self.target
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn raw_outcome(&self) -> &serde_json::Value {
        &self.outcome
    }

    /// Decode the outcome into an effect-specific struct.
    pub fn outcome<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AbsoluteSide, Position};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Healed {
        new_hp: u32,
        max_hp: u32,
    }

    #[test]
    fn outcome_decodes_into_typed_struct() {
        let env = UpdateEnvelope::new(
            EffectType::from_static("cannibalism_healing"),
            None,
            Some(EntityRef::hero(AbsoluteSide::Host, Position::Left)),
            &Healed {
                new_hp: 100,
                max_hp: 100,
            },
        )
        .unwrap();
        let healed: Healed = env.outcome().unwrap();
        assert_eq!(
            healed,
            Healed {
                new_hp: 100,
                max_hp: 100
            }
        );
    }

    #[test]
    fn mismatched_outcome_is_an_error_not_a_panic() {
        let env = UpdateEnvelope::new(
            EffectType::from_static("resistance_used"),
            None,
            None,
            &serde_json::json!({ "remaining_stacks": 1 }),
        )
        .unwrap();
        assert!(env.outcome::<Healed>().is_err());
    }

    #[test]
    fn dispatched_stamps_without_touching_payload() {
        let env = UpdateEnvelope::new(
            EffectType::from_static("resistance_used"),
            None,
            Some(EntityRef::hero(AbsoluteSide::Guest, Position::Right)),
            &serde_json::json!({ "remaining_stacks": 1 }),
        )
        .unwrap();
        let payload = env.raw_outcome().clone();
        let stamped = env.dispatched(UpdateSequence(9), 1234);
        assert_eq!(stamped.sequence(), UpdateSequence(9));
        assert_eq!(stamped.timestamp_ms(), 1234);
        assert_eq!(stamped.raw_outcome(), &payload);
    }

    #[test]
    fn missing_optional_fields_default() {
        let env: UpdateEnvelope = serde_json::from_str(
            r#"{"effect_type":"battle_cry","outcome":{"stacks":1}}"#,
        )
        .unwrap();
        assert_eq!(env.sequence(), UpdateSequence(0));
        assert!(env.source().is_none());
        assert!(env.target().is_none());
        assert_eq!(env.effect_type().as_str(), "battle_cry");
    }
}

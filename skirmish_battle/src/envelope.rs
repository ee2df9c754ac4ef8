// Host-side envelope construction.
//
// Effect computers describe the entities involved by local `EntityAddress`
// (which is what they have in hand) and pass a typed outcome struct. This
// converts the addresses to wire references from the host's perspective and
// serializes the outcome. Nothing here touches live entities.

use serde::Serialize;
use skirmish_protocol::{AbsoluteSide, EffectType, UpdateEnvelope};

use crate::entity::EntityAddress;
use crate::locator::reference_for;

pub fn build_envelope<O: Serialize>(
    effect_type: EffectType,
    source: Option<EntityAddress>,
    target: Option<EntityAddress>,
    outcome: &O,
    me: AbsoluteSide,
) -> Result<UpdateEnvelope, serde_json::Error> {
    UpdateEnvelope::new(
        effect_type,
        source.map(|a| reference_for(a, me)),
        target.map(|a| reference_for(a, me)),
        outcome,
    )
}

#[cfg(test)]
mod tests {
    use skirmish_protocol::{EntityRef, LocalSide, Position};

    use super::*;

    #[test]
    fn addresses_become_absolute_references() {
        let env = build_envelope(
            EffectType::from_static("damage_applied"),
            Some(EntityAddress::hero(LocalSide::Player, Position::Left)),
            Some(EntityAddress::creature(LocalSide::Opponent, Position::Right, 0)),
            &serde_json::json!({ "new_hp": 3, "alive": true }),
            AbsoluteSide::Host,
        )
        .unwrap();
        assert_eq!(
            env.source(),
            Some(EntityRef::hero(AbsoluteSide::Host, Position::Left))
        );
        assert_eq!(
            env.target(),
            Some(EntityRef::creature(AbsoluteSide::Guest, Position::Right, 0))
        );
        assert_eq!(env.raw_outcome()["new_hp"], 3);
    }
}

// Error taxonomy for the battle crate.
//
// - `EffectSkip`: why a host-side effect computer abandoned without mutating
//   state or sending an envelope. Not a failure of the system; most skips
//   are routine (a dead target, no stacks left).
// - `ReplicationError`: why the guest dropped an incoming envelope. Never
//   fatal and never retried.
// - `ChannelError`: why an envelope could not be handed to the transport.

use skirmish_protocol::{EffectType, EntityRef, FrameError, UpdateSequence};
use thiserror::Error;

use crate::types::{Ability, Artifact, CreatureSpecial};

#[derive(Debug, Error)]
pub enum EffectSkip {
    #[error("not the authoritative peer")]
    NotAuthoritative,
    #[error("source entity not found")]
    SourceMissing,
    #[error("source entity is dead")]
    SourceDead,
    #[error("target entity not found")]
    TargetMissing,
    #[error("target entity is dead")]
    TargetDead,
    #[error("entity lacks {0}")]
    MissingCapability(Ability),
    #[error("hero is not wearing {0:?}")]
    MissingArtifact(Artifact),
    #[error("creature has no {0:?} attack")]
    MissingSpecial(CreatureSpecial),
    #[error("no stacks left to spend")]
    NoStacks,
    #[error("illegal target: {0}")]
    IllegalTarget(&'static str),
    #[error("effect had nothing to do")]
    NothingToDo,
    #[error("required collaborator `{0}` is not attached")]
    MissingCollaborator(&'static str),
}

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("no handler registered for effect type `{0}`")]
    UnknownEffect(EffectType),
    #[error("malformed `{effect_type}` outcome: {source}")]
    MalformedOutcome {
        effect_type: EffectType,
        #[source]
        source: serde_json::Error,
    },
    #[error("envelope has no {0} reference")]
    MissingReference(&'static str),
    #[error("target {0} did not resolve")]
    TargetNotFound(EntityRef),
    #[error("source {0} did not resolve")]
    SourceNotFound(EntityRef),
    #[error("target {0} is not a valid {1}")]
    WrongKind(EntityRef, &'static str),
    #[error("duplicate envelope {received:?} (last applied {last:?})")]
    Duplicate {
        received: UpdateSequence,
        last: UpdateSequence,
    },
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("only the authoritative peer may send updates")]
    NotAuthoritative,
    #[error("replication channel is closed")]
    Closed,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

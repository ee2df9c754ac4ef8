// skirmish_battle — host-authoritative battle effects and their replication.
//
// The host is the only peer that computes. Every effect that changes battle
// state runs on the host, mutates the host's `BattleState`, and publishes
// one `UpdateEnvelope` describing the *result*. The guest never re-derives
// anything: its `GuestReplicator` routes each envelope to a handler that
// writes the reported values into the guest's mirrored state.
//
// Module overview:
// - `config.rs`:     `BattleConfig`, every balance and pacing number.
// - `types.rs`:      Typed abilities, artifacts, status effects, counters.
// - `status.rs`:     Per-entity status stacks (floor at zero).
// - `entity.rs`:     `Hero`, `Creature`, clamped `Vitals`, local addresses.
// - `state.rs`:      `BattleState` keyed by local side, perspective-free
//                    checksum.
// - `locator.rs`:    `EntityRef` <-> local entity resolution.
// - `envelope.rs`:   `build_envelope` from local addresses.
// - `channel.rs`:    `ReplicationChannel` trait, loopback and null channels.
// - `context.rs`:    `BattleContext`: role, RNG, combat log, presentation
//                    events, sequencing, collaborators.
// - `replicator.rs`: `GuestReplicator` dispatch table and sequence checks.
// - `effects/`:      Content modules (damage, resistance, cannibalism,
//                    inventing, frost bite, battle cry, healing potion,
//                    thorned mail).
// - `peer.rs`:       `BattlePeer`, state + context + replicator bundle.
// - `error.rs`:      `EffectSkip`, `ReplicationError`, `ChannelError`.
//
// Perspective: each peer stores heroes under `LocalSide` (player/opponent).
// Only `AbsoluteSide` (host/guest) crosses the wire.
//
// Determinism: randomness comes solely from the host's `BattleRng`. A guest
// context has no RNG (`rng_mut` returns `None`).

pub mod channel;
pub mod config;
pub mod context;
pub mod effects;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod locator;
pub mod peer;
pub mod replicator;
pub mod state;
pub mod status;
pub mod types;

pub use channel::{LoopbackChannel, LoopbackReceiver, NullChannel, ReplicationChannel};
pub use config::{BattleConfig, ConfigError};
pub use context::{BattleContext, HandManager, PeerRole, PresentationEvent};
pub use entity::{Creature, EntityAddress, Hero};
pub use error::{ChannelError, EffectSkip, ReplicationError};
pub use peer::BattlePeer;
pub use replicator::{GuestReplicator, ReplicatedEffect, ReplicatorStats};
pub use state::BattleState;

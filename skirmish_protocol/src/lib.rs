// skirmish_protocol — wire vocabulary for host-authoritative battle sync.
//
// Shared by the battle crate (`skirmish_battle`), which builds and consumes
// update envelopes, and the relay crate (`skirmish_relay`), which carries
// them between peers over TCP. Has no dependency on battle state.
//
// Module overview:
// - `types.rs`:    Sides, positions, `EntityRef`, `EffectType`,
//                  `UpdateSequence`, `PeerId`.
// - `envelope.rs`: `UpdateEnvelope`: one effect outcome, host → guest.
// - `message.rs`:  `ClientMessage` / `ServerMessage` for the relay session.
// - `framing.rs`:  4-byte big-endian length prefix + JSON payload.
//
// Design decisions:
// - **References, not objects.** Envelopes carry `EntityRef` coordinates
//   only. Live entities hold back-references to their hero and battle and
//   cannot be meaningfully transmitted.
// - **Outcomes are opaque JSON.** The relay and this crate never interpret
//   an outcome; content modules decode their own typed outcome structs.
// - **Blocking std I/O.** Framing works over any `Read`/`Write`, matching
//   the relay's thread-per-reader design.

pub mod envelope;
pub mod framing;
pub mod message;
pub mod types;

pub use envelope::UpdateEnvelope;
pub use framing::{FrameError, MAX_FRAME_SIZE, read_frame, write_frame};
pub use message::{ClientMessage, PROTOCOL_VERSION, PeerInfo, ServerMessage};
pub use types::{
    AbsoluteSide, EffectType, EntityKind, EntityRef, LocalSide, PeerId, Position, UpdateSequence,
};

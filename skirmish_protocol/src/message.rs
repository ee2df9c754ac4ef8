// Protocol messages between battle peers and the relay.
//
// - `ClientMessage`: sent by a peer (host or guest) to the relay.
// - `ServerMessage`: sent by the relay to peers.
//
// The relay assigns absolute sides on join: the first peer becomes the host
// and every later peer mirrors the battle from the guest side. Only the host
// may send `Update`; the relay answers any other sender with
// `UpdateRejected` and forwards nothing.
//
// The relay never inspects envelope outcomes. It forwards `Update` envelopes
// in arrival order, which is the host's dispatch order.

use serde::{Deserialize, Serialize};

use crate::envelope::UpdateEnvelope;
use crate::types::{AbsoluteSide, PeerId, UpdateSequence};

/// Current wire protocol version, checked during the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages sent by a peer to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the battle session.
    Hello {
        protocol_version: u32,
        peer_name: String,
        /// Hash of the battle config; all peers must agree.
        content_hash: u64,
        session_password: Option<String>,
    },
    /// An authoritative effect outcome (host only).
    Update { envelope: UpdateEnvelope },
    /// Hash of the sender's battle state after applying `sequence`.
    Checksum { sequence: UpdateSequence, hash: u64 },
    /// Host starts the battle.
    StartBattle { seed: u64 },
    /// Host ends the battle.
    EndBattle,
    Chat { text: String },
    /// Peer is leaving gracefully.
    Goodbye,
}

/// Messages sent by the relay to a peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted.
    Welcome {
        peer_id: PeerId,
        session_name: String,
        side: AbsoluteSide,
        peers: Vec<PeerInfo>,
    },
    /// Handshake rejected.
    Rejected { reason: String },
    /// A forwarded host envelope.
    Update { envelope: UpdateEnvelope },
    /// The sender's `Update` was refused.
    UpdateRejected { reason: String },
    PeerJoined { peer: PeerInfo },
    PeerLeft { peer_id: PeerId, name: String },
    /// Battle is starting; the host seeds its RNG with `seed`.
    BattleStart { seed: u64 },
    BattleEnd,
    /// Host and guest state hashes disagreed after `sequence`.
    DesyncDetected { sequence: UpdateSequence },
    ChatBroadcast {
        from: PeerId,
        name: String,
        text: String,
    },
}

/// Public identity of a connected peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    pub name: String,
    pub side: AbsoluteSide,
}

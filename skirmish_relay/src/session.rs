// Session state for the battle relay.
//
// `Session` is the central data structure that `server.rs` drives. It tracks
// connected peers, which of them is the host, whether a battle is running,
// the last forwarded update sequence, and per-sequence checksums for desync
// detection. All mutation happens through methods called from the server's
// single event-loop thread, so there is no internal locking and forwarded
// updates leave in exactly the order they arrived.
//
// Key responsibilities:
// - Peer management: add/remove peers, assign IDs and absolute sides,
//   protocol/content-hash/password checks on join. The first peer to join
//   an empty host slot becomes the host; everyone else is a guest.
// - Update forwarding: only the host may send `Update`. Anything else is
//   answered with `UpdateRejected` and never forwarded. Host envelopes whose
//   sequence is not above the last forwarded one are dropped as duplicates.
// - Battle lifecycle: `StartBattle` / `EndBattle` are host-only.
// - Desync detection: collect per-peer checksums for each sequence and
//   compare once every connected peer has reported.
//
// Writing to peers: `Session` holds cloned `TcpStream` write halves wrapped
// in `BufWriter`. Write errors on one peer are logged and otherwise
// ignored; that peer's reader thread will see the broken pipe and report a
// disconnect.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::TcpStream;

use skirmish_protocol::{
    AbsoluteSide, PROTOCOL_VERSION, PeerId, PeerInfo, ServerMessage, UpdateEnvelope,
    UpdateSequence, write_frame,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a `Hello` was refused. The display string is sent back verbatim in
/// `ServerMessage::Rejected`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinRejection {
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("session is full")]
    SessionFull,
    #[error("protocol version mismatch (relay {relay}, peer {peer})")]
    ProtocolMismatch { relay: u32, peer: u32 },
    #[error("battle content mismatch")]
    ContentMismatch,
}

/// Relay session for a single battle.
pub struct Session {
    pub name: String,
    password: Option<String>,
    host_id: Option<PeerId>,
    peers: BTreeMap<PeerId, PeerState>,
    next_peer_id: u32,
    max_peers: u32,

    // Set by the first peer; every later peer must match.
    content_hash: Option<u64>,

    battle_started: bool,
    last_forwarded: UpdateSequence,

    checksums: BTreeMap<UpdateSequence, BTreeMap<PeerId, u64>>,
}

struct PeerState {
    name: String,
    side: AbsoluteSide,
    writer: BufWriter<TcpStream>,
}

impl Session {
    pub fn new(name: String, password: Option<String>, max_peers: u32) -> Self {
        Self {
            name,
            password,
            host_id: None,
            peers: BTreeMap::new(),
            next_peer_id: 0,
            max_peers,
            content_hash: None,
            battle_started: false,
            last_forwarded: UpdateSequence::default(),
            checksums: BTreeMap::new(),
        }
    }

    /// Attempt to add a peer. On success the peer has already been sent
    /// `Welcome` and everyone else `PeerJoined`.
    pub fn add_peer(
        &mut self,
        peer_name: String,
        protocol_version: u32,
        content_hash: u64,
        session_password: Option<String>,
        stream: TcpStream,
    ) -> Result<PeerId, JoinRejection> {
        if protocol_version != PROTOCOL_VERSION {
            return Err(JoinRejection::ProtocolMismatch {
                relay: PROTOCOL_VERSION,
                peer: protocol_version,
            });
        }
        if self.password.is_some() && session_password != self.password {
            return Err(JoinRejection::IncorrectPassword);
        }
        if self.peers.len() as u32 >= self.max_peers {
            return Err(JoinRejection::SessionFull);
        }
        match self.content_hash {
            None => self.content_hash = Some(content_hash),
            Some(expected) if expected != content_hash => {
                return Err(JoinRejection::ContentMismatch);
            }
            Some(_) => {}
        }

        let id = PeerId(self.next_peer_id);
        self.next_peer_id += 1;

        let side = if self.host_id.is_none() {
            self.host_id = Some(id);
            AbsoluteSide::Host
        } else {
            AbsoluteSide::Guest
        };
        let info = PeerInfo {
            id,
            name: peer_name.clone(),
            side,
        };

        let mut peers = self.peer_list();
        peers.push(info.clone());

        self.broadcast(&ServerMessage::PeerJoined { peer: info });

        self.peers.insert(
            id,
            PeerState {
                name: peer_name,
                side,
                writer: BufWriter::new(stream),
            },
        );
        let welcome = ServerMessage::Welcome {
            peer_id: id,
            session_name: self.name.clone(),
            side,
            peers,
        };
        self.send_to(id, &welcome);
        info!(peer = id.0, ?side, "peer joined");

        Ok(id)
    }

    /// Remove a peer and broadcast their departure. If the host leaves
    /// mid-battle the battle ends for everyone.
    pub fn remove_peer(&mut self, peer_id: PeerId) {
        let Some(ps) = self.peers.remove(&peer_id) else {
            return;
        };
        info!(peer = peer_id.0, name = %ps.name, "peer left");
        self.broadcast(&ServerMessage::PeerLeft {
            peer_id,
            name: ps.name,
        });
        for per_sequence in self.checksums.values_mut() {
            per_sequence.remove(&peer_id);
        }
        if self.host_id == Some(peer_id) {
            self.host_id = None;
            if self.battle_started {
                self.battle_started = false;
                warn!("host left during battle, ending it");
                self.broadcast(&ServerMessage::BattleEnd);
            }
        }
    }

    /// Forward a host envelope to every guest, in arrival order.
    pub fn forward_update(&mut self, from: PeerId, envelope: UpdateEnvelope) {
        if self.host_id != Some(from) {
            warn!(peer = from.0, effect_type = %envelope.effect_type(), "update from non-host peer refused");
            self.send_to(
                from,
                &ServerMessage::UpdateRejected {
                    reason: "only the host may send updates".into(),
                },
            );
            return;
        }
        if !self.battle_started {
            self.send_to(
                from,
                &ServerMessage::UpdateRejected {
                    reason: "battle has not started".into(),
                },
            );
            return;
        }
        let sequence = envelope.sequence();
        if sequence.0 != 0 {
            if sequence <= self.last_forwarded {
                debug!(sequence = sequence.0, "dropping duplicate host update");
                return;
            }
            self.last_forwarded = sequence;
        }

        let msg = ServerMessage::Update { envelope };
        let guests: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(id, _)| Some(**id) != self.host_id)
            .map(|(id, _)| *id)
            .collect();
        for id in guests {
            self.send_to(id, &msg);
        }
    }

    /// Record a checksum from a peer. Once every connected peer has
    /// reported for `sequence`, broadcasts `DesyncDetected` if they differ.
    pub fn record_checksum(&mut self, peer_id: PeerId, sequence: UpdateSequence, hash: u64) {
        let entry = self.checksums.entry(sequence).or_default();
        entry.insert(peer_id, hash);

        if entry.len() == self.peers.len() && self.peers.len() > 1 {
            let mut values = entry.values();
            let all_match = match values.next() {
                Some(first) => values.all(|v| v == first),
                None => true,
            };
            if !all_match {
                warn!(sequence = sequence.0, "desync detected");
                self.broadcast(&ServerMessage::DesyncDetected { sequence });
            }
            self.checksums.retain(|s, _| *s > sequence);
        }
    }

    /// Host-only. Broadcasts `BattleStart` and resets update tracking.
    pub fn start_battle(&mut self, peer_id: PeerId, seed: u64) {
        if self.host_id != Some(peer_id) || self.battle_started {
            return;
        }
        self.battle_started = true;
        self.last_forwarded = UpdateSequence::default();
        self.checksums.clear();
        info!(seed, "battle started");
        self.broadcast(&ServerMessage::BattleStart { seed });
    }

    /// Host-only.
    pub fn end_battle(&mut self, peer_id: PeerId) {
        if self.host_id != Some(peer_id) || !self.battle_started {
            return;
        }
        self.battle_started = false;
        info!("battle ended");
        self.broadcast(&ServerMessage::BattleEnd);
    }

    pub fn chat(&mut self, peer_id: PeerId, text: String) {
        let name = self
            .peers
            .get(&peer_id)
            .map(|ps| ps.name.clone())
            .unwrap_or_default();
        self.broadcast(&ServerMessage::ChatBroadcast {
            from: peer_id,
            name,
            text,
        });
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn host_id(&self) -> Option<PeerId> {
        self.host_id
    }

    pub fn is_battle_started(&self) -> bool {
        self.battle_started
    }

    pub fn last_forwarded(&self) -> UpdateSequence {
        self.last_forwarded
    }

    pub fn peer_list(&self) -> Vec<PeerInfo> {
        self.peers
            .iter()
            .map(|(id, ps)| PeerInfo {
                id: *id,
                name: ps.name.clone(),
                side: ps.side,
            })
            .collect()
    }

    fn send_to(&mut self, peer_id: PeerId, msg: &ServerMessage) {
        let Some(ps) = self.peers.get_mut(&peer_id) else {
            return;
        };
        if let Err(e) = write_frame(&mut ps.writer, msg) {
            debug!(peer = peer_id.0, error = %e, "write to peer failed");
        }
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        let ids: Vec<PeerId> = self.peers.keys().copied().collect();
        for id in ids {
            self.send_to(id, msg);
        }
    }
}

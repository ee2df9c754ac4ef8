// Test-only battle peer for multiplayer integration tests.
//
// Wraps the real `NetClient` (from `skirmish_relay::client`) and a real
// `BattlePeer` (from `skirmish_battle::peer`) to provide a synchronous,
// test-friendly API for exercising the full pipeline:
// host computes -> RelayChannel -> relay -> guest NetClient -> replicator.
//
// The only test-specific code here is the blocking loops around
// `NetClient::poll()`. Networking and replication use the same code paths
// a real battle would.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use skirmish_battle::entity::{Creature, Hero};
use skirmish_battle::types::{Ability, AbilitySet, Artifact, CreatureSpecial};
use skirmish_battle::{BattleConfig, BattlePeer, BattleState, ReplicationError};
use skirmish_protocol::{AbsoluteSide, LocalSide, Position, ServerMessage, UpdateSequence};
use skirmish_relay::client::{NetClient, RelayChannel};

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Host-perspective line-up shared by the scenarios.
///
/// Host (`Player`): Ghuul (Cannibalism 2, Imp + level-2 Frost Wyrm) at left,
/// Tinker (Inventing 2) at right. Guest (`Opponent`): Sera (Resistance 2,
/// Thorned Mail) at center.
pub fn arena() -> BattleState {
    BattleState::new()
        .with_hero(
            LocalSide::Player,
            Position::Left,
            Hero::new("Ghuul", 100, 12)
                .with_abilities(AbilitySet::new().with(Ability::Cannibalism, 2))
                .with_creature(Creature::new("Imp", 20, 4))
                .with_creature(
                    Creature::new("Frost Wyrm", 40, 8)
                        .with_level(2)
                        .with_special(CreatureSpecial::FrostBite),
                ),
        )
        .with_hero(
            LocalSide::Player,
            Position::Right,
            Hero::new("Tinker", 70, 5)
                .with_abilities(AbilitySet::new().with(Ability::Inventing, 2)),
        )
        .with_hero(
            LocalSide::Opponent,
            Position::Center,
            Hero::new("Sera", 90, 8)
                .with_abilities(AbilitySet::new().with(Ability::Resistance, 2))
                .with_artifact(Artifact::ThornedMail),
        )
}

/// A test battle peer wrapping a real NetClient and BattlePeer.
pub struct TestPeer {
    client: NetClient,
    config: BattleConfig,
    pub side: AbsoluteSide,
    pub battle: Option<BattlePeer>,
    /// Replication failures seen while applying forwarded updates.
    pub failures: Vec<ReplicationError>,
    /// Messages that were neither updates nor handled lifecycle events.
    pub other: Vec<ServerMessage>,
}

impl TestPeer {
    /// Connect to a relay and perform the Hello handshake.
    pub fn connect(addr: SocketAddr, name: &str, config: BattleConfig) -> Self {
        let (client, info) =
            NetClient::connect(&addr.to_string(), name, config.content_hash(), None)
                .expect("TestPeer::connect failed");
        Self {
            client,
            config,
            side: info.side,
            battle: None,
            failures: Vec::new(),
            other: Vec::new(),
        }
    }

    pub fn battle(&self) -> &BattlePeer {
        self.battle.as_ref().expect("battle not started")
    }

    pub fn battle_mut(&mut self) -> &mut BattlePeer {
        self.battle.as_mut().expect("battle not started")
    }

    /// Host only.
    pub fn send_start_battle(&self, seed: u64) {
        self.client
            .send_start_battle(seed)
            .expect("send_start_battle failed");
    }

    /// Host only.
    pub fn send_end_battle(&self) {
        self.client
            .send_end_battle()
            .expect("send_end_battle failed");
    }

    pub fn send_chat(&self, text: &str) {
        self.client.send_chat(text).expect("send_chat failed");
    }

    /// Blocking poll until a chat line with exactly `text` has arrived,
    /// including one already collected. Peers use unique lines as a barrier:
    /// the relay handles each connection's messages in order, so once a
    /// peer's line is back, everything it sent earlier has been processed.
    pub fn wait_for_chat(&mut self, text: &str) {
        let seen = |m: &ServerMessage| {
            matches!(m, ServerMessage::ChatBroadcast { text: t, .. } if t == text)
        };
        if self.other.iter().any(seen) {
            return;
        }
        self.poll_until(text, seen);
    }

    /// The raw TCP replication channel, regardless of role.
    pub fn raw_channel(&self) -> RelayChannel {
        self.client.update_channel()
    }

    /// Blocking poll until BattleStart. Builds the `BattlePeer` from the
    /// host-perspective `arena` (mirrored for the guest). Returns the seed.
    pub fn poll_until_battle_start(&mut self, arena: &BattleState) -> u64 {
        let start = Instant::now();
        loop {
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for BattleStart"
            );
            let mut started = None;
            for msg in self.client.poll() {
                match msg {
                    ServerMessage::BattleStart { seed } if started.is_none() => {
                        self.battle = Some(self.build_peer(arena, seed));
                        started = Some(seed);
                    }
                    // Updates can share a batch with BattleStart.
                    msg if started.is_some() => self.absorb(msg),
                    msg => self.other.push(msg),
                }
            }
            if let Some(seed) = started {
                return seed;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn build_peer(&self, arena: &BattleState, seed: u64) -> BattlePeer {
        match self.side {
            AbsoluteSide::Host => BattlePeer::host(
                arena.clone(),
                self.config.clone(),
                seed,
                self.client.update_channel(),
            ),
            AbsoluteSide::Guest => BattlePeer::guest(arena.mirrored(), self.config.clone()),
        }
    }

    /// Guest only. Blocking poll until the replicator has consumed the
    /// envelope with `sequence`, whether it applied or was dropped.
    pub fn poll_until_sequence(&mut self, sequence: UpdateSequence) {
        let start = Instant::now();
        loop {
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for update {}",
                sequence.0
            );
            for msg in self.client.poll() {
                self.absorb(msg);
            }
            if self.last_seen() >= sequence {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Blocking poll until `pred` matches an incoming message. Updates
    /// that arrive meanwhile are still applied.
    pub fn poll_until(&mut self, what: &str, pred: impl Fn(&ServerMessage) -> bool) {
        let start = Instant::now();
        loop {
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            for msg in self.client.poll() {
                let hit = pred(&msg);
                self.absorb(msg);
                if hit {
                    return;
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Non-blocking: apply any pending updates.
    pub fn drain(&mut self) {
        for msg in self.client.poll() {
            self.absorb(msg);
        }
    }

    /// Report the current checksum, tagged with the last sequence this peer
    /// sent (host) or applied (guest).
    pub fn report_checksum(&self) {
        let battle = self.battle();
        let sequence = match self.side {
            AbsoluteSide::Host => battle.ctx.last_sent(),
            AbsoluteSide::Guest => self.last_seen(),
        };
        self.client
            .send_checksum(sequence, battle.checksum())
            .expect("send_checksum failed");
    }

    /// True if a `DesyncDetected` has been received.
    pub fn saw_desync(&self) -> bool {
        self.other
            .iter()
            .any(|m| matches!(m, ServerMessage::DesyncDetected { .. }))
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    fn last_seen(&self) -> UpdateSequence {
        self.battle
            .as_ref()
            .map(BattlePeer::last_applied)
            .unwrap_or_default()
    }

    fn absorb(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Update { envelope } => {
                let battle = self.battle.as_mut().expect("update before battle start");
                if let Err(e) = battle.receive(&envelope) {
                    self.failures.push(e);
                }
            }
            other => self.other.push(other),
        }
    }
}

// BattleContext: the per-peer battle services handed to every effect.
//
// Effect computers and guest handlers never reach for globals. Everything
// they may consult or emit goes through the `&mut BattleContext` they are
// given:
//
// - role and perspective (`is_authoritative`, `my_side`);
// - the balance config;
// - the host's PRNG (absent on guests, who must never roll);
// - the combat log, mirrored to `tracing` under the `combat_log` target;
// - the replication channel (`send_update` / `publish`), which stamps each
//   envelope with the next `UpdateSequence` before handing it off;
// - presentation events, an abstract queue a frontend drains to drive
//   health bars and visual cues;
// - optional external collaborators (`HandManager`).
//
// `speed_adjusted_delay` only computes cosmetic pacing. The core never
// sleeps or waits on it.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use skirmish_prng::BattleRng;
use skirmish_protocol::{AbsoluteSide, UpdateEnvelope, UpdateSequence};
use tracing::{debug, error, info};

use crate::channel::{NullChannel, ReplicationChannel};
use crate::config::BattleConfig;
use crate::entity::EntityAddress;
use crate::error::ChannelError;
use crate::types::{CounterKind, LogSeverity, StatusEffect};

/// Whether this peer computes outcomes or mirrors them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerRole {
    Host,
    Guest,
}

/// Deck/hand collaborator. Returns the number of cards actually drawn,
/// which may be fewer than requested when the deck runs out.
pub trait HandManager {
    fn draw_cards(&mut self, owner: AbsoluteSide, count: u32) -> u32;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombatLogEntry {
    pub message: String,
    pub severity: LogSeverity,
}

/// Short visual cue names a frontend maps to its own animations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualCue {
    Strike,
    Shield,
    Heal,
    Frost,
    Rally,
    Thorns,
    Invent,
    Potion,
}

/// Local-only presentation output. Never replicated; each peer emits its
/// own from the state it holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentationEvent {
    HealthChanged {
        entity: EntityAddress,
        current_hp: u32,
        max_hp: u32,
    },
    StatusChanged {
        entity: EntityAddress,
        effect: StatusEffect,
        stacks: u32,
    },
    CounterChanged {
        entity: EntityAddress,
        counter: CounterKind,
        value: u32,
    },
    CreatureRemoved {
        owner: EntityAddress,
        index: u32,
    },
    Cue {
        entity: EntityAddress,
        cue: VisualCue,
        delay: Duration,
    },
}

pub struct BattleContext {
    role: PeerRole,
    me: AbsoluteSide,
    config: BattleConfig,
    rng: Option<BattleRng>,
    channel: Box<dyn ReplicationChannel>,
    last_sent: UpdateSequence,
    combat_log: Vec<CombatLogEntry>,
    presentation: Vec<PresentationEvent>,
    hand: Option<Box<dyn HandManager>>,
}

impl fmt::Debug for BattleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleContext")
            .field("role", &self.role)
            .field("me", &self.me)
            .field("last_sent", &self.last_sent)
            .field("combat_log", &self.combat_log.len())
            .field("presentation", &self.presentation.len())
            .field("hand", &self.hand.is_some())
            .finish()
    }
}

impl BattleContext {
    /// Authoritative peer, seeded for this battle.
    pub fn host(
        config: BattleConfig,
        seed: u64,
        channel: impl ReplicationChannel + 'static,
    ) -> Self {
        Self {
            role: PeerRole::Host,
            me: AbsoluteSide::Host,
            config,
            rng: Some(BattleRng::new(seed)),
            channel: Box::new(channel),
            last_sent: UpdateSequence::default(),
            combat_log: Vec::new(),
            presentation: Vec::new(),
            hand: None,
        }
    }

    /// Mirroring peer. Has no RNG and no outbound channel.
    pub fn guest(config: BattleConfig) -> Self {
        Self {
            role: PeerRole::Guest,
            me: AbsoluteSide::Guest,
            config,
            rng: None,
            channel: Box::new(NullChannel),
            last_sent: UpdateSequence::default(),
            combat_log: Vec::new(),
            presentation: Vec::new(),
            hand: None,
        }
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn is_authoritative(&self) -> bool {
        self.role == PeerRole::Host
    }

    pub fn is_host(&self) -> bool {
        self.me == AbsoluteSide::Host
    }

    pub fn my_side(&self) -> AbsoluteSide {
        self.me
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> Option<&mut BattleRng> {
        self.rng.as_mut()
    }

    pub fn set_hand_manager(&mut self, hand: impl HandManager + 'static) {
        self.hand = Some(Box::new(hand));
    }

    pub fn hand_manager_mut(&mut self) -> Option<&mut (dyn HandManager + 'static)> {
        self.hand.as_deref_mut()
    }

    pub fn add_combat_log(&mut self, message: impl Into<String>, severity: LogSeverity) {
        let message = message.into();
        info!(target: "combat_log", ?severity, "{message}");
        self.combat_log.push(CombatLogEntry { message, severity });
    }

    pub fn combat_log(&self) -> &[CombatLogEntry] {
        &self.combat_log
    }

    /// Stamp and send an envelope. Returns the sequence it was given.
    pub fn send_update(
        &mut self,
        envelope: UpdateEnvelope,
    ) -> Result<UpdateSequence, ChannelError> {
        if !self.is_authoritative() {
            return Err(ChannelError::NotAuthoritative);
        }
        let sequence = self.last_sent.next();
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let envelope = envelope.dispatched(sequence, timestamp_ms);
        self.channel.send(&envelope)?;
        self.last_sent = sequence;
        debug!(effect_type = %envelope.effect_type(), sequence = sequence.0, "update sent");
        Ok(sequence)
    }

    /// `send_update` for effect code: state has already changed, so a
    /// transport failure is logged rather than propagated.
    pub fn publish(&mut self, envelope: UpdateEnvelope) -> Option<UpdateSequence> {
        let effect_type = envelope.effect_type().clone();
        match self.send_update(envelope) {
            Ok(sequence) => Some(sequence),
            Err(e) => {
                error!(%effect_type, error = %e, "failed to send update");
                None
            }
        }
    }

    /// Sequence number of the most recent envelope this peer sent.
    pub fn last_sent(&self) -> UpdateSequence {
        self.last_sent
    }

    /// Scale a base animation delay by the configured battle speed.
    pub fn speed_adjusted_delay(&self, base_ms: u64) -> Duration {
        let speed = u64::from(self.config.battle_speed_percent.max(1));
        Duration::from_millis(base_ms.saturating_mul(100) / speed)
    }

    pub fn push_presentation(&mut self, event: PresentationEvent) {
        self.presentation.push(event);
    }

    pub fn pending_presentation(&self) -> &[PresentationEvent] {
        &self.presentation
    }

    pub fn drain_presentation(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.presentation)
    }

    /// Battle-end sweep: drop any cues nobody consumed. Idempotent.
    pub fn cleanup(&mut self) {
        if !self.presentation.is_empty() {
            debug!(dropped = self.presentation.len(), "clearing pending presentation");
        }
        self.presentation.clear();
    }
}

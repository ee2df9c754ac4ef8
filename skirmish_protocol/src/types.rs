// Reference and identifier types shared by every peer.
//
// An `EntityRef` is the only way one peer names a hero or creature to the
// other. It carries nothing but coordinates (side, position, creature index),
// never entity data, so it stays small and free of back-references.
//
// Sides come in two flavors:
// - `AbsoluteSide` (`host` / `guest`) is the same on both peers and is the
//   only side label that appears on the wire.
// - `LocalSide` (`player` / `opponent`) is a per-peer perspective, derived
//   from the absolute side and the peer's own absolute side. It is never
//   transmitted.
//
// `EffectType` is the string discriminator used to route an envelope to its
// guest-side handler. `UpdateSequence` and `PeerId` are compact relay-scoped
// counters.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Side label that is identical on both peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsoluteSide {
    Host,
    Guest,
}

impl AbsoluteSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Host => Self::Guest,
            Self::Guest => Self::Host,
        }
    }

    /// Perspective of this side as seen by a peer sitting on `me`.
    pub fn to_local(self, me: AbsoluteSide) -> LocalSide {
        if self == me {
            LocalSide::Player
        } else {
            LocalSide::Opponent
        }
    }
}

/// Per-peer perspective label. Never serialized into envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalSide {
    Player,
    Opponent,
}

impl LocalSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }

    /// Inverse of `AbsoluteSide::to_local`.
    pub fn to_absolute(self, me: AbsoluteSide) -> AbsoluteSide {
        match self {
            Self::Player => me,
            Self::Opponent => me.opposite(),
        }
    }
}

/// Formation slot of a hero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Left,
    Center,
    Right,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Left, Position::Center, Position::Right];
}

/// Whether a reference names the hero in a slot or one of its creatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum EntityKind {
    Hero,
    Creature {
        #[serde(rename = "creature_index")]
        index: u32,
    },
}

/// Wire reference to a hero or creature.
///
/// Serialized flat: `{"absolute_side":"host","position":"left",
/// "entity_type":"creature","creature_index":2}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub absolute_side: AbsoluteSide,
    pub position: Position,
    #[serde(flatten)]
    pub kind: EntityKind,
}

impl EntityRef {
    pub fn hero(absolute_side: AbsoluteSide, position: Position) -> Self {
        Self {
            absolute_side,
            position,
            kind: EntityKind::Hero,
        }
    }

    pub fn creature(absolute_side: AbsoluteSide, position: Position, index: u32) -> Self {
        Self {
            absolute_side,
            position,
            kind: EntityKind::Creature { index },
        }
    }

    pub fn is_creature(&self) -> bool {
        matches!(self.kind, EntityKind::Creature { .. })
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.absolute_side {
            AbsoluteSide::Host => "host",
            AbsoluteSide::Guest => "guest",
        };
        let pos = match self.position {
            Position::Left => "left",
            Position::Center => "center",
            Position::Right => "right",
        };
        match self.kind {
            EntityKind::Hero => write!(f, "{side}/{pos}"),
            EntityKind::Creature { index } => write!(f, "{side}/{pos}#{index}"),
        }
    }
}

/// Discriminator that routes an envelope to its guest-side handler.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectType(Cow<'static, str>);

impl EffectType {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EffectType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-assigned, monotonically increasing envelope number. Zero means
/// "not yet dispatched".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UpdateSequence(pub u64);

impl UpdateSequence {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Relay-assigned peer ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u32);

//! Zone identifiers.
//!
//! Library, hand and graveyard belong to a player; battlefield, stack,
//! exile and command are shared. Whether a zone is ordered or hidden is a
//! property of its kind.

use serde::{Deserialize, Serialize};

use crate::core::PlayerId;

/// Zone kind, without an owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Library,
    Hand,
    Battlefield,
    Graveyard,
    Exile,
    Stack,
    Command,
}

impl ZoneKind {
    /// The concrete zone of this kind for `owner`.
    #[must_use]
    pub const fn zone_for(self, owner: PlayerId) -> ZoneId {
        match self {
            ZoneKind::Library => ZoneId::Library(owner),
            ZoneKind::Hand => ZoneId::Hand(owner),
            ZoneKind::Graveyard => ZoneId::Graveyard(owner),
            ZoneKind::Battlefield => ZoneId::Battlefield,
            ZoneKind::Exile => ZoneId::Exile,
            ZoneKind::Stack => ZoneId::Stack,
            ZoneKind::Command => ZoneId::Command,
        }
    }
}

/// Zone visibility rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneVisibility {
    /// All cards visible to all players.
    Public,
    /// Cards visible only to the zone owner.
    OwnerOnly,
    /// Cards not visible to anyone.
    Hidden,
}

/// A concrete zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZoneId {
    Library(PlayerId),
    Hand(PlayerId),
    Battlefield,
    Graveyard(PlayerId),
    Exile,
    Stack,
    Command,
}

impl ZoneId {
    #[must_use]
    pub const fn kind(self) -> ZoneKind {
        match self {
            ZoneId::Library(_) => ZoneKind::Library,
            ZoneId::Hand(_) => ZoneKind::Hand,
            ZoneId::Battlefield => ZoneKind::Battlefield,
            ZoneId::Graveyard(_) => ZoneKind::Graveyard,
            ZoneId::Exile => ZoneKind::Exile,
            ZoneId::Stack => ZoneKind::Stack,
            ZoneId::Command => ZoneKind::Command,
        }
    }

    /// Owner of a per-player zone.
    #[must_use]
    pub const fn owner(self) -> Option<PlayerId> {
        match self {
            ZoneId::Library(p) | ZoneId::Hand(p) | ZoneId::Graveyard(p) => Some(p),
            _ => None,
        }
    }

    /// Whether card order is significant.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        matches!(self, ZoneId::Library(_) | ZoneId::Graveyard(_) | ZoneId::Stack)
    }

    #[must_use]
    pub const fn visibility(self) -> ZoneVisibility {
        match self {
            ZoneId::Library(_) => ZoneVisibility::Hidden,
            ZoneId::Hand(_) => ZoneVisibility::OwnerOnly,
            _ => ZoneVisibility::Public,
        }
    }

    #[must_use]
    pub const fn is_battlefield(self) -> bool {
        matches!(self, ZoneId::Battlefield)
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneId::Library(p) => write!(f, "Library({})", p.0),
            ZoneId::Hand(p) => write!(f, "Hand({})", p.0),
            ZoneId::Battlefield => f.write_str("Battlefield"),
            ZoneId::Graveyard(p) => write!(f, "Graveyard({})", p.0),
            ZoneId::Exile => f.write_str("Exile"),
            ZoneId::Stack => f.write_str("Stack"),
            ZoneId::Command => f.write_str("Command"),
        }
    }
}

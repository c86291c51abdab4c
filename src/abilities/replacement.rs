//! Zone-change replacement effects.
//!
//! A replacement watches for an object about to move (optionally from or to
//! a particular zone kind) and changes how the move happens. It comes either
//! from a `Replacement` ability of an object, active while the ability is,
//! or from a resolved effect as a floating [`ReplacementEffect`].

use serde::{Deserialize, Serialize};

use crate::cards::CounterKind;
use crate::core::{ObjectId, PlayerId, Timestamp};
use crate::effects::ObjectFilter;
use crate::layers::{Duration, EffectId};
use crate::zones::ZoneKind;

/// What happens instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReplacementAction {
    /// The object enters tapped.
    EntersTapped,
    /// The object enters with counters on it.
    EntersWithCounters { kind: CounterKind, amount: u32 },
    /// The controller may choose an object matching the filter; the
    /// entering object is a copy of it.
    EntersAsCopyOf(ObjectFilter),
    /// The object goes to another zone instead.
    ChangeDestination(ZoneKind),
}

/// Which moves a replacement applies to, and what it does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplacementSpec {
    /// The moving object. Evaluated against the object as it is before the
    /// move, relative to the replacement's source.
    pub affected: ObjectFilter,
    pub from: Option<ZoneKind>,
    pub to: Option<ZoneKind>,
    pub action: ReplacementAction,
}

impl ReplacementSpec {
    /// "<this> enters tapped."
    #[must_use]
    pub fn enters_tapped() -> Self {
        Self {
            affected: ObjectFilter::Source,
            from: None,
            to: Some(ZoneKind::Battlefield),
            action: ReplacementAction::EntersTapped,
        }
    }

    /// "<this> enters with N counters."
    #[must_use]
    pub fn enters_with_counters(kind: CounterKind, amount: u32) -> Self {
        Self {
            affected: ObjectFilter::Source,
            from: None,
            to: Some(ZoneKind::Battlefield),
            action: ReplacementAction::EntersWithCounters { kind, amount },
        }
    }

    /// "You may have <this> enter as a copy of <filter>."
    #[must_use]
    pub fn enters_as_copy_of(filter: ObjectFilter) -> Self {
        Self {
            affected: ObjectFilter::Source,
            from: None,
            to: Some(ZoneKind::Battlefield),
            action: ReplacementAction::EntersAsCopyOf(filter),
        }
    }

    /// "If <affected> would die, exile it instead."
    #[must_use]
    pub fn exile_instead_of_dying(affected: ObjectFilter) -> Self {
        Self {
            affected,
            from: Some(ZoneKind::Battlefield),
            to: Some(ZoneKind::Graveyard),
            action: ReplacementAction::ChangeDestination(ZoneKind::Exile),
        }
    }

    /// Whether a move between these zone kinds is the kind this watches.
    #[must_use]
    pub fn watches(&self, from: Option<ZoneKind>, to: ZoneKind) -> bool {
        self.to.map_or(true, |kind| kind == to) && self.from.map_or(true, |kind| Some(kind) == from)
    }
}

/// A replacement created by a resolved effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplacementEffect {
    pub id: EffectId,
    pub spec: ReplacementSpec,
    pub source: Option<ObjectId>,
    pub controller: PlayerId,
    pub duration: Duration,
    pub timestamp: Timestamp,
    /// Locked set of objects it applies to, when created for specific ones.
    pub objects: Option<Vec<ObjectId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watches() {
        let spec = ReplacementSpec::exile_instead_of_dying(ObjectFilter::creature());
        assert!(spec.watches(Some(ZoneKind::Battlefield), ZoneKind::Graveyard));
        assert!(!spec.watches(Some(ZoneKind::Hand), ZoneKind::Graveyard));
        assert!(!spec.watches(Some(ZoneKind::Battlefield), ZoneKind::Exile));

        let spec = ReplacementSpec::enters_tapped();
        assert!(spec.watches(None, ZoneKind::Battlefield));
        assert!(spec.watches(Some(ZoneKind::Stack), ZoneKind::Battlefield));
    }
}

//! Game events.
//!
//! Producers (zone moves, the resolver, cost payment, turn-based actions)
//! append events to the state's event log. The
//! [`TriggerDetector`](super::TriggerDetector) drains the log when the
//! game next settles and matches each event independently.

use serde::{Deserialize, Serialize};

use crate::cards::CounterKind;
use crate::core::{ObjectId, PlayerId};
use crate::effects::TargetRef;
use crate::rules::Step;
use crate::zones::ZoneId;

/// Something that happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An object moved. `object` is the id it had before the move and
    /// `new_object` the id it has now (`None` for a token that ceased to
    /// exist). A created token has `object == new_object`.
    ZoneChanged {
        object: ObjectId,
        new_object: Option<ObjectId>,
        from: ZoneId,
        to: ZoneId,
        /// Controller before the move.
        controller: PlayerId,
    },
    SpellCast {
        spell: ObjectId,
        controller: PlayerId,
    },
    AbilityActivated {
        source: ObjectId,
        controller: PlayerId,
    },
    DamageDealt {
        source: Option<ObjectId>,
        target: TargetRef,
        amount: i64,
    },
    LifeGained {
        player: PlayerId,
        amount: i64,
    },
    LifeLost {
        player: PlayerId,
        amount: i64,
    },
    CardDrawn {
        player: PlayerId,
        card: ObjectId,
    },
    Discarded {
        player: PlayerId,
        card: ObjectId,
    },
    CountersAdded {
        object: ObjectId,
        kind: CounterKind,
        amount: u32,
    },
    Tapped {
        object: ObjectId,
    },
    Untapped {
        object: ObjectId,
    },
    StepBegan {
        step: Step,
        active: PlayerId,
    },
}

impl GameEvent {
    /// The object the event is about, as seen by triggers. For objects
    /// that entered a zone this is the new id.
    #[must_use]
    pub fn subject(&self) -> Option<ObjectId> {
        match self {
            GameEvent::ZoneChanged {
                object, new_object, to, ..
            } => {
                if to.is_battlefield() || new_object.is_none() {
                    new_object.or(Some(*object))
                } else {
                    Some(*object)
                }
            }
            GameEvent::SpellCast { spell, .. } => Some(*spell),
            GameEvent::AbilityActivated { source, .. } => Some(*source),
            GameEvent::DamageDealt { target, .. } => target.object(),
            GameEvent::CardDrawn { card, .. } | GameEvent::Discarded { card, .. } => Some(*card),
            GameEvent::CountersAdded { object, .. }
            | GameEvent::Tapped { object }
            | GameEvent::Untapped { object } => Some(*object),
            GameEvent::LifeGained { .. } | GameEvent::LifeLost { .. } | GameEvent::StepBegan { .. } => None,
        }
    }

    /// The player the event is about.
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            GameEvent::ZoneChanged { controller, .. }
            | GameEvent::SpellCast { controller, .. }
            | GameEvent::AbilityActivated { controller, .. } => Some(*controller),
            GameEvent::DamageDealt { target, .. } => target.player(),
            GameEvent::LifeGained { player, .. }
            | GameEvent::LifeLost { player, .. }
            | GameEvent::CardDrawn { player, .. }
            | GameEvent::Discarded { player, .. } => Some(*player),
            GameEvent::StepBegan { active, .. } => Some(*active),
            GameEvent::CountersAdded { .. } | GameEvent::Tapped { .. } | GameEvent::Untapped { .. } => None,
        }
    }

    /// The number the event carries.
    #[must_use]
    pub fn amount(&self) -> i64 {
        match self {
            GameEvent::DamageDealt { amount, .. }
            | GameEvent::LifeGained { amount, .. }
            | GameEvent::LifeLost { amount, .. } => *amount,
            GameEvent::CountersAdded { amount, .. } => i64::from(*amount),
            _ => 0,
        }
    }

    /// Whether an object left the battlefield.
    #[must_use]
    pub fn is_leaving_battlefield(&self) -> bool {
        matches!(self, GameEvent::ZoneChanged { from, to, .. } if from.is_battlefield() && !to.is_battlefield())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_change_subject() {
        let dies = GameEvent::ZoneChanged {
            object: ObjectId(1),
            new_object: Some(ObjectId(2)),
            from: ZoneId::Battlefield,
            to: ZoneId::Graveyard(PlayerId(0)),
            controller: PlayerId(0),
        };
        assert_eq!(dies.subject(), Some(ObjectId(1)));
        assert!(dies.is_leaving_battlefield());

        let enters = GameEvent::ZoneChanged {
            object: ObjectId(3),
            new_object: Some(ObjectId(4)),
            from: ZoneId::Hand(PlayerId(0)),
            to: ZoneId::Battlefield,
            controller: PlayerId(0),
        };
        assert_eq!(enters.subject(), Some(ObjectId(4)));
        assert!(!enters.is_leaving_battlefield());
    }

    #[test]
    fn test_amounts() {
        let damage = GameEvent::DamageDealt {
            source: None,
            target: TargetRef::Player(PlayerId(1)),
            amount: 3,
        };
        assert_eq!(damage.amount(), 3);
        assert_eq!(damage.player(), Some(PlayerId(1)));
        assert_eq!(damage.subject(), None);
    }
}

//! Turn structure.
//!
//! Combat is a single step with no attacks: it exists so that
//! beginning-of-combat triggers have somewhere to trigger.

use serde::{Deserialize, Serialize};

use crate::core::PlayerId;

/// Steps of a turn, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    Untap,
    Upkeep,
    Draw,
    PrecombatMain,
    Combat,
    PostcombatMain,
    End,
    Cleanup,
}

impl Step {
    /// The step after this one, or `None` after cleanup.
    #[must_use]
    pub const fn next(self) -> Option<Step> {
        match self {
            Step::Untap => Some(Step::Upkeep),
            Step::Upkeep => Some(Step::Draw),
            Step::Draw => Some(Step::PrecombatMain),
            Step::PrecombatMain => Some(Step::Combat),
            Step::Combat => Some(Step::PostcombatMain),
            Step::PostcombatMain => Some(Step::End),
            Step::End => Some(Step::Cleanup),
            Step::Cleanup => None,
        }
    }

    #[must_use]
    pub const fn is_main(self) -> bool {
        matches!(self, Step::PrecombatMain | Step::PostcombatMain)
    }

    /// Whether players normally receive priority in this step.
    #[must_use]
    pub const fn gives_priority(self) -> bool {
        !matches!(self, Step::Untap | Step::Cleanup)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Untap => "untap",
            Step::Upkeep => "upkeep",
            Step::Draw => "draw",
            Step::PrecombatMain => "precombat main",
            Step::Combat => "combat",
            Step::PostcombatMain => "postcombat main",
            Step::End => "end",
            Step::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Where the game is in the turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// Turn number, starting at 1.
    pub number: u32,
    pub active: PlayerId,
    pub step: Step,
}

impl TurnState {
    #[must_use]
    pub fn new(active: PlayerId) -> Self {
        Self {
            number: 1,
            active,
            step: Step::Untap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        let mut step = Step::Untap;
        let mut seen = vec![step];
        while let Some(next) = step.next() {
            assert!(next > step);
            seen.push(next);
            step = next;
        }
        assert_eq!(seen.len(), 8);
        assert_eq!(step, Step::Cleanup);
    }

    #[test]
    fn test_step_properties() {
        assert!(Step::PrecombatMain.is_main());
        assert!(!Step::Combat.is_main());
        assert!(!Step::Untap.gives_priority());
        assert!(Step::Upkeep.gives_priority());
        assert_eq!(Step::PostcombatMain.to_string(), "postcombat main");
    }
}

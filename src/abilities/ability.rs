//! The four kinds of ability.

use serde::{Deserialize, Serialize};

use super::replacement::ReplacementSpec;
use crate::costs::Cost;
use crate::effects::{Condition, Effect, ObjectFilter, TargetSpec};
use crate::layers::Modification;
use crate::triggers::TriggerSpec;

/// An ability of an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Ability {
    Triggered(TriggeredAbility),
    Activated(ActivatedAbility),
    Static(StaticAbility),
    Replacement(ReplacementSpec),
}

impl Ability {
    #[must_use]
    pub fn as_triggered(&self) -> Option<&TriggeredAbility> {
        match self {
            Ability::Triggered(ability) => Some(ability),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_activated(&self) -> Option<&ActivatedAbility> {
        match self {
            Ability::Activated(ability) => Some(ability),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_static(&self) -> Option<&StaticAbility> {
        match self {
            Ability::Static(ability) => Some(ability),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_replacement(&self) -> Option<&ReplacementSpec> {
        match self {
            Ability::Replacement(spec) => Some(spec),
            _ => None,
        }
    }
}

/// "When/Whenever/At ..., ..."
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAbility {
    pub trigger: TriggerSpec,
    pub targets: Vec<TargetSpec>,
    pub effect: Effect,
    /// Abandon the ability if its source has left its zone by resolution.
    pub requires_source: bool,
}

impl TriggeredAbility {
    pub fn new(trigger: TriggerSpec, effect: Effect) -> Self {
        Self {
            trigger,
            targets: Vec::new(),
            effect,
            requires_source: false,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.targets.push(target);
        self
    }

    #[must_use]
    pub fn requiring_source(mut self) -> Self {
        self.requires_source = true;
        self
    }
}

impl From<TriggeredAbility> for Ability {
    fn from(ability: TriggeredAbility) -> Self {
        Ability::Triggered(ability)
    }
}

/// When an activated ability may be activated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationTiming {
    /// Any time the player has priority.
    #[default]
    Instant,
    /// Main phase, own turn, empty stack.
    Sorcery,
}

/// "<cost>: <effect>"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivatedAbility {
    pub cost: Cost,
    pub targets: Vec<TargetSpec>,
    pub effect: Effect,
    pub timing: ActivationTiming,
    /// Resolves immediately without using the stack. Mana abilities have
    /// no targets.
    pub mana_ability: bool,
    pub requires_source: bool,
}

impl ActivatedAbility {
    pub fn new(cost: Cost, effect: Effect) -> Self {
        Self {
            cost,
            targets: Vec::new(),
            effect,
            timing: ActivationTiming::Instant,
            mana_ability: false,
            requires_source: false,
        }
    }

    /// A mana ability.
    pub fn mana(cost: Cost, effect: Effect) -> Self {
        Self {
            mana_ability: true,
            ..Self::new(cost, effect)
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.targets.push(target);
        self
    }

    #[must_use]
    pub fn sorcery_speed(mut self) -> Self {
        self.timing = ActivationTiming::Sorcery;
        self
    }
}

impl From<ActivatedAbility> for Ability {
    fn from(ability: ActivatedAbility) -> Self {
        Ability::Activated(ability)
    }
}

/// A continuous effect generated for as long as the ability is present.
///
/// `affected` is evaluated relative to the source, so "other Elves you
/// control" and "enchanted creature" are plain filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticAbility {
    pub affected: ObjectFilter,
    pub modifications: Vec<Modification>,
    pub condition: Option<Condition>,
}

impl StaticAbility {
    pub fn new(affected: ObjectFilter, modifications: Vec<Modification>) -> Self {
        Self {
            affected,
            modifications,
            condition: None,
        }
    }

    /// "as long as ..."
    #[must_use]
    pub fn as_long_as(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

impl From<StaticAbility> for Ability {
    fn from(ability: StaticAbility) -> Self {
        Ability::Static(ability)
    }
}

impl From<ReplacementSpec> for Ability {
    fn from(spec: ReplacementSpec) -> Self {
        Ability::Replacement(spec)
    }
}

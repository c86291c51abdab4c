//! Stack entries.

use serde::{Deserialize, Serialize};

use crate::core::{ObjectId, PlayerId};
use crate::effects::{Condition, Effect, TargetRef, TargetSpec, TriggerContext};

/// Unique identifier for a stack entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackEntryId(pub u32);

impl StackEntryId {
    /// Create a new stack entry ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for StackEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StackEntry({})", self.0)
    }
}

/// What an entry is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackEntryKind {
    /// A card on the stack. Its source is the card object in the stack zone.
    Spell,
    ActivatedAbility,
    TriggeredAbility,
}

/// An entry on the stack.
///
/// Targets, modes and X are chosen before the entry is pushed. `effect`
/// holds only the chosen modes of a modal root, and its on-stack amounts
/// are already fixed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    /// Assigned by [`Stack::push`](super::Stack::push).
    pub id: StackEntryId,
    pub kind: StackEntryKind,
    pub source: Option<ObjectId>,
    /// Makes the choices and receives priority after an action.
    pub controller: PlayerId,
    pub targets: Vec<TargetSpec>,
    /// Chosen targets, one list per slot.
    pub chosen: Vec<Vec<TargetRef>>,
    pub modes: Vec<usize>,
    pub effect: Effect,
    pub x: i64,
    pub trigger: Option<TriggerContext>,
    /// Intervening "if" of a triggered ability.
    pub condition: Option<Condition>,
    /// Abandoned on resolution if the source has left its zone.
    pub requires_source: bool,
}

impl StackEntry {
    #[must_use]
    pub fn new(kind: StackEntryKind, controller: PlayerId, effect: Effect) -> Self {
        Self {
            id: StackEntryId::new(0),
            kind,
            source: None,
            controller,
            targets: Vec::new(),
            chosen: Vec::new(),
            modes: Vec::new(),
            effect,
            x: 0,
            trigger: None,
            condition: None,
            requires_source: false,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: ObjectId) -> Self {
        self.source = Some(source);
        self
    }

    /// Target slots and the targets chosen for them.
    #[must_use]
    pub fn with_targets(mut self, specs: Vec<TargetSpec>, chosen: Vec<Vec<TargetRef>>) -> Self {
        self.targets = specs;
        self.chosen = chosen;
        self
    }

    #[must_use]
    pub fn with_modes(mut self, modes: Vec<usize>) -> Self {
        self.modes = modes;
        self
    }

    #[must_use]
    pub fn with_x(mut self, x: i64) -> Self {
        self.x = x;
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: TriggerContext) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Option<Condition>) -> Self {
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn requiring_source(mut self, requires: bool) -> Self {
        self.requires_source = requires;
        self
    }

    #[must_use]
    pub fn is_spell(&self) -> bool {
        self.kind == StackEntryKind::Spell
    }
}

//! Effect trees.
//!
//! An [`Effect`] is a pure description of what a spell or ability does. It
//! is a closed tree: leaves are [`Action`]s, inner nodes sequence, branch,
//! offer choices, repeat over a group or chain a reflexive ability. The
//! [`EffectResolver`](super::EffectResolver) walks it exactly once per
//! resolution.
//!
//! ## Example
//!
//! ```
//! use ccg_rules::effects::{Action, DynamicAmount, Effect, PlayerRef, Recipient};
//!
//! // "Deal 2 damage to any target. You gain 2 life."
//! let effect = Effect::simple(Action::DealDamage {
//!     amount: DynamicAmount::Fixed(2),
//!     to: Recipient::Target(0),
//! })
//! .then(Effect::simple(Action::GainLife {
//!     player: PlayerRef::You,
//!     amount: DynamicAmount::Fixed(2),
//! }));
//!
//! assert!(matches!(effect, Effect::Composite(ref parts) if parts.len() == 2));
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::amount::{Condition, DynamicAmount};
use super::context::{ObjectRef, PlayerRef};
use super::filter::{ObjectFilter, PlayerFilter};
use super::targeting::TargetSpec;
use crate::abilities::{ReplacementSpec, TriggeredAbility};
use crate::cards::{CardDefinition, CounterKind};
use crate::costs::ManaType;
use crate::layers::{Duration, Modification};
use crate::zones::ZoneKind;

/// Who receives damage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Recipient {
    Object(ObjectRef),
    Player(PlayerRef),
    /// Everything chosen for a target slot, objects and players alike.
    Target(usize),
}

/// A set of objects or players an effect repeats over or applies to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Group {
    /// Objects matching a filter (battlefield unless it names a zone).
    Objects(ObjectFilter),
    /// Players matching a filter, in APNAP order.
    Players(PlayerFilter),
    /// Whatever an object reference resolves to.
    Ref(ObjectRef),
    /// Whatever a player reference resolves to.
    PlayersRef(PlayerRef),
}

/// The ability created by a reflexive trigger ("when you do, ...").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReflexiveAbility {
    pub targets: Vec<TargetSpec>,
    pub effect: Box<Effect>,
}

/// An atomic game action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    // === Life and damage ===
    DealDamage {
        amount: DynamicAmount,
        to: Recipient,
    },
    GainLife {
        player: PlayerRef,
        amount: DynamicAmount,
    },
    LoseLife {
        player: PlayerRef,
        amount: DynamicAmount,
    },

    // === Cards ===
    DrawCards {
        player: PlayerRef,
        amount: DynamicAmount,
    },
    /// The player chooses which cards to discard.
    Discard {
        player: PlayerRef,
        amount: DynamicAmount,
    },
    Mill {
        player: PlayerRef,
        amount: DynamicAmount,
    },
    Shuffle(PlayerRef),

    // === Zone changes ===
    Destroy(ObjectRef),
    Exile(ObjectRef),
    ReturnToHand(ObjectRef),
    ReturnToBattlefield {
        object: ObjectRef,
        tapped: bool,
    },
    MoveTo {
        object: ObjectRef,
        zone: ZoneKind,
    },
    /// The player chooses `count` objects they control matching `filter`.
    Sacrifice {
        player: PlayerRef,
        filter: ObjectFilter,
        count: DynamicAmount,
    },
    /// Remove a spell or ability from the stack.
    CounterSpell(ObjectRef),

    // === Permanents ===
    Tap(ObjectRef),
    Untap(ObjectRef),
    AddCounters {
        object: ObjectRef,
        kind: CounterKind,
        amount: DynamicAmount,
    },
    RemoveCounters {
        object: ObjectRef,
        kind: CounterKind,
        amount: DynamicAmount,
    },
    Attach {
        object: ObjectRef,
        to: ObjectRef,
    },
    CreateTokens {
        token: Arc<CardDefinition>,
        amount: DynamicAmount,
        controller: PlayerRef,
        tapped: bool,
    },
    AddMana {
        player: PlayerRef,
        mana: ManaType,
        amount: DynamicAmount,
    },

    // === Lasting effects ===
    /// Create a continuous effect. The affected objects are locked when it
    /// is created.
    ApplyContinuous {
        affected: Group,
        modifications: Vec<Modification>,
        duration: Duration,
    },
    /// Register a floating replacement effect. With `applies_to`, it is
    /// locked to the objects the reference resolves to now.
    AddReplacement {
        spec: ReplacementSpec,
        applies_to: Option<ObjectRef>,
        duration: Duration,
    },
    /// Register a delayed triggered ability.
    CreateDelayedTrigger {
        ability: Box<TriggeredAbility>,
        once: bool,
    },
}

impl Action {
    /// Visit every amount in the action.
    pub fn map_amounts(&mut self, f: &mut impl FnMut(&mut DynamicAmount)) {
        match self {
            Action::DealDamage { amount, .. }
            | Action::GainLife { amount, .. }
            | Action::LoseLife { amount, .. }
            | Action::DrawCards { amount, .. }
            | Action::Discard { amount, .. }
            | Action::Mill { amount, .. }
            | Action::AddCounters { amount, .. }
            | Action::RemoveCounters { amount, .. }
            | Action::CreateTokens { amount, .. }
            | Action::AddMana { amount, .. } => f(amount),
            Action::Sacrifice { count, .. } => f(count),
            Action::ApplyContinuous { modifications, .. } => {
                for modification in modifications {
                    modification.map_amounts(f);
                }
            }
            Action::Shuffle(_)
            | Action::Destroy(_)
            | Action::Exile(_)
            | Action::ReturnToHand(_)
            | Action::ReturnToBattlefield { .. }
            | Action::MoveTo { .. }
            | Action::CounterSpell(_)
            | Action::Tap(_)
            | Action::Untap(_)
            | Action::Attach { .. }
            | Action::AddReplacement { .. }
            | Action::CreateDelayedTrigger { .. } => {}
        }
    }
}

/// An effect tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// One action.
    Simple(Action),
    /// Effects in order.
    Composite(Vec<Effect>),
    /// Branch on a condition checked at resolution.
    Conditional {
        condition: Condition,
        then: Box<Effect>,
        otherwise: Option<Box<Effect>>,
    },
    /// Choose between `min` and `max` modes. Modes are chosen as the entry
    /// is put on the stack when the modal effect is the root; nested modal
    /// effects ask during resolution.
    Modal {
        modes: Vec<Effect>,
        min: usize,
        max: usize,
    },
    /// The chooser may decline.
    May {
        chooser: PlayerRef,
        effect: Box<Effect>,
    },
    /// Do `action`; if it did anything, `follow_up` triggers.
    Reflexive {
        action: Box<Effect>,
        follow_up: ReflexiveAbility,
    },
    /// Run `effect` once per member of `group`, bound as `Current`.
    ForEach {
        group: Group,
        effect: Box<Effect>,
    },
}

impl Effect {
    /// An effect that does nothing.
    #[must_use]
    pub fn nothing() -> Self {
        Effect::Composite(Vec::new())
    }

    #[must_use]
    pub fn simple(action: Action) -> Self {
        Effect::Simple(action)
    }

    /// Sequence two effects, flattening composites.
    #[must_use]
    pub fn then(self, next: Effect) -> Self {
        match self {
            Effect::Composite(mut parts) => {
                parts.push(next);
                Effect::Composite(parts)
            }
            first => Effect::Composite(vec![first, next]),
        }
    }

    /// "You may ..."
    #[must_use]
    pub fn may(effect: Effect) -> Self {
        Effect::May {
            chooser: PlayerRef::You,
            effect: Box::new(effect),
        }
    }

    /// "If <condition>, ..."
    #[must_use]
    pub fn when(condition: Condition, then: Effect) -> Self {
        Effect::Conditional {
            condition,
            then: Box::new(then),
            otherwise: None,
        }
    }

    /// "Choose one:"
    #[must_use]
    pub fn choose_one(modes: Vec<Effect>) -> Self {
        Effect::Modal { modes, min: 1, max: 1 }
    }

    #[must_use]
    pub fn for_each(group: Group, effect: Effect) -> Self {
        Effect::ForEach {
            group,
            effect: Box::new(effect),
        }
    }

    #[must_use]
    pub fn reflexive(action: Effect, targets: Vec<TargetSpec>, follow_up: Effect) -> Self {
        Effect::Reflexive {
            action: Box::new(action),
            follow_up: ReflexiveAbility {
                targets,
                effect: Box::new(follow_up),
            },
        }
    }

    /// Whether the tree does nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Effect::Composite(parts) if parts.iter().all(Effect::is_empty))
    }

    /// Visit every amount in the tree, conditions included. Follow-up
    /// reflexive abilities are separate abilities and are not visited.
    pub fn map_amounts(&mut self, f: &mut impl FnMut(&mut DynamicAmount)) {
        match self {
            Effect::Simple(action) => action.map_amounts(f),
            Effect::Composite(parts) => {
                for part in parts {
                    part.map_amounts(f);
                }
            }
            Effect::Conditional {
                condition,
                then,
                otherwise,
            } => {
                condition.map_amounts(f);
                then.map_amounts(f);
                if let Some(otherwise) = otherwise {
                    otherwise.map_amounts(f);
                }
            }
            Effect::Modal { modes, .. } => {
                for mode in modes {
                    mode.map_amounts(f);
                }
            }
            Effect::May { effect, .. } | Effect::ForEach { effect, .. } => effect.map_amounts(f),
            Effect::Reflexive { action, .. } => action.map_amounts(f),
        }
    }
}

impl From<Action> for Effect {
    fn from(action: Action) -> Self {
        Effect::Simple(action)
    }
}

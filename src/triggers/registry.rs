//! Trigger registry and detection.
//!
//! Triggered abilities come from three places:
//! - objects on the battlefield, through their effective characteristics;
//! - last-known information of objects that left the battlefield in the
//!   same batch of events, for leaves-the-battlefield triggers;
//! - abilities registered explicitly (delayed and global triggers).
//!
//! Detection only queues [`PendingTrigger`]s. They go on the stack the
//! next time a player would receive priority.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::event::GameEvent;
use crate::abilities::{Ability, TriggeredAbility};
use crate::core::{GameState, ObjectId, PlayerId};
use crate::effects::{Condition, Effect, EffectContext, Env, ObjectView, TargetSpec, TriggerContext};
use crate::error::Result;

/// Unique identifier for a registered trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub u32);

impl TriggerId {
    /// Create a new trigger ID.
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

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Trigger({})", self.0)
    }
}

/// A triggered ability registered outside any object's characteristics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisteredTrigger {
    pub id: TriggerId,
    pub ability: TriggeredAbility,
    /// The object that created it. Need not still exist.
    pub source: Option<ObjectId>,
    pub controller: PlayerId,
    /// Removed after it triggers once.
    pub once: bool,
}

/// Delayed and global triggers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerRegistry {
    triggers: im::Vector<RegisteredTrigger>,
    next_id: u32,
}

impl TriggerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a triggered ability.
    pub fn register_ability(
        &mut self,
        ability: TriggeredAbility,
        source: Option<ObjectId>,
        controller: PlayerId,
        once: bool,
    ) -> TriggerId {
        let id = TriggerId::new(self.next_id);
        self.next_id += 1;
        self.triggers.push_back(RegisteredTrigger {
            id,
            ability,
            source,
            controller,
            once,
        });
        id
    }

    /// Unregister a trigger. Returns whether it was registered.
    pub fn remove(&mut self, id: TriggerId) -> bool {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.id != id);
        self.triggers.len() != before
    }

    /// Unregister every trigger controlled by `player`.
    pub fn remove_controlled_by(&mut self, player: PlayerId) {
        self.triggers.retain(|t| t.controller != player);
    }

    #[must_use]
    pub fn get(&self, id: TriggerId) -> Option<&RegisteredTrigger> {
        self.triggers.iter().find(|t| t.id == id)
    }

    /// Registered triggers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTrigger> {
        self.triggers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

/// A triggered ability waiting to be put on the stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingTrigger {
    pub controller: PlayerId,
    pub source: Option<ObjectId>,
    pub targets: Vec<TargetSpec>,
    pub effect: Effect,
    /// Intervening "if", checked again on resolution.
    pub condition: Option<Condition>,
    pub requires_source: bool,
    pub trigger: TriggerContext,
    /// The registration it came from, if any.
    pub registered: Option<TriggerId>,
}

impl PendingTrigger {
    fn from_ability(
        ability: &TriggeredAbility,
        source: Option<ObjectId>,
        controller: PlayerId,
        trigger: TriggerContext,
        registered: Option<TriggerId>,
    ) -> Self {
        Self {
            controller,
            source,
            targets: ability.targets.clone(),
            effect: ability.effect.clone(),
            condition: ability.trigger.condition.clone(),
            requires_source: ability.requires_source,
            trigger,
            registered,
        }
    }
}

/// Matches events against every trigger source.
pub struct TriggerDetector;

impl TriggerDetector {
    /// Triggers fired by one event.
    ///
    /// An object that left the battlefield in this event is looked back
    /// at through its last-known information.
    pub fn on_event(event: &GameEvent, state: &GameState) -> Result<Vec<PendingTrigger>> {
        let table = state.characteristics()?;
        let env = Env::new(state, &table);
        let left: Vec<ObjectId> = if event.is_leaving_battlefield() {
            event.subject().into_iter().collect()
        } else {
            Vec::new()
        };
        Ok(detect(event, &env, &left, &state.triggers))
    }

    /// Drain the event log into the pending trigger queue. Once-only
    /// registrations that fired are removed.
    pub(crate) fn collect(state: &mut GameState) -> Result<()> {
        let events = state.take_events();
        if events.is_empty() {
            return Ok(());
        }
        let table = state.characteristics()?;
        let (fired, spent) = {
            let env = Env::new(state, &table);
            let left: Vec<ObjectId> = events
                .iter()
                .filter(|e| e.is_leaving_battlefield())
                .filter_map(GameEvent::subject)
                .collect();

            let mut fired = Vec::new();
            for event in &events {
                trace!(?event, "checking triggers");
                fired.extend(detect(event, &env, &left, &state.triggers));
            }
            let mut spent: Vec<TriggerId> = Vec::new();
            fired.retain(|t: &PendingTrigger| match t.registered {
                Some(id) if state.triggers.get(id).is_some_and(|r| r.once) => {
                    if spent.contains(&id) {
                        return false;
                    }
                    spent.push(id);
                    true
                }
                _ => true,
            });
            (fired, spent)
        };

        for id in spent {
            state.triggers.remove(id);
        }
        for trigger in fired {
            debug!(source = ?trigger.source, controller = %trigger.controller, "ability triggered");
            state.pending_triggers.push_back(trigger);
        }
        Ok(())
    }
}

/// Triggers fired by one event: battlefield sources in id order, then
/// look-back sources, then registrations.
fn detect(event: &GameEvent, env: &Env<'_>, left: &[ObjectId], registry: &TriggerRegistry) -> Vec<PendingTrigger> {
    let mut fired = Vec::new();

    let mut from_object = |view: ObjectView<'_>| {
        for ability in view.characteristics.abilities.iter().filter_map(Ability::as_triggered) {
            let ctx = EffectContext::new(view.controller).with_source(view.id());
            if let Some(trigger) = ability.trigger.matches(event, env, &ctx) {
                fired.push(PendingTrigger::from_ability(ability, Some(view.id()), view.controller, trigger, None));
            }
        }
    };

    for view in env.battlefield() {
        from_object(view);
    }
    if event.is_leaving_battlefield() {
        for view in left.iter().filter_map(|&id| env.view_or_lki(id)) {
            if !view.zone().is_battlefield() || env.view(view.id()).is_some() {
                continue;
            }
            from_object(view);
        }
    }

    for registered in registry.iter() {
        let mut ctx = EffectContext::new(registered.controller);
        ctx.source = registered.source;
        if let Some(trigger) = registered.ability.trigger.matches(event, env, &ctx) {
            fired.push(PendingTrigger::from_ability(
                &registered.ability,
                registered.source,
                registered.controller,
                trigger,
                Some(registered.id),
            ));
        }
    }
    fired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Action, DynamicAmount, PlayerRef};
    use crate::triggers::{TriggerEvent, TriggerSpec};

    fn gain_one() -> TriggeredAbility {
        TriggeredAbility::new(
            TriggerSpec::new(TriggerEvent::LifeLost),
            Effect::simple(Action::GainLife {
                player: PlayerRef::You,
                amount: DynamicAmount::Fixed(1),
            }),
        )
    }

    #[test]
    fn test_register_and_remove() {
        let mut registry = TriggerRegistry::new();
        let a = registry.register_ability(gain_one(), None, PlayerId(0), false);
        let b = registry.register_ability(gain_one(), None, PlayerId(1), true);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(b).unwrap().once);

        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);

        registry.register_ability(gain_one(), None, PlayerId(0), false);
        registry.remove_controlled_by(PlayerId(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().next().unwrap().controller, PlayerId(0));
    }

    #[test]
    fn test_trigger_id_display() {
        assert_eq!(TriggerId::new(4).to_string(), "Trigger(4)");
    }
}

//! Trigger conditions.
//!
//! A [`TriggerSpec`] says which events a triggered ability watches:
//! an event kind, how the event's object relates to the ability's source
//! ([`TriggerBinding`]), a filter over that object, a filter over the
//! event's player and an optional intervening "if" condition.
//!
//! ```
//! use ccg_rules::effects::ObjectFilter;
//! use ccg_rules::triggers::{TriggerBinding, TriggerEvent, TriggerSpec};
//!
//! // "Whenever another creature you control dies, ..."
//! let spec = TriggerSpec::new(TriggerEvent::Dies).other(ObjectFilter::creature_you_control());
//! assert_eq!(spec.binding, TriggerBinding::Other);
//! ```

use serde::{Deserialize, Serialize};

use super::event::GameEvent;
use crate::core::ObjectId;
use crate::effects::{AmountEvaluator, Condition, EffectContext, Env, ObjectFilter, PlayerFilter};
use crate::effects::TriggerContext;
use crate::rules::Step;
use crate::zones::ZoneKind;

/// Kinds of event a trigger can watch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    EntersBattlefield,
    LeavesBattlefield,
    /// Put into a graveyard from the battlefield.
    Dies,
    /// Any zone change between the given kinds (`None` matches any).
    ZoneChange {
        from: Option<ZoneKind>,
        to: Option<ZoneKind>,
    },
    SpellCast,
    AbilityActivated,
    /// The bound object is the damage source.
    DealsDamage,
    /// The bound object is the damaged object.
    IsDealtDamage,
    /// Damage dealt to a player matching the player filter.
    PlayerDealtDamage,
    LifeGained,
    LifeLost,
    CardDrawn,
    Discarded,
    CountersAdded,
    BecomesTapped,
    BecomesUntapped,
    /// The player filter is checked against the active player.
    BeginningOfStep(Step),
}

/// How the event's object relates to the trigger's source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerBinding {
    /// The source itself ("when this enters").
    SelfObject,
    /// Any object but the source ("whenever another ...").
    Other,
    /// Any object, or no object at all.
    #[default]
    Any,
}

/// When a triggered ability triggers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub event: TriggerEvent,
    pub binding: TriggerBinding,
    /// Filter over the bound object, live or last-known.
    pub filter: ObjectFilter,
    /// Filter over the event's player.
    pub player: PlayerFilter,
    /// Intervening "if": checked when the trigger fires and again on
    /// resolution.
    pub condition: Option<Condition>,
}

impl TriggerSpec {
    #[must_use]
    pub fn new(event: TriggerEvent) -> Self {
        Self {
            event,
            binding: TriggerBinding::Any,
            filter: ObjectFilter::Any,
            player: PlayerFilter::Any,
            condition: None,
        }
    }

    /// "When this enters the battlefield"
    #[must_use]
    pub fn enters() -> Self {
        Self::new(TriggerEvent::EntersBattlefield).this()
    }

    /// "When this dies"
    #[must_use]
    pub fn dies() -> Self {
        Self::new(TriggerEvent::Dies).this()
    }

    /// "At the beginning of your <step>"
    #[must_use]
    pub fn beginning_of_your(step: Step) -> Self {
        Self::new(TriggerEvent::BeginningOfStep(step)).by(PlayerFilter::You)
    }

    /// Bind to the source.
    #[must_use]
    pub fn this(mut self) -> Self {
        self.binding = TriggerBinding::SelfObject;
        self
    }

    /// Bind to any other object matching `filter`.
    #[must_use]
    pub fn other(mut self, filter: ObjectFilter) -> Self {
        self.binding = TriggerBinding::Other;
        self.filter = filter;
        self
    }

    /// Bind to any object matching `filter`.
    #[must_use]
    pub fn matching(mut self, filter: ObjectFilter) -> Self {
        self.binding = TriggerBinding::Any;
        self.filter = filter;
        self
    }

    /// Restrict the event's player.
    #[must_use]
    pub fn by(mut self, player: PlayerFilter) -> Self {
        self.player = player;
        self
    }

    /// Add an intervening "if".
    #[must_use]
    pub fn intervening_if(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// The object this spec binds to in `event`, or `None` if the event is
    /// of another kind. `Some(None)` is a matching event without an object.
    #[must_use]
    pub fn bound_object(&self, event: &GameEvent) -> Option<Option<ObjectId>> {
        let kind_matches = match (&self.event, event) {
            (TriggerEvent::EntersBattlefield, GameEvent::ZoneChanged { to, .. }) => to.is_battlefield(),
            (TriggerEvent::LeavesBattlefield, GameEvent::ZoneChanged { .. }) => event.is_leaving_battlefield(),
            (TriggerEvent::Dies, GameEvent::ZoneChanged { from, to, .. }) => {
                from.is_battlefield() && to.kind() == ZoneKind::Graveyard
            }
            (TriggerEvent::ZoneChange { from: want_from, to: want_to }, GameEvent::ZoneChanged { from, to, .. }) => {
                want_from.map_or(true, |k| k == from.kind()) && want_to.map_or(true, |k| k == to.kind())
            }
            (TriggerEvent::SpellCast, GameEvent::SpellCast { .. })
            | (TriggerEvent::AbilityActivated, GameEvent::AbilityActivated { .. })
            | (TriggerEvent::LifeGained, GameEvent::LifeGained { .. })
            | (TriggerEvent::LifeLost, GameEvent::LifeLost { .. })
            | (TriggerEvent::CardDrawn, GameEvent::CardDrawn { .. })
            | (TriggerEvent::Discarded, GameEvent::Discarded { .. })
            | (TriggerEvent::CountersAdded, GameEvent::CountersAdded { .. })
            | (TriggerEvent::BecomesTapped, GameEvent::Tapped { .. })
            | (TriggerEvent::BecomesUntapped, GameEvent::Untapped { .. }) => true,
            (TriggerEvent::DealsDamage, GameEvent::DamageDealt { source, .. }) => {
                return source.map(Some);
            }
            (TriggerEvent::IsDealtDamage, GameEvent::DamageDealt { target, .. }) => {
                return target.object().map(Some);
            }
            (TriggerEvent::PlayerDealtDamage, GameEvent::DamageDealt { target, .. }) => target.player().is_some(),
            (TriggerEvent::BeginningOfStep(want), GameEvent::StepBegan { step, .. }) => want == step,
            _ => false,
        };
        kind_matches.then(|| event.subject())
    }

    /// Whether `event` triggers this spec for an ability whose source is
    /// `ctx.source`. Returns the trigger context on a match.
    #[must_use]
    pub fn matches(&self, event: &GameEvent, env: &Env<'_>, ctx: &EffectContext) -> Option<TriggerContext> {
        let bound = self.bound_object(event)?;

        let object_ok = match (self.binding, bound) {
            (TriggerBinding::SelfObject, Some(id)) => ctx.source == Some(id),
            (TriggerBinding::SelfObject, None) => false,
            (TriggerBinding::Other, Some(id)) => ctx.source != Some(id),
            (TriggerBinding::Other, None) => false,
            (TriggerBinding::Any, _) => true,
        };
        if !object_ok {
            return None;
        }
        if self.filter != ObjectFilter::Any {
            let view = bound.and_then(|id| env.view_or_lki(id))?;
            if !self.filter.matches_view(&view, env, ctx) {
                return None;
            }
        }

        let player = event.player();
        let player_ok = match (&self.player, player) {
            (PlayerFilter::Any, _) => true,
            (filter, Some(p)) => filter.matches(p, env, ctx),
            (_, None) => false,
        };
        if !player_ok {
            return None;
        }

        let trigger = TriggerContext {
            subject: bound,
            player,
            amount: event.amount(),
        };
        if let Some(condition) = &self.condition {
            let bound_ctx = ctx.clone().with_trigger(trigger.clone());
            if !AmountEvaluator::evaluate_condition(condition, env, &bound_ctx) {
                return None;
            }
        }
        Some(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;
    use crate::effects::TargetRef;
    use crate::zones::ZoneId;

    fn dies(object: u32) -> GameEvent {
        GameEvent::ZoneChanged {
            object: ObjectId(object),
            new_object: Some(ObjectId(object + 100)),
            from: ZoneId::Battlefield,
            to: ZoneId::Graveyard(PlayerId(0)),
            controller: PlayerId(0),
        }
    }

    #[test]
    fn test_bound_object_by_kind() {
        let spec = TriggerSpec::dies();
        assert_eq!(spec.bound_object(&dies(5)), Some(Some(ObjectId(5))));

        let spec = TriggerSpec::enters();
        assert_eq!(spec.bound_object(&dies(5)), None);

        let damage = GameEvent::DamageDealt {
            source: Some(ObjectId(1)),
            target: TargetRef::Object(ObjectId(2)),
            amount: 2,
        };
        assert_eq!(
            TriggerSpec::new(TriggerEvent::DealsDamage).bound_object(&damage),
            Some(Some(ObjectId(1)))
        );
        assert_eq!(
            TriggerSpec::new(TriggerEvent::IsDealtDamage).bound_object(&damage),
            Some(Some(ObjectId(2)))
        );
        assert_eq!(TriggerSpec::new(TriggerEvent::PlayerDealtDamage).bound_object(&damage), None);
    }

    #[test]
    fn test_step_trigger_kind() {
        let spec = TriggerSpec::beginning_of_your(Step::Upkeep);
        let upkeep = GameEvent::StepBegan {
            step: Step::Upkeep,
            active: PlayerId(1),
        };
        let draw = GameEvent::StepBegan {
            step: Step::Draw,
            active: PlayerId(1),
        };
        assert_eq!(spec.bound_object(&upkeep), Some(None));
        assert_eq!(spec.bound_object(&draw), None);
    }

    #[test]
    fn test_builders() {
        let spec = TriggerSpec::new(TriggerEvent::EntersBattlefield)
            .matching(ObjectFilter::creature())
            .intervening_if(Condition::IsYourTurn);
        assert_eq!(spec.binding, TriggerBinding::Any);
        assert!(spec.condition.is_some());
    }
}

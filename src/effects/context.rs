//! Evaluation context shared by filters, amounts, targeting and resolution.
//!
//! [`Env`] pairs a game state with the characteristics table computed from
//! it. [`EffectContext`] carries who is acting and what was chosen: source,
//! controller, targets, X, the triggering event and the current `ForEach`
//! binding. References such as [`ObjectRef::Target`] resolve through it.

use serde::{Deserialize, Serialize};

use super::targeting::TargetRef;
use crate::cards::{Characteristics, GameObject};
use crate::core::{GameState, ObjectId, PlayerId};
use crate::layers::CharacteristicsTable;
use crate::zones::ZoneId;

/// A reference to object(s) relative to an effect's context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectRef {
    /// The source of the ability or the spell itself.
    Source,
    /// Objects chosen for a target slot.
    Target(usize),
    /// The object the trigger event was about.
    TriggeringObject,
    /// The object bound by the enclosing `ForEach`.
    Current,
    /// The object the source is attached to ("enchanted creature").
    SourceAttachedTo,
    Specific(ObjectId),
}

/// A reference to player(s) relative to an effect's context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlayerRef {
    /// The controller of the effect.
    You,
    /// Each opponent of the controller.
    Opponents,
    /// Each player still in the game, APNAP order.
    Each,
    Active,
    /// Players chosen for a target slot.
    Target(usize),
    /// The player the trigger event was about.
    TriggeringPlayer,
    ControllerOf(Box<ObjectRef>),
    OwnerOf(Box<ObjectRef>),
    /// The player bound by the enclosing `ForEach`.
    Current,
    Specific(PlayerId),
}

/// Values captured from the event that caused a trigger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    /// The object the event was about. For entering objects this is the
    /// new id; for objects that left it is the old (last-known) id.
    pub subject: Option<ObjectId>,
    pub player: Option<PlayerId>,
    /// Damage dealt, life gained, counters placed, ...
    pub amount: i64,
}

/// A live or last-known object together with its derived values.
#[derive(Clone, Copy, Debug)]
pub struct ObjectView<'a> {
    pub object: &'a GameObject,
    pub characteristics: &'a Characteristics,
    pub controller: PlayerId,
}

impl<'a> ObjectView<'a> {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.object.id
    }

    #[must_use]
    pub fn zone(&self) -> ZoneId {
        self.object.zone
    }
}

/// A game state and the characteristics table derived from it.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub state: &'a GameState,
    pub table: &'a CharacteristicsTable,
}

impl<'a> Env<'a> {
    pub fn new(state: &'a GameState, table: &'a CharacteristicsTable) -> Self {
        Self { state, table }
    }

    /// A live object.
    #[must_use]
    pub fn view(&self, id: ObjectId) -> Option<ObjectView<'a>> {
        let object = self.state.object(id)?;
        let effective = self.table.get(id)?;
        Some(ObjectView {
            object,
            characteristics: &effective.characteristics,
            controller: effective.controller,
        })
    }

    /// A live object, or the last-known information of one that left.
    #[must_use]
    pub fn view_or_lki(&self, id: ObjectId) -> Option<ObjectView<'a>> {
        self.view(id).or_else(|| {
            self.state.last_known(id).map(|lki| ObjectView {
                object: &lki.object,
                characteristics: &lki.characteristics,
                controller: lki.controller,
            })
        })
    }

    /// Every live object, in id order.
    pub fn objects(&self) -> impl Iterator<Item = ObjectView<'a>> + 'a {
        let env = *self;
        self.state.objects().filter_map(move |object| env.view(object.id))
    }

    /// Live objects on the battlefield, in id order.
    pub fn battlefield(&self) -> impl Iterator<Item = ObjectView<'a>> + 'a {
        self.objects().filter(|view| view.zone().is_battlefield())
    }
}

/// Who is acting and what was chosen.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectContext {
    pub controller: PlayerId,
    pub source: Option<ObjectId>,
    /// Chosen targets per slot. During resolution, only the ones still legal.
    pub targets: Vec<Vec<TargetRef>>,
    pub x: i64,
    pub trigger: Option<TriggerContext>,
    pub current: Option<TargetRef>,
}

impl EffectContext {
    pub fn new(controller: PlayerId) -> Self {
        Self {
            controller,
            source: None,
            targets: Vec::new(),
            x: 0,
            trigger: None,
            current: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: ObjectId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Vec<Vec<TargetRef>>) -> Self {
        self.targets = targets;
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

    /// A copy bound to one member of a `ForEach` group.
    #[must_use]
    pub fn binding(&self, current: TargetRef) -> Self {
        let mut ctx = self.clone();
        ctx.current = Some(current);
        ctx
    }

    /// Resolve an object reference.
    #[must_use]
    pub fn objects(&self, reference: &ObjectRef, env: &Env<'_>) -> Vec<ObjectId> {
        match reference {
            ObjectRef::Source => self.source.into_iter().collect(),
            ObjectRef::Target(slot) => self
                .targets
                .get(*slot)
                .map(|chosen| chosen.iter().filter_map(TargetRef::object).collect())
                .unwrap_or_default(),
            ObjectRef::TriggeringObject => self
                .trigger
                .as_ref()
                .and_then(|t| t.subject)
                .into_iter()
                .collect(),
            ObjectRef::Current => self.current.and_then(|c| c.object()).into_iter().collect(),
            ObjectRef::SourceAttachedTo => self
                .source
                .and_then(|s| env.view_or_lki(s))
                .and_then(|view| view.object.attached_to)
                .into_iter()
                .collect(),
            ObjectRef::Specific(id) => vec![*id],
        }
    }

    /// Resolve a player reference.
    #[must_use]
    pub fn players(&self, reference: &PlayerRef, env: &Env<'_>) -> Vec<PlayerId> {
        let state = env.state;
        match reference {
            PlayerRef::You => vec![self.controller],
            PlayerRef::Opponents => state
                .players_in_apnap_order()
                .into_iter()
                .filter(|&p| p != self.controller)
                .collect(),
            PlayerRef::Each => state.players_in_apnap_order(),
            PlayerRef::Active => vec![state.turn.active],
            PlayerRef::Target(slot) => self
                .targets
                .get(*slot)
                .map(|chosen| chosen.iter().filter_map(TargetRef::player).collect())
                .unwrap_or_default(),
            PlayerRef::TriggeringPlayer => self
                .trigger
                .as_ref()
                .and_then(|t| t.player)
                .into_iter()
                .collect(),
            PlayerRef::ControllerOf(object) => self
                .objects(object, env)
                .into_iter()
                .filter_map(|id| env.view_or_lki(id).map(|v| v.controller))
                .collect(),
            PlayerRef::OwnerOf(object) => self
                .objects(object, env)
                .into_iter()
                .filter_map(|id| env.view_or_lki(id).map(|v| v.object.owner))
                .collect(),
            PlayerRef::Current => self.current.and_then(|c| c.player()).into_iter().collect(),
            PlayerRef::Specific(player) => vec![*player],
        }
    }

    /// The first player a reference resolves to.
    #[must_use]
    pub fn player(&self, reference: &PlayerRef, env: &Env<'_>) -> Option<PlayerId> {
        self.players(reference, env).into_iter().next()
    }
}

//! Rules-aware zone changes.
//!
//! Every move goes through [`ZoneMover::move_object`]:
//! 1. Replacement effects that watch the move are collected: floating
//!    registrations, `Replacement` abilities of battlefield objects and the
//!    moving object's own. Each applies at most once; when several apply,
//!    the moving object's controller picks the next one.
//! 2. The old object is retired. Its last-known information is kept, and
//!    continuous effects locked to it are dropped.
//! 3. Unless a token is leaving the battlefield, a new object with a new
//!    id and timestamp enters the destination.
//! 4. A `ZoneChanged` event is emitted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::manager::ZonePosition;
use super::zone::{ZoneId, ZoneKind};
use crate::abilities::{Ability, ReplacementAction, ReplacementSpec};
use crate::cards::{CardDefinition, Characteristics, CounterKind, GameObject};
use crate::core::{GameState, LastKnown, ObjectId, PlayerId};
use crate::effects::{EffectContext, Env, ObjectView};
use crate::layers::{Affected, CharacteristicsTable, Duration, EffectId, Layer, LayerSystem, Modification};
use crate::rules::decision::{ChoiceReason, Choices, Flow};
use crate::triggers::GameEvent;

/// A requested zone change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneMove {
    pub object: ObjectId,
    /// Destination kind. Per-player zones belong to the object's owner.
    pub to: ZoneKind,
    pub position: ZonePosition,
    /// Enter the battlefield tapped.
    pub tapped: bool,
    /// Controller on the battlefield or the stack. Defaults to the owner.
    pub controller: Option<PlayerId>,
}

impl ZoneMove {
    #[must_use]
    pub fn new(object: ObjectId, to: ZoneKind) -> Self {
        Self {
            object,
            to,
            position: ZonePosition::Top,
            tapped: false,
            controller: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: ZonePosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn tapped(mut self) -> Self {
        self.tapped = true;
        self
    }

    #[must_use]
    pub fn under_control_of(mut self, player: PlayerId) -> Self {
        self.controller = Some(player);
        self
    }
}

/// Which replacement applied, so it applies at most once per move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReplacementKey {
    Floating(EffectId),
    Ability { source: ObjectId, index: usize },
}

#[derive(Clone, Debug)]
struct Candidate {
    key: ReplacementKey,
    spec: ReplacementSpec,
    source: Option<ObjectId>,
    controller: PlayerId,
}

/// How the object arrives once replacements have applied.
#[derive(Clone, Debug, Default)]
struct Arrival {
    tapped: bool,
    counters: Vec<(CounterKind, u32)>,
    copy_of: Option<Characteristics>,
}

/// Moves objects between zones.
pub struct ZoneMover;

impl ZoneMover {
    /// Move an object. Returns the id of the new object, or `None` if the
    /// object no longer exists or was a token leaving the battlefield.
    pub(crate) fn move_object(state: &mut GameState, choices: &mut Choices, mv: ZoneMove) -> Flow<Option<ObjectId>> {
        let Some(object) = state.object(mv.object).cloned() else {
            trace!(object = %mv.object, "move of an object that no longer exists");
            return Ok(None);
        };
        let table = state.characteristics()?;
        let (characteristics, controller) = match table.get(object.id) {
            Some(effective) => (effective.characteristics.clone(), effective.controller),
            None => (object.base_characteristics().clone(), object.controller),
        };
        let from = object.zone;

        let view = ObjectView {
            object: &object,
            characteristics: &characteristics,
            controller,
        };
        let (to, arrival) = collect_replacements(state, &table, choices, &view, Some(from.kind()), mv.to)?;
        let arrival = Arrival {
            tapped: arrival.tapped || mv.tapped,
            ..arrival
        };

        retire(state, &object, characteristics, controller);

        let destination = to.zone_for(object.owner);
        if object.is_token && from.is_battlefield() && !destination.is_battlefield() {
            debug!(object = %object.id, %from, to = %destination, "token ceases to exist");
            state.emit(GameEvent::ZoneChanged {
                object: object.id,
                new_object: None,
                from,
                to: destination,
                controller,
            });
            return Ok(None);
        }

        let new_controller = match destination {
            ZoneId::Battlefield | ZoneId::Stack => mv.controller.unwrap_or(object.owner),
            _ => object.owner,
        };
        let new_id = arrive(
            state,
            &object.definition,
            object.owner,
            new_controller,
            destination,
            mv.position,
            object.is_token,
            arrival,
        )?;
        state.record_successor(object.id, new_id);

        debug!(old = %object.id, new = %new_id, %from, to = %destination, "zone change");
        state.emit(GameEvent::ZoneChanged {
            object: object.id,
            new_object: Some(new_id),
            from,
            to: destination,
            controller,
        });
        Ok(Some(new_id))
    }

    /// Create a token on the battlefield. Replacements that watch objects
    /// entering the battlefield apply.
    pub(crate) fn create_token(
        state: &mut GameState,
        choices: &mut Choices,
        definition: Arc<CardDefinition>,
        controller: PlayerId,
        tapped: bool,
    ) -> Flow<Option<ObjectId>> {
        let table = state.characteristics()?;
        let mut prototype = GameObject::new(
            ObjectId(u32::MAX),
            Arc::clone(&definition),
            controller,
            ZoneId::Command,
            state.current_timestamp(),
        );
        prototype.is_token = true;
        let view = ObjectView {
            object: &prototype,
            characteristics: &definition.characteristics,
            controller,
        };
        let (to, arrival) = collect_replacements(state, &table, choices, &view, None, ZoneKind::Battlefield)?;
        if to != ZoneKind::Battlefield {
            debug!(token = definition.name(), "token creation replaced away from the battlefield");
            return Ok(None);
        }
        let arrival = Arrival {
            tapped: arrival.tapped || tapped,
            ..arrival
        };
        let id = arrive(
            state,
            &definition,
            controller,
            controller,
            ZoneId::Battlefield,
            ZonePosition::Top,
            true,
            arrival,
        )?;
        debug!(token = %id, name = definition.name(), %controller, "token created");
        state.emit(GameEvent::ZoneChanged {
            object: id,
            new_object: Some(id),
            from: ZoneId::Command,
            to: ZoneId::Battlefield,
            controller,
        });
        Ok(Some(id))
    }
}

/// Apply replacements until none is left. Returns the final destination
/// and how the object arrives.
fn collect_replacements(
    state: &GameState,
    table: &CharacteristicsTable,
    choices: &mut Choices,
    moving: &ObjectView<'_>,
    from: Option<ZoneKind>,
    to: ZoneKind,
) -> Flow<(ZoneKind, Arrival)> {
    let mut to = to;
    let mut arrival = Arrival::default();
    let mut applied: Vec<ReplacementKey> = Vec::new();

    loop {
        let candidates: Vec<Candidate> = applicable(state, table, moving, from, to)
            .into_iter()
            .filter(|c| !applied.contains(&c.key))
            .collect();
        let chosen = match candidates.len() {
            0 => break,
            1 => 0,
            n => choices.replacement(moving.controller, moving.id(), n)?,
        };
        let Some(candidate) = candidates.into_iter().nth(chosen) else {
            break;
        };
        applied.push(candidate.key);
        trace!(object = %moving.id(), key = ?candidate.key, "replacement applies");

        match &candidate.spec.action {
            ReplacementAction::ChangeDestination(kind) => to = *kind,
            ReplacementAction::EntersTapped => arrival.tapped = true,
            ReplacementAction::EntersWithCounters { kind, amount } => arrival.counters.push((kind.clone(), *amount)),
            ReplacementAction::EntersAsCopyOf(filter) => {
                let env = Env::new(state, table);
                let ctx = context(candidate.controller, candidate.source);
                let options: Vec<ObjectId> = env
                    .battlefield()
                    .filter(|view| view.id() != moving.id() && filter.matches_view(view, &env, &ctx))
                    .map(|view| view.id())
                    .collect();
                let picked = choices.objects(moving.controller, options, 0, 1, ChoiceReason::CopyTarget)?;
                if let Some(&target) = picked.first() {
                    let copiable = LayerSystem::compute_through(state, Layer::OneB)?;
                    arrival.copy_of = copiable.characteristics(target).cloned();
                }
            }
        }
    }

    if to != ZoneKind::Battlefield {
        arrival = Arrival::default();
    }
    Ok((to, arrival))
}

fn context(controller: PlayerId, source: Option<ObjectId>) -> EffectContext {
    let ctx = EffectContext::new(controller);
    match source {
        Some(source) => ctx.with_source(source),
        None => ctx,
    }
}

/// Replacements watching this move, in a stable order.
fn applicable(
    state: &GameState,
    table: &CharacteristicsTable,
    moving: &ObjectView<'_>,
    from: Option<ZoneKind>,
    to: ZoneKind,
) -> Vec<Candidate> {
    let env = Env::new(state, table);
    let mut candidates = Vec::new();

    for effect in &state.replacements {
        let active = match effect.duration {
            Duration::WhileSourceOnBattlefield => effect
                .source
                .and_then(|s| state.object(s))
                .is_some_and(|o| o.zone.is_battlefield()),
            Duration::Permanent | Duration::EndOfTurn => true,
        };
        let locked_out = effect.objects.as_ref().is_some_and(|ids| !ids.contains(&moving.id()));
        if !active || locked_out || !effect.spec.watches(from, to) {
            continue;
        }
        let ctx = context(effect.controller, effect.source);
        if effect.spec.affected.matches_view(moving, &env, &ctx) {
            candidates.push(Candidate {
                key: ReplacementKey::Floating(effect.id),
                spec: effect.spec.clone(),
                source: effect.source,
                controller: effect.controller,
            });
        }
    }

    let mut sources: Vec<ObjectView<'_>> = env.battlefield().filter(|v| v.id() != moving.id()).collect();
    sources.push(*moving);
    for source in sources {
        for (index, ability) in source.characteristics.abilities.iter().enumerate() {
            let Ability::Replacement(spec) = ability else {
                continue;
            };
            if !spec.watches(from, to) {
                continue;
            }
            let ctx = context(source.controller, Some(source.id()));
            if spec.affected.matches_view(moving, &env, &ctx) {
                candidates.push(Candidate {
                    key: ReplacementKey::Ability {
                        source: source.id(),
                        index,
                    },
                    spec: spec.clone(),
                    source: Some(source.id()),
                    controller: source.controller,
                });
            }
        }
    }
    candidates
}

/// Remove an object from the arena, keeping its last-known information.
fn retire(state: &mut GameState, object: &GameObject, characteristics: Characteristics, controller: PlayerId) {
    state.zones.remove(object.id);
    state.remove_object(object.id);
    state.remember(LastKnown {
        object: object.clone(),
        characteristics,
        controller,
    });

    let gone = object.id;
    let only_gone = |ids: &[ObjectId]| ids.contains(&gone) && ids.iter().all(|&id| id == gone);
    state.continuous.retain(|effect| match &effect.affected {
        Affected::Objects(ids) => !only_gone(&ids[..]),
        Affected::Filter(_) => true,
    });
    for effect in state.continuous.iter_mut() {
        if let Affected::Objects(ids) = &mut effect.affected {
            ids.retain(|&id| id != gone);
        }
    }
    state.continuous.retain(|effect| {
        !(effect.duration == Duration::WhileSourceOnBattlefield && effect.source == Some(gone))
    });
    state.replacements.retain(|effect| {
        let orphaned = effect.duration == Duration::WhileSourceOnBattlefield && effect.source == Some(gone);
        let emptied = effect.objects.as_deref().is_some_and(only_gone);
        !orphaned && !emptied
    });
}

/// Create the object that arrives in `zone`.
#[allow(clippy::too_many_arguments)]
fn arrive(
    state: &mut GameState,
    definition: &Arc<CardDefinition>,
    owner: PlayerId,
    controller: PlayerId,
    zone: ZoneId,
    position: ZonePosition,
    is_token: bool,
    arrival: Arrival,
) -> Flow<ObjectId> {
    let id = state.alloc_object_id();
    let timestamp = state.next_timestamp();
    let mut object = GameObject::new(id, Arc::clone(definition), owner, zone, timestamp);
    object.controller = controller;
    object.is_token = is_token;
    if zone.is_battlefield() {
        object.tapped = arrival.tapped;
        object.summoning_sick = true;
        for (kind, amount) in arrival.counters {
            object.counters.add(kind, amount);
        }
    }
    state.zones.add_to_zone(id, zone, position)?;
    state.insert_object(object);

    if let Some(copied) = arrival.copy_of {
        state.add_continuous_effect(
            Some(id),
            controller,
            Affected::Objects(vec![id]),
            vec![Modification::CopyValues(Box::new(copied))],
            Duration::Permanent,
        );
    }
    Ok(id)
}

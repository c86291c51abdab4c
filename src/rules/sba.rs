//! State-based actions.
//!
//! Checked whenever a player would receive priority. Every action that
//! applies is performed at once, then the check repeats until nothing
//! applies. A check that never settles is an engine bug and is reported as
//! an invariant violation once `sba_iteration_limit` passes are exceeded.
//!
//! Pending events are matched against triggers before every pass, so an
//! object that enters and dies to a state-based action still sees its own
//! enters-the-battlefield event.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::decision::{ChoiceReason, Choices, Flow};
use super::game::GameResult;
use crate::cards::{CardType, CounterKind, Keyword, Supertype};
use crate::core::{GameState, ObjectId, PlayerId};
use crate::layers::{Duration, Modification};
use crate::stack::StackEntryId;
use crate::effects::{EffectContext, Env};
use crate::error::RulesError;
use crate::triggers::TriggerDetector;
use crate::zones::{ZoneId, ZoneKind, ZoneMove, ZoneMover};

pub(crate) struct StateBasedActions;

impl StateBasedActions {
    /// Perform state-based actions until none apply. Returns whether any
    /// were performed.
    pub(crate) fn check(state: &mut GameState, choices: &mut Choices) -> Flow<bool> {
        let limit = state.config.sba_iteration_limit;
        let mut performed = false;
        for _ in 0..limit {
            TriggerDetector::collect(state)?;
            if !Self::check_once(state, choices)? {
                Self::decide_result(state);
                return Ok(performed);
            }
            performed = true;
        }
        Err(RulesError::invariant(format!("state-based actions still applying after {limit} passes")).into())
    }

    /// One simultaneous pass.
    fn check_once(state: &mut GameState, choices: &mut Choices) -> Flow<bool> {
        let lost = Self::check_players(state);
        let mut acted = !lost.is_empty();
        if state.players_in_turn_order().len() > 1 {
            for player in lost {
                Self::remove_player(state, choices, player)?;
            }
        }
        let mut doomed: Vec<ObjectId> = Vec::new();
        let mut unattach: Vec<ObjectId> = Vec::new();
        let mut annihilate: Vec<(ObjectId, u32)> = Vec::new();
        let mut legends: BTreeMap<(PlayerId, String), Vec<ObjectId>> = BTreeMap::new();

        {
            let table = state.characteristics()?;
            let env = Env::new(state, &table);
            for view in env.battlefield() {
                let chars = view.characteristics;
                let object = view.object;

                if chars.is_creature() {
                    let toughness = chars.toughness.unwrap_or(0);
                    if toughness <= 0 {
                        debug!(object = %view.id(), "toughness 0 or less");
                        doomed.push(view.id());
                        continue;
                    }
                    let lethal = object.damage >= toughness || (object.deathtouch_damage && object.damage > 0);
                    if lethal && !chars.has_keyword(&Keyword::Indestructible) {
                        debug!(object = %view.id(), damage = object.damage, "lethal damage");
                        doomed.push(view.id());
                        continue;
                    }
                }

                if chars.has_type(CardType::Planeswalker) && object.counters.get(&CounterKind::Loyalty) == 0 {
                    debug!(object = %view.id(), "no loyalty");
                    doomed.push(view.id());
                    continue;
                }

                if let Some(host) = object.attached_to {
                    let host_view = env.view(host).filter(|h| h.zone().is_battlefield());
                    if chars.has_subtype("Aura") {
                        let legal = match (host_view, &object.definition.enchant) {
                            (Some(_), Some(filter)) => {
                                let ctx = EffectContext::new(view.controller).with_source(view.id());
                                filter.matches(host, &env, &ctx)
                            }
                            (Some(_), None) => true,
                            (None, _) => false,
                        };
                        if !legal {
                            debug!(aura = %view.id(), %host, "aura attached illegally");
                            doomed.push(view.id());
                            continue;
                        }
                    } else if host_view.is_none() || host == view.id() {
                        unattach.push(view.id());
                    }
                } else if chars.has_subtype("Aura") {
                    debug!(aura = %view.id(), "aura attached to nothing");
                    doomed.push(view.id());
                    continue;
                }

                let plus = object.counters.get(&CounterKind::PlusOnePlusOne);
                let minus = object.counters.get(&CounterKind::MinusOneMinusOne);
                if plus > 0 && minus > 0 {
                    annihilate.push((view.id(), plus.min(minus)));
                }

                if chars.has_supertype(Supertype::Legendary) {
                    legends
                        .entry((view.controller, chars.name.clone()))
                        .or_default()
                        .push(view.id());
                }
            }
        }

        for ((player, name), group) in legends {
            if group.len() < 2 {
                continue;
            }
            let keep = choices.objects(player, group.clone(), 1, 1, ChoiceReason::LegendRule)?;
            debug!(%player, name = %name, "legend rule");
            doomed.extend(group.into_iter().filter(|id| !keep.contains(id)));
        }

        for id in unattach {
            if let Some(object) = state.object_mut(id) {
                object.attached_to = None;
                acted = true;
            }
        }
        for (id, n) in annihilate {
            if let Some(object) = state.object_mut(id) {
                object.counters.remove_up_to(&CounterKind::PlusOnePlusOne, n);
                object.counters.remove_up_to(&CounterKind::MinusOneMinusOne, n);
                acted = true;
            }
        }
        doomed.sort_unstable();
        doomed.dedup();
        for id in doomed {
            ZoneMover::move_object(state, choices, ZoneMove::new(id, ZoneKind::Graveyard))?;
            acted = true;
        }
        Ok(acted)
    }

    /// Players at 0 or less life, or who drew from an empty library, lose.
    /// Returns the players who lost in this pass.
    fn check_players(state: &mut GameState) -> Vec<PlayerId> {
        let mut lost = Vec::new();
        for player in state.players_in_turn_order() {
            let ps = &mut state.players[player];
            if ps.life <= 0 || ps.drew_from_empty {
                ps.lost = true;
                info!(%player, life = ps.life, "player loses");
                lost.push(player);
            }
        }
        lost
    }

    /// A player who loses while the game goes on leaves it (CR 800.4a).
    ///
    /// Everything they own leaves the game, effects giving them control
    /// end, their spells and abilities leave the stack, and whatever they
    /// still control after that is exiled.
    fn remove_player(state: &mut GameState, choices: &mut Choices, player: PlayerId) -> Flow<()> {
        let owned: Vec<ObjectId> = state.objects().filter(|o| o.owner == player).map(|o| o.id).collect();
        for &id in &owned {
            state.zones.remove(id);
            state.remove_object(id);
        }

        let sourced_by_owned = |source: Option<ObjectId>, duration: Duration| {
            duration == Duration::WhileSourceOnBattlefield && source.is_some_and(|s| owned.contains(&s))
        };
        state.continuous.retain(|effect| {
            let grants_control = effect.controller == player
                && effect.modifications.iter().any(|m| matches!(m, Modification::GainControl));
            !grants_control && !sourced_by_owned(effect.source, effect.duration)
        });
        state
            .replacements
            .retain(|effect| effect.controller != player && !sourced_by_owned(effect.source, effect.duration));
        state.triggers.remove_controlled_by(player);
        state.pending_triggers.retain(|trigger| trigger.controller != player);

        let leaving: Vec<StackEntryId> = state
            .stack
            .iter()
            .filter(|entry| {
                entry.controller == player || (entry.is_spell() && entry.source.is_some_and(|s| owned.contains(&s)))
            })
            .map(|entry| entry.id)
            .collect();
        for id in leaving {
            state.stack.remove(id);
        }

        let still_controlled: Vec<ObjectId> = {
            let table = state.characteristics()?;
            state
                .zones
                .contents(ZoneId::Battlefield)
                .into_iter()
                .filter(|&id| table.controller(id) == Some(player))
                .collect()
        };
        for id in still_controlled {
            ZoneMover::move_object(state, choices, ZoneMove::new(id, ZoneKind::Exile))?;
        }
        info!(%player, objects = owned.len(), "player left the game");
        Ok(())
    }

    fn decide_result(state: &mut GameState) {
        if state.result.is_some() {
            return;
        }
        let remaining = state.players_in_turn_order();
        let result = match remaining.as_slice() {
            [] => Some(GameResult::Draw),
            [winner] if state.player_count() > 1 => Some(GameResult::Winner(*winner)),
            _ => None,
        };
        if let Some(result) = result {
            info!(?result, "game over");
            state.result = Some(result);
        }
    }
}

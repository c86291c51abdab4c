//! Effect resolution.
//!
//! The `EffectResolver` walks an effect tree once, applying each action to
//! the state. Amounts and conditions are evaluated live, against
//! characteristics recomputed before every action, so an earlier part of
//! the same effect is visible to later parts.
//!
//! Resolution may stop for a player decision. The caller runs it on a
//! checkpoint and replays it with the answers given so far, so a stopped
//! resolution leaves nothing behind.

use tracing::{debug, trace};

use super::amount::{AmountEvaluator, DynamicAmount};
use super::context::{EffectContext, Env};
use super::effect::{Action, Effect, Group, Recipient};
use super::targeting::TargetRef;
use crate::cards::{CardType, CounterKind, Keyword};
use crate::core::{GameState, ObjectId, PlayerId};
use crate::layers::{Affected, Modification};
use crate::rules::decision::{ChoiceReason, Choices, Flow};
use crate::triggers::{GameEvent, PendingTrigger};
use crate::zones::{ZoneId, ZoneKind, ZoneMove, ZoneMover};

/// Resolves effect trees against a game state.
pub struct EffectResolver;

impl EffectResolver {
    /// Resolve `effect`. Returns whether it did anything, which is what a
    /// reflexive trigger checks.
    pub(crate) fn resolve(
        state: &mut GameState,
        choices: &mut Choices,
        effect: &Effect,
        ctx: &EffectContext,
    ) -> Flow<bool> {
        match effect {
            Effect::Simple(action) => Self::perform(state, choices, action, ctx),
            Effect::Composite(parts) => {
                let mut did = false;
                for part in parts {
                    did |= Self::resolve(state, choices, part, ctx)?;
                }
                Ok(did)
            }
            Effect::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let holds = {
                    let table = state.characteristics()?;
                    AmountEvaluator::evaluate_condition(condition, &Env::new(state, &table), ctx)
                };
                trace!(holds, "conditional effect");
                match (holds, otherwise) {
                    (true, _) => Self::resolve(state, choices, then, ctx),
                    (false, Some(otherwise)) => Self::resolve(state, choices, otherwise, ctx),
                    (false, None) => Ok(false),
                }
            }
            Effect::Modal { modes, min, max } => {
                let chosen = choices.modes(ctx.controller, ctx.source, modes.len(), *min, *max)?;
                let mut did = false;
                for index in chosen {
                    if let Some(mode) = modes.get(index) {
                        did |= Self::resolve(state, choices, mode, ctx)?;
                    }
                }
                Ok(did)
            }
            Effect::May { chooser, effect } => {
                let player = {
                    let table = state.characteristics()?;
                    ctx.player(chooser, &Env::new(state, &table))
                };
                let Some(player) = player else {
                    return Ok(false);
                };
                if choices.may(player, ctx.source)? {
                    Self::resolve(state, choices, effect, ctx)
                } else {
                    Ok(false)
                }
            }
            Effect::Reflexive { action, follow_up } => {
                let did = Self::resolve(state, choices, action, ctx)?;
                if did {
                    debug!(source = ?ctx.source, "reflexive ability triggered");
                    state.pending_triggers.push_back(PendingTrigger {
                        controller: ctx.controller,
                        source: ctx.source,
                        targets: follow_up.targets.clone(),
                        effect: (*follow_up.effect).clone(),
                        condition: None,
                        requires_source: false,
                        trigger: ctx.trigger.clone().unwrap_or_default(),
                        registered: None,
                    });
                }
                Ok(did)
            }
            Effect::ForEach { group, effect } => {
                let members = {
                    let table = state.characteristics()?;
                    group_members(group, &Env::new(state, &table), ctx)
                };
                let mut did = false;
                for member in members {
                    did |= Self::resolve(state, choices, effect, &ctx.binding(member))?;
                }
                Ok(did)
            }
        }
    }

    fn perform(state: &mut GameState, choices: &mut Choices, action: &Action, ctx: &EffectContext) -> Flow<bool> {
        let table = state.characteristics()?;
        let env = Env::new(state, &table);
        let amount = |amount: &DynamicAmount| AmountEvaluator::evaluate_at_resolution(amount, &env, ctx);

        match action {
            Action::DealDamage { amount: n, to } => {
                let n = amount(n);
                let recipients = recipients(to, &env, ctx);
                let source = ctx.source.and_then(|s| env.view_or_lki(s)).map(|view| DamageSource {
                    id: view.id(),
                    deathtouch: view.characteristics.has_keyword(&Keyword::Deathtouch),
                    lifelink: view.characteristics.has_keyword(&Keyword::Lifelink),
                    controller: view.controller,
                });
                let hits: Vec<Hit> = recipients
                    .into_iter()
                    .filter_map(|target| match target {
                        TargetRef::Object(id) => {
                            let view = env.view(id).filter(|v| v.zone().is_battlefield())?;
                            if view.characteristics.is_creature() {
                                Some(Hit::Creature(id))
                            } else if view.characteristics.has_type(CardType::Planeswalker) {
                                Some(Hit::Planeswalker(id))
                            } else {
                                None
                            }
                        }
                        TargetRef::Player(p) => env.state.players.try_get(p).filter(|ps| !ps.lost).map(|_| Hit::Player(p)),
                    })
                    .collect();
                if n <= 0 {
                    return Ok(false);
                }
                deal_damage(state, source, &hits, n);
                Ok(!hits.is_empty())
            }

            Action::GainLife { player, amount: n } => {
                let n = amount(n);
                let players = ctx.players(player, &env);
                if n <= 0 || players.is_empty() {
                    return Ok(false);
                }
                for p in players {
                    state.players[p].life += n;
                    state.emit(GameEvent::LifeGained { player: p, amount: n });
                }
                Ok(true)
            }

            Action::LoseLife { player, amount: n } => {
                let n = amount(n);
                let players = ctx.players(player, &env);
                if n <= 0 || players.is_empty() {
                    return Ok(false);
                }
                for p in players {
                    state.players[p].life -= n;
                    state.emit(GameEvent::LifeLost { player: p, amount: n });
                }
                Ok(true)
            }

            Action::DrawCards { player, amount: n } => {
                let n = amount(n);
                let players = ctx.players(player, &env);
                let mut did = false;
                for p in players {
                    for _ in 0..n.max(0) {
                        did |= draw_card(state, choices, p)?;
                    }
                }
                Ok(did)
            }

            Action::Discard { player, amount: n } => {
                let n = count(amount(n));
                let players = ctx.players(player, &env);
                let mut did = false;
                for p in players {
                    let hand = state.zone_contents(ZoneId::Hand(p));
                    let discarded = choices.objects(p, hand, n, n, ChoiceReason::Discard)?;
                    for card in discarded {
                        if move_object(state, choices, ZoneMove::new(card, ZoneKind::Graveyard))?.is_some() {
                            state.emit(GameEvent::Discarded { player: p, card });
                            did = true;
                        }
                    }
                }
                Ok(did)
            }

            Action::Mill { player, amount: n } => {
                let n = amount(n);
                let players = ctx.players(player, &env);
                let mut did = false;
                for p in players {
                    for _ in 0..n.max(0) {
                        let Some(card) = state.zones.top(ZoneId::Library(p)) else {
                            break;
                        };
                        did |= move_object(state, choices, ZoneMove::new(card, ZoneKind::Graveyard))?.is_some();
                    }
                }
                Ok(did)
            }

            Action::Shuffle(player) => {
                let players = ctx.players(player, &env);
                for &p in &players {
                    state.zones.shuffle_zone(ZoneId::Library(p), &mut state.rng);
                }
                Ok(!players.is_empty())
            }

            Action::Destroy(object) => {
                let doomed: Vec<ObjectId> = ctx
                    .objects(object, &env)
                    .into_iter()
                    .filter_map(|id| env.view(id))
                    .filter(|v| v.zone().is_battlefield())
                    .filter(|v| !v.characteristics.has_keyword(&Keyword::Indestructible))
                    .map(|v| v.id())
                    .collect();
                move_all(state, choices, &doomed, ZoneKind::Graveyard)
            }

            Action::Exile(object) => {
                let ids = live(ctx.objects(object, &env), &env);
                move_all(state, choices, &ids, ZoneKind::Exile)
            }

            Action::ReturnToHand(object) => {
                let ids = live(ctx.objects(object, &env), &env);
                move_all(state, choices, &ids, ZoneKind::Hand)
            }

            Action::ReturnToBattlefield { object, tapped } => {
                let ids = live(ctx.objects(object, &env), &env);
                let mut did = false;
                for id in ids {
                    let mut mv = ZoneMove::new(id, ZoneKind::Battlefield);
                    if *tapped {
                        mv = mv.tapped();
                    }
                    did |= move_object(state, choices, mv)?.is_some();
                }
                Ok(did)
            }

            Action::MoveTo { object, zone } => {
                let ids = live(ctx.objects(object, &env), &env);
                move_all(state, choices, &ids, *zone)
            }

            Action::Sacrifice { player, filter, count: n } => {
                let n = count(amount(n));
                let mut plan = Vec::new();
                for p in ctx.players(player, &env) {
                    let candidates: Vec<ObjectId> = env
                        .battlefield()
                        .filter(|v| v.controller == p && filter.matches_view(v, &env, ctx))
                        .map(|v| v.id())
                        .collect();
                    plan.push((p, candidates));
                }
                let mut chosen = Vec::new();
                for (p, candidates) in plan {
                    chosen.extend(choices.objects(p, candidates, n, n, ChoiceReason::Sacrifice)?);
                }
                move_all(state, choices, &chosen, ZoneKind::Graveyard)
            }

            Action::CounterSpell(object) => {
                let spells: Vec<ObjectId> = ctx
                    .objects(object, &env)
                    .into_iter()
                    .filter(|&id| state.stack.find_spell(id).is_some())
                    .collect();
                for &spell in &spells {
                    if let Some(entry) = state.stack.find_spell(spell).map(|e| e.id) {
                        state.stack.remove(entry);
                    }
                    debug!(%spell, "spell countered");
                    move_object(state, choices, ZoneMove::new(spell, ZoneKind::Graveyard))?;
                }
                Ok(!spells.is_empty())
            }

            Action::Tap(object) | Action::Untap(object) => {
                let tap = matches!(action, Action::Tap(_));
                let ids: Vec<ObjectId> = ctx
                    .objects(object, &env)
                    .into_iter()
                    .filter(|&id| {
                        state
                            .object(id)
                            .is_some_and(|o| o.zone.is_battlefield() && o.tapped != tap)
                    })
                    .collect();
                for &id in &ids {
                    if let Some(o) = state.object_mut(id) {
                        o.tapped = tap;
                    }
                    state.emit(if tap {
                        GameEvent::Tapped { object: id }
                    } else {
                        GameEvent::Untapped { object: id }
                    });
                }
                Ok(!ids.is_empty())
            }

            Action::AddCounters { object, kind, amount: n } => {
                let n = amount(n);
                let ids = live(ctx.objects(object, &env), &env);
                let Ok(n) = u32::try_from(n) else {
                    return Ok(false);
                };
                if n == 0 {
                    return Ok(false);
                }
                for &id in &ids {
                    if let Some(o) = state.object_mut(id) {
                        o.counters.add(kind.clone(), n);
                    }
                    state.emit(GameEvent::CountersAdded {
                        object: id,
                        kind: kind.clone(),
                        amount: n,
                    });
                }
                Ok(!ids.is_empty())
            }

            Action::RemoveCounters { object, kind, amount: n } => {
                let n = u32::try_from(amount(n)).unwrap_or(0);
                let ids = live(ctx.objects(object, &env), &env);
                let mut did = false;
                for id in ids {
                    if let Some(o) = state.object_mut(id) {
                        did |= o.counters.remove_up_to(kind, n) > 0;
                    }
                }
                Ok(did)
            }

            Action::Attach { object, to } => {
                let attachment = ctx.objects(object, &env).into_iter().find(|&id| env.view(id).is_some());
                let host = ctx
                    .objects(to, &env)
                    .into_iter()
                    .find(|&id| env.view(id).is_some_and(|v| v.zone().is_battlefield()));
                match (attachment, host) {
                    (Some(attachment), Some(host)) if attachment != host => {
                        if let Some(o) = state.object_mut(attachment) {
                            o.attached_to = Some(host);
                        }
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }

            Action::CreateTokens {
                token,
                amount: n,
                controller,
                tapped,
            } => {
                let n = amount(n);
                let players = ctx.players(controller, &env);
                let mut did = false;
                for p in players {
                    for _ in 0..n.max(0) {
                        did |= ZoneMover::create_token(state, choices, token.clone(), p, *tapped)?.is_some();
                    }
                }
                Ok(did)
            }

            Action::AddMana { player, mana, amount: n } => {
                let n = u32::try_from(amount(n)).unwrap_or(0);
                let players = ctx.players(player, &env);
                if n == 0 || players.is_empty() {
                    return Ok(false);
                }
                for p in players {
                    state.players[p].mana_pool.add(*mana, n);
                }
                Ok(true)
            }

            Action::ApplyContinuous {
                affected,
                modifications,
                duration,
            } => {
                let objects: Vec<ObjectId> = group_members(affected, &env, ctx)
                    .into_iter()
                    .filter_map(|m| m.object())
                    .collect();
                let mut fixed: Vec<Modification> = modifications.clone();
                for modification in &mut fixed {
                    modification.map_amounts(&mut |a| {
                        *a = DynamicAmount::Fixed(AmountEvaluator::evaluate_at_resolution(a, &env, ctx));
                    });
                }
                if objects.is_empty() {
                    return Ok(false);
                }
                let id = state.add_continuous_effect(ctx.source, ctx.controller, Affected::Objects(objects), fixed, *duration);
                debug!(effect = %id, source = ?ctx.source, "continuous effect created");
                Ok(true)
            }

            Action::AddReplacement {
                spec,
                applies_to,
                duration,
            } => {
                let objects = applies_to.as_ref().map(|r| ctx.objects(r, &env));
                state.add_replacement(spec.clone(), ctx.source, ctx.controller, *duration, objects);
                Ok(true)
            }

            Action::CreateDelayedTrigger { ability, once } => {
                let id = state
                    .triggers
                    .register_ability((**ability).clone(), ctx.source, ctx.controller, *once);
                debug!(trigger = %id, "delayed trigger created");
                Ok(true)
            }
        }
    }
}

/// Everything a recipient resolves to.
fn recipients(to: &Recipient, env: &Env<'_>, ctx: &EffectContext) -> Vec<TargetRef> {
    match to {
        Recipient::Object(object) => ctx.objects(object, env).into_iter().map(TargetRef::Object).collect(),
        Recipient::Player(player) => ctx.players(player, env).into_iter().map(TargetRef::Player).collect(),
        Recipient::Target(slot) => ctx.targets.get(*slot).cloned().unwrap_or_default(),
    }
}

/// Members of a group, in id order for objects and APNAP order for players.
fn group_members(group: &Group, env: &Env<'_>, ctx: &EffectContext) -> Vec<TargetRef> {
    match group {
        Group::Objects(filter) => filter.matching(env, ctx).into_iter().map(TargetRef::Object).collect(),
        Group::Players(filter) => env
            .state
            .players_in_apnap_order()
            .into_iter()
            .filter(|&p| filter.matches(p, env, ctx))
            .map(TargetRef::Player)
            .collect(),
        Group::Ref(object) => ctx.objects(object, env).into_iter().map(TargetRef::Object).collect(),
        Group::PlayersRef(player) => ctx.players(player, env).into_iter().map(TargetRef::Player).collect(),
    }
}

fn live(ids: Vec<ObjectId>, env: &Env<'_>) -> Vec<ObjectId> {
    ids.into_iter().filter(|&id| env.view(id).is_some()).collect()
}

fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn move_object(state: &mut GameState, choices: &mut Choices, mv: ZoneMove) -> Flow<Option<ObjectId>> {
    ZoneMover::move_object(state, choices, mv)
}

fn move_all(state: &mut GameState, choices: &mut Choices, ids: &[ObjectId], to: ZoneKind) -> Flow<bool> {
    let mut did = false;
    for &id in ids {
        did |= move_object(state, choices, ZoneMove::new(id, to))?.is_some() || state.object(id).is_none();
    }
    Ok(did)
}

/// Draw one card. An empty library marks the player for the state check.
fn draw_card(state: &mut GameState, choices: &mut Choices, player: PlayerId) -> Flow<bool> {
    let Some(card) = state.zones.top(ZoneId::Library(player)) else {
        debug!(%player, "draw from an empty library");
        state.players[player].drew_from_empty = true;
        return Ok(false);
    };
    match move_object(state, choices, ZoneMove::new(card, ZoneKind::Hand))? {
        Some(drawn) => {
            state.emit(GameEvent::CardDrawn { player, card: drawn });
            Ok(true)
        }
        None => Ok(false),
    }
}

/// What a damage event lands on.
#[derive(Clone, Copy)]
enum Hit {
    Creature(ObjectId),
    Planeswalker(ObjectId),
    Player(PlayerId),
}

/// The damage source as it was when the damage was dealt.
struct DamageSource {
    id: ObjectId,
    deathtouch: bool,
    lifelink: bool,
    controller: PlayerId,
}

fn deal_damage(state: &mut GameState, source: Option<DamageSource>, hits: &[Hit], amount: i64) {
    let deathtouch = source.as_ref().is_some_and(|s| s.deathtouch);
    let mut dealt = 0;
    for &hit in hits {
        let target = match hit {
            Hit::Creature(id) => {
                if let Some(object) = state.object_mut(id) {
                    object.damage += amount;
                    object.deathtouch_damage |= deathtouch;
                }
                TargetRef::Object(id)
            }
            Hit::Planeswalker(id) => {
                if let Some(object) = state.object_mut(id) {
                    let loss = u32::try_from(amount).unwrap_or(u32::MAX);
                    object.counters.remove_up_to(&CounterKind::Loyalty, loss);
                }
                TargetRef::Object(id)
            }
            Hit::Player(p) => {
                state.players[p].life -= amount;
                state.emit(GameEvent::LifeLost { player: p, amount });
                TargetRef::Player(p)
            }
        };
        trace!(%target, amount, "damage dealt");
        state.emit(GameEvent::DamageDealt {
            source: source.as_ref().map(|s| s.id),
            target,
            amount,
        });
        dealt += amount;
    }
    if let Some(source) = source.filter(|s| s.lifelink && dealt > 0) {
        state.players[source.controller].life += dealt;
        state.emit(GameEvent::LifeGained {
            player: source.controller,
            amount: dealt,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cards::{CardDefinition, CardId, Characteristics};
    use crate::core::EngineConfig;
    use crate::effects::{ObjectFilter, ObjectRef, PlayerRef};
    use crate::rules::decision::Interrupt;
    use crate::rules::DecisionRequest;

    fn creature(state: &mut GameState, owner: PlayerId, name: &str, p: i64, t: i64) -> ObjectId {
        let def = Arc::new(CardDefinition::new(CardId::new(1), Characteristics::creature(name, p, t)));
        state.place_new(def, owner, ZoneId::Battlefield).unwrap()
    }

    fn resolve(state: &mut GameState, effect: &Effect, ctx: &EffectContext) -> bool {
        EffectResolver::resolve(state, &mut Choices::defaulting(), effect, ctx).unwrap()
    }

    #[test]
    fn test_damage_to_player_and_creature() {
        let mut state = GameState::new(EngineConfig::default());
        let p0 = PlayerId(0);
        let p1 = PlayerId(1);
        let bear = creature(&mut state, p1, "Bears", 2, 2);
        let ctx = EffectContext::new(p0).with_targets(vec![vec![TargetRef::Object(bear), TargetRef::Player(p1)]]);

        let effect = Effect::simple(Action::DealDamage {
            amount: DynamicAmount::Fixed(3),
            to: Recipient::Target(0),
        });
        assert!(resolve(&mut state, &effect, &ctx));
        assert_eq!(state.object(bear).unwrap().damage, 3);
        assert_eq!(state.players[p1].life, 17);
    }

    #[test]
    fn test_lifelink_source_gains_life() {
        let mut state = GameState::new(EngineConfig::default());
        let p0 = PlayerId(0);
        let def = Arc::new(CardDefinition::new(
            CardId::new(2),
            Characteristics::creature("Vampire", 2, 2).with_keyword(Keyword::Lifelink),
        ));
        let vampire = state.place_new(def, p0, ZoneId::Battlefield).unwrap();
        let ctx = EffectContext::new(p0).with_source(vampire);
        let effect = Effect::simple(Action::DealDamage {
            amount: DynamicAmount::Fixed(2),
            to: Recipient::Player(PlayerRef::Opponents),
        });
        resolve(&mut state, &effect, &ctx);
        assert_eq!(state.players[p0].life, 22);
        assert_eq!(state.players[PlayerId(1)].life, 18);
    }

    #[test]
    fn test_destroy_skips_indestructible() {
        let mut state = GameState::new(EngineConfig::default());
        let p0 = PlayerId(0);
        let bear = creature(&mut state, p0, "Bears", 2, 2);
        let def = Arc::new(CardDefinition::new(
            CardId::new(3),
            Characteristics::creature("Golem", 3, 3).with_keyword(Keyword::Indestructible),
        ));
        let golem = state.place_new(def, p0, ZoneId::Battlefield).unwrap();

        let effect = Effect::for_each(
            Group::Objects(ObjectFilter::creature()),
            Effect::simple(Action::Destroy(ObjectRef::Current)),
        );
        resolve(&mut state, &effect, &EffectContext::new(p0));
        assert!(state.object(bear).is_none());
        assert!(state.object(golem).is_some());
        assert_eq!(state.zones.zone_size(ZoneId::Graveyard(p0)), 1);
    }

    #[test]
    fn test_draw_from_empty_library_flags_player() {
        let mut state = GameState::new(EngineConfig::default());
        let p0 = PlayerId(0);
        let effect = Effect::simple(Action::DrawCards {
            player: PlayerRef::You,
            amount: DynamicAmount::Fixed(1),
        });
        assert!(!resolve(&mut state, &effect, &EffectContext::new(p0)));
        assert!(state.players[p0].drew_from_empty);
    }

    #[test]
    fn test_may_asks_chooser() {
        let mut state = GameState::new(EngineConfig::default());
        let effect = Effect::may(Effect::simple(Action::GainLife {
            player: PlayerRef::You,
            amount: DynamicAmount::Fixed(1),
        }));
        let result = EffectResolver::resolve(&mut state, &mut Choices::new(Vec::new()), &effect, &EffectContext::new(PlayerId(1)));
        assert!(matches!(
            result,
            Err(Interrupt::Decision(DecisionRequest::May { player: PlayerId(1), .. }))
        ));
    }

    #[test]
    fn test_reflexive_queues_follow_up_only_when_done() {
        let mut state = GameState::new(EngineConfig::default());
        let p0 = PlayerId(0);
        let follow_up = Effect::simple(Action::GainLife {
            player: PlayerRef::You,
            amount: DynamicAmount::Fixed(3),
        });

        let nothing_to_sacrifice = Effect::reflexive(
            Effect::simple(Action::Sacrifice {
                player: PlayerRef::You,
                filter: ObjectFilter::creature(),
                count: DynamicAmount::Fixed(1),
            }),
            Vec::new(),
            follow_up.clone(),
        );
        assert!(!resolve(&mut state, &nothing_to_sacrifice, &EffectContext::new(p0)));
        assert!(state.pending_triggers.is_empty());

        creature(&mut state, p0, "Bears", 2, 2);
        assert!(resolve(&mut state, &nothing_to_sacrifice, &EffectContext::new(p0)));
        assert_eq!(state.pending_triggers.len(), 1);
        assert_eq!(state.pending_triggers[0].effect, follow_up);
    }

    #[test]
    fn test_apply_continuous_locks_amounts() {
        let mut state = GameState::new(EngineConfig::default());
        let p0 = PlayerId(0);
        let bear = creature(&mut state, p0, "Bears", 2, 2);
        let effect = Effect::simple(Action::ApplyContinuous {
            affected: Group::Ref(ObjectRef::Specific(bear)),
            modifications: vec![Modification::ModifyPowerToughness {
                power: DynamicAmount::Count(ObjectFilter::creature()),
                toughness: DynamicAmount::Fixed(0),
            }],
            duration: crate::layers::Duration::EndOfTurn,
        });
        resolve(&mut state, &effect, &EffectContext::new(p0));
        creature(&mut state, p0, "Elves", 1, 1);

        let table = state.characteristics().unwrap();
        assert_eq!(table.characteristics(bear).unwrap().power, Some(3));
    }
}

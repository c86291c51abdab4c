//! Cost payment.
//!
//! Payment is all-or-nothing. [`CostPaymentEngine::pay`] validates every
//! component against the current state first, including the objects the
//! payer chose, and only then commits the payment on a working copy that
//! replaces the live state. A failed payment leaves the state untouched.

use smallvec::SmallVec;
use tracing::debug;

use super::cost::{Cost, CostComponent, CostPayment};
use crate::cards::{CounterKind, Keyword};
use crate::core::{GameState, ObjectId, PlayerId};
use crate::effects::{EffectContext, Env, ObjectFilter};
use crate::error::{CostError, Result};
use crate::layers::CharacteristicsTable;
use crate::rules::decision::Choices;
use crate::triggers::GameEvent;
use crate::zones::{ZoneId, ZoneKind, ZoneMove, ZoneMover};

/// Checks and pays costs.
///
/// ## Example
///
/// ```
/// use ccg_rules::cards::Color;
/// use ccg_rules::core::{EngineConfig, GameState, PlayerId};
/// use ccg_rules::costs::{Cost, CostPayment, CostPaymentEngine, ManaCost, ManaType};
///
/// let mut state = GameState::new(EngineConfig::default());
/// let p0 = PlayerId::new(0);
/// state.players[p0].mana_pool.add(ManaType::Colored(Color::Red), 1);
///
/// let cost = Cost::mana(ManaCost::parse("{R}").unwrap());
/// assert!(CostPaymentEngine::can_pay(&cost, p0, None, &state));
///
/// CostPaymentEngine::pay(&cost, p0, None, &CostPayment::new(), &mut state).unwrap();
/// assert!(state.players[p0].mana_pool.is_empty());
/// ```
pub struct CostPaymentEngine;

impl CostPaymentEngine {
    /// Whether `player` could pay `cost` right now with X = 0, choosing
    /// objects for the "N matching" components automatically.
    #[must_use]
    pub fn can_pay(cost: &Cost, player: PlayerId, source: Option<ObjectId>, state: &GameState) -> bool {
        Self::auto_payment(cost, player, source, 0, state)
            .is_some_and(|payment| Self::validate(cost, player, source, &payment, state).is_ok())
    }

    /// A payment choosing the lowest-id eligible objects for every
    /// "N matching" component, or `None` if there are not enough.
    #[must_use]
    pub fn auto_payment(
        cost: &Cost,
        player: PlayerId,
        source: Option<ObjectId>,
        x: u32,
        state: &GameState,
    ) -> Option<CostPayment> {
        let table = state.characteristics().ok()?;
        let env = Env::new(state, &table);
        let ctx = context(player, source);
        let mut payment = CostPayment::new().with_x(x);

        let taps_self = cost.components.contains(&CostComponent::TapSelf);
        let sacrifices_self = cost.components.contains(&CostComponent::SacrificeSelf);

        for component in &cost.components {
            match component {
                CostComponent::TapMatching { filter, count } => {
                    let chosen = pick(
                        controlled_permanents(&env, &ctx, player, filter)
                            .filter(|&id| !state.object(id).is_some_and(|o| o.tapped))
                            .filter(|&id| !(taps_self && Some(id) == source))
                            .filter(|id| !payment.tapped.contains(id)),
                        *count,
                    )?;
                    payment.tapped.extend(chosen);
                }
                CostComponent::SacrificeMatching { filter, count } => {
                    let chosen = pick(
                        controlled_permanents(&env, &ctx, player, filter)
                            .filter(|&id| !(sacrifices_self && Some(id) == source))
                            .filter(|id| !payment.sacrificed.contains(id)),
                        *count,
                    )?;
                    payment.sacrificed.extend(chosen);
                }
                CostComponent::Discard { filter, count } => {
                    let chosen = pick(
                        state
                            .zones
                            .contents(ZoneId::Hand(player))
                            .into_iter()
                            .filter(|&id| filter.matches(id, &env, &ctx))
                            .filter(|id| !payment.discarded.contains(id)),
                        *count,
                    )?;
                    payment.discarded.extend(chosen);
                }
                _ => {}
            }
        }
        Some(payment)
    }

    /// Validate a payment without changing anything.
    pub fn validate(
        cost: &Cost,
        player: PlayerId,
        source: Option<ObjectId>,
        payment: &CostPayment,
        state: &GameState,
    ) -> Result<()> {
        let table = state.characteristics()?;
        Validation {
            cost,
            player,
            source,
            payment,
            state,
            table: &table,
        }
        .run()
        .map_err(Into::into)
    }

    /// Pay a cost. Either every component is paid or nothing changes.
    pub fn pay(
        cost: &Cost,
        player: PlayerId,
        source: Option<ObjectId>,
        payment: &CostPayment,
        state: &mut GameState,
    ) -> Result<()> {
        Self::validate(cost, player, source, payment, state)?;

        let mut working = state.clone();
        commit(cost, player, source, payment, &mut working)?;
        *state = working;
        debug!(%player, components = cost.components.len(), "cost paid");
        Ok(())
    }
}

fn context(player: PlayerId, source: Option<ObjectId>) -> EffectContext {
    let ctx = EffectContext::new(player);
    match source {
        Some(source) => ctx.with_source(source),
        None => ctx,
    }
}

fn controlled_permanents<'a>(
    env: &'a Env<'a>,
    ctx: &'a EffectContext,
    player: PlayerId,
    filter: &'a ObjectFilter,
) -> impl Iterator<Item = ObjectId> + 'a {
    env.battlefield()
        .filter(move |view| view.controller == player && filter.matches_view(view, env, ctx))
        .map(|view| view.id())
}

fn pick(candidates: impl Iterator<Item = ObjectId>, count: u32) -> Option<Vec<ObjectId>> {
    let needed = count as usize;
    let chosen: Vec<ObjectId> = candidates.take(needed).collect();
    (chosen.len() == needed).then_some(chosen)
}

struct Validation<'a> {
    cost: &'a Cost,
    player: PlayerId,
    source: Option<ObjectId>,
    payment: &'a CostPayment,
    state: &'a GameState,
    table: &'a CharacteristicsTable,
}

impl Validation<'_> {
    fn run(&self) -> std::result::Result<(), CostError> {
        let env = Env::new(self.state, self.table);
        let ctx = context(self.player, self.source);

        let mut pool = self.state.players[self.player].mana_pool.clone();
        let mut tapped = self.payment.tapped.iter().copied();
        let mut sacrificed = self.payment.sacrificed.iter().copied();
        let mut discarded = self.payment.discarded.iter().copied();

        self.expect_count("tap", self.payment.tapped.len(), |c| match c {
            CostComponent::TapMatching { count, .. } => *count,
            _ => 0,
        })?;
        self.expect_count("sacrifice", self.payment.sacrificed.len(), |c| match c {
            CostComponent::SacrificeMatching { count, .. } => *count,
            _ => 0,
        })?;
        self.expect_count("discard", self.payment.discarded.len(), |c| match c {
            CostComponent::Discard { count, .. } => *count,
            _ => 0,
        })?;

        let taps_self = self.cost.components.contains(&CostComponent::TapSelf);
        let sacrifices_self = self.cost.components.contains(&CostComponent::SacrificeSelf);
        let mut seen: SmallVec<[ObjectId; 4]> = SmallVec::new();
        // Life and counters are checked against the totals over every
        // component, not one component at a time.
        let mut life_paid: i64 = 0;
        let mut counters_removed: SmallVec<[(CounterKind, u32); 2]> = SmallVec::new();

        for component in &self.cost.components {
            match component {
                CostComponent::Mana(cost) => {
                    pool = pool
                        .after_paying(cost, self.payment.x)
                        .ok_or_else(|| CostError::InsufficientMana(cost.to_string()))?;
                }
                CostComponent::TapSelf => {
                    let source = self.source_on_battlefield()?;
                    let object = self.state.object(source).ok_or(CostError::SourceUnavailable(source))?;
                    if object.tapped {
                        return Err(CostError::SourceTapped(source));
                    }
                    let chars = self.table.characteristics(source);
                    let sick = object.summoning_sick
                        && chars.is_some_and(|c| c.is_creature() && !c.has_keyword(&Keyword::Haste));
                    if sick {
                        return Err(CostError::SummoningSick(source));
                    }
                }
                CostComponent::UntapSelf => {
                    let source = self.source_on_battlefield()?;
                    if !self.state.object(source).is_some_and(|o| o.tapped) {
                        return Err(CostError::SourceUntapped(source));
                    }
                }
                CostComponent::TapMatching { filter, count } => {
                    for id in tapped.by_ref().take(*count as usize) {
                        if seen.contains(&id) {
                            return Err(CostError::DuplicateChoice(id));
                        }
                        seen.push(id);
                        let eligible = env.view(id).is_some_and(|view| {
                            view.zone().is_battlefield()
                                && view.controller == self.player
                                && !view.object.tapped
                                && filter.matches_view(&view, &env, &ctx)
                        });
                        if !eligible || (taps_self && Some(id) == self.source) {
                            return Err(CostError::InvalidChoice(id));
                        }
                    }
                }
                CostComponent::SacrificeSelf => {
                    let source = self.source_on_battlefield()?;
                    if self.table.controller(source) != Some(self.player) {
                        return Err(CostError::SourceUnavailable(source));
                    }
                }
                CostComponent::SacrificeMatching { filter, count } => {
                    for id in sacrificed.by_ref().take(*count as usize) {
                        if seen.contains(&id) {
                            return Err(CostError::DuplicateChoice(id));
                        }
                        seen.push(id);
                        let eligible = env.view(id).is_some_and(|view| {
                            view.zone().is_battlefield()
                                && view.controller == self.player
                                && filter.matches_view(&view, &env, &ctx)
                        });
                        if !eligible || (sacrifices_self && Some(id) == self.source) {
                            return Err(CostError::InvalidChoice(id));
                        }
                    }
                }
                CostComponent::Discard { filter, count } => {
                    for id in discarded.by_ref().take(*count as usize) {
                        if seen.contains(&id) {
                            return Err(CostError::DuplicateChoice(id));
                        }
                        seen.push(id);
                        let eligible = self.state.zones.is_in_zone(id, ZoneId::Hand(self.player))
                            && filter.matches(id, &env, &ctx);
                        if !eligible {
                            return Err(CostError::InvalidChoice(id));
                        }
                    }
                }
                CostComponent::PayLife(amount) => {
                    life_paid = life_paid.saturating_add((*amount).max(0));
                    let available = self.state.players[self.player].life;
                    if life_paid > available {
                        return Err(CostError::InsufficientLife {
                            needed: life_paid,
                            available,
                        });
                    }
                }
                CostComponent::RemoveCounters { kind, count } => {
                    let source = self.source.ok_or(CostError::MissingSource)?;
                    let object = self.state.object(source).ok_or(CostError::SourceUnavailable(source))?;
                    let total = match counters_removed.iter_mut().find(|(k, _)| *k == *kind) {
                        Some((_, removed)) => {
                            *removed = removed.saturating_add(*count);
                            *removed
                        }
                        None => {
                            counters_removed.push((kind.clone(), *count));
                            *count
                        }
                    };
                    if object.counters.get(kind) < total {
                        return Err(CostError::NotEnoughCounters {
                            object: source,
                            kind: kind.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn source_on_battlefield(&self) -> std::result::Result<ObjectId, CostError> {
        let source = self.source.ok_or(CostError::MissingSource)?;
        match self.state.object(source) {
            Some(object) if object.zone.is_battlefield() => Ok(source),
            _ => Err(CostError::SourceUnavailable(source)),
        }
    }

    fn expect_count(
        &self,
        what: &'static str,
        chosen: usize,
        count: impl Fn(&CostComponent) -> u32,
    ) -> std::result::Result<(), CostError> {
        let needed = self.cost.components.iter().map(count).fold(0u32, u32::saturating_add);
        if chosen == needed as usize {
            Ok(())
        } else {
            Err(CostError::WrongChoiceCount { what, needed, chosen })
        }
    }
}

/// Apply a validated payment.
fn commit(
    cost: &Cost,
    player: PlayerId,
    source: Option<ObjectId>,
    payment: &CostPayment,
    state: &mut GameState,
) -> Result<()> {
    let mut choices = Choices::defaulting();
    let mut tapped = payment.tapped.iter().copied();
    let mut sacrificed = payment.sacrificed.iter().copied();
    let mut discarded = payment.discarded.iter().copied();
    let mut to_sacrifice: Vec<ObjectId> = Vec::new();
    let mut to_discard: Vec<ObjectId> = Vec::new();

    for component in &cost.components {
        match component {
            CostComponent::Mana(cost) => {
                let pool = &mut state.players[player].mana_pool;
                *pool = pool
                    .after_paying(cost, payment.x)
                    .ok_or_else(|| CostError::InsufficientMana(cost.to_string()))?;
            }
            CostComponent::TapSelf => {
                if let Some(source) = source {
                    tap(state, source, true);
                }
            }
            CostComponent::UntapSelf => {
                if let Some(source) = source {
                    tap(state, source, false);
                }
            }
            CostComponent::TapMatching { count, .. } => {
                for id in tapped.by_ref().take(*count as usize) {
                    tap(state, id, true);
                }
            }
            CostComponent::SacrificeSelf => to_sacrifice.extend(source),
            CostComponent::SacrificeMatching { count, .. } => {
                to_sacrifice.extend(sacrificed.by_ref().take(*count as usize));
            }
            CostComponent::Discard { count, .. } => {
                to_discard.extend(discarded.by_ref().take(*count as usize));
            }
            CostComponent::PayLife(amount) => {
                if *amount > 0 {
                    state.players[player].life -= amount;
                    state.emit(GameEvent::LifeLost {
                        player,
                        amount: *amount,
                    });
                }
            }
            CostComponent::RemoveCounters { kind, count } => {
                if let Some(object) = source.and_then(|s| state.object_mut(s)) {
                    object.counters.remove(kind, *count)?;
                }
            }
        }
    }

    for id in to_sacrifice {
        ZoneMover::move_object(state, &mut choices, ZoneMove::new(id, ZoneKind::Graveyard))
            .map_err(|interrupt| interrupt.into_error())?;
    }
    for id in to_discard {
        let moved = ZoneMover::move_object(state, &mut choices, ZoneMove::new(id, ZoneKind::Graveyard))
            .map_err(|interrupt| interrupt.into_error())?;
        if let Some(card) = moved {
            state.emit(GameEvent::Discarded { player, card });
        }
    }
    Ok(())
}

fn tap(state: &mut GameState, id: ObjectId, tapped: bool) {
    if let Some(object) = state.object_mut(id) {
        object.tapped = tapped;
        state.emit(if tapped {
            GameEvent::Tapped { object: id }
        } else {
            GameEvent::Untapped { object: id }
        });
    }
}

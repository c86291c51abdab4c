//! The turn and priority controller.
//!
//! [`Game`] owns a [`GameState`] and is the only way the state advances.
//! Each API call turns into a queue of work items (resolve the top of the
//! stack, settle the state and hand out priority, advance a step, ...).
//! Every item runs on a checkpoint of the state: if it needs a player
//! decision the checkpoint is discarded and the request is returned. The
//! answer is fed back through [`Game::submit_decision`] and the item is
//! replayed from the start with every answer so far.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::decision::{ChoiceReason, Choices, DecisionRequest, DecisionResponse, Flow, Interrupt, TargetSlot};
use super::sba::StateBasedActions;
use super::turn::{Step, TurnState};
use crate::abilities::{Ability, ActivatedAbility, ActivationTiming};
use crate::cards::{CardDefinition, CardType, Characteristics, Keyword};
use crate::core::{EngineConfig, GameState, ObjectId, PlayerId};
use crate::costs::{Cost, CostPayment, CostPaymentEngine};
use crate::effects::{
    Action, AmountEvaluator, DynamicAmount, Effect, EffectContext, EffectResolver, Env, PlayerRef, TargetRef,
    TargetSpec, TargetValidator,
};
use crate::error::{Result, RulesError};
use crate::layers::LayerSystem;
use crate::stack::{StackEntry, StackEntryKind};
use crate::triggers::{GameEvent, PendingTrigger, TriggerDetector};
use crate::zones::{ZoneId, ZoneKind, ZoneMove, ZoneMover};

/// Result of a completed game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Winner(PlayerId),
    /// Every player lost at once.
    Draw,
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        matches!(self, GameResult::Winner(p) if *p == player)
    }
}

/// What the game is waiting for.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    /// The player holds priority.
    Priority(PlayerId),
    /// A player must answer before anything else happens.
    Decision(DecisionRequest),
    GameOver(GameResult),
}

/// A player's choices when casting a spell or activating an ability.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CastRequest {
    /// Chosen targets, one list per target slot.
    pub targets: Vec<Vec<TargetRef>>,
    /// Chosen modes, for modal spells and abilities.
    pub modes: Vec<usize>,
    /// X and the objects chosen to pay the cost.
    pub payment: CostPayment,
}

impl CastRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Vec<Vec<TargetRef>>) -> Self {
        self.targets = targets;
        self
    }

    /// Shorthand for a single slot with a single target.
    #[must_use]
    pub fn targeting(self, target: TargetRef) -> Self {
        self.with_targets(vec![vec![target]])
    }

    #[must_use]
    pub fn with_modes(mut self, modes: Vec<usize>) -> Self {
        self.modes = modes;
        self
    }

    #[must_use]
    pub fn with_payment(mut self, payment: CostPayment) -> Self {
        self.payment = payment;
        self
    }
}

/// Something a player could do with priority right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayOption {
    Cast(ObjectId),
    /// Activate the `index`-th ability of the source's effective
    /// characteristics.
    Activate { source: ObjectId, index: usize },
    PlayLand(ObjectId),
}

/// A unit of work run on a checkpoint.
#[derive(Clone, Debug)]
enum Work {
    Resolve,
    /// State-based actions, then triggers, then priority.
    Settle { priority_to: PlayerId },
    AdvanceStep,
    /// Turn-based actions for the step just entered.
    BeginStep,
    Move(ZoneMove),
    PlayLand { player: PlayerId, card: ObjectId },
}

/// Work stopped for a decision.
#[derive(Clone, Debug)]
struct Pending {
    work: Work,
    answers: Vec<DecisionResponse>,
    request: DecisionRequest,
    queue: VecDeque<Work>,
}

/// A game in progress.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use ccg_rules::cards::{CardDefinition, CardId, Characteristics};
/// use ccg_rules::core::{EngineConfig, PlayerId};
/// use ccg_rules::rules::{Game, Progress};
/// use ccg_rules::zones::ZoneId;
///
/// let mut game = Game::new(EngineConfig::new(2).with_skip_first_draw(true));
/// let bears = Arc::new(CardDefinition::new(CardId::new(1), Characteristics::creature("Bears", 2, 2)));
/// game.create_object(bears, PlayerId::new(0), ZoneId::Battlefield).unwrap();
///
/// let progress = game.start().unwrap();
/// assert_eq!(progress, Progress::Priority(PlayerId::new(0)));
/// ```
#[derive(Clone, Debug)]
pub struct Game {
    state: GameState,
    pending: Option<Pending>,
}

impl Game {
    pub fn new(config: EngineConfig) -> Self {
        Self::from_state(GameState::new(config))
    }

    /// Continue from an existing state, such as a restored snapshot.
    pub fn from_state(state: GameState) -> Self {
        Self { state, pending: None }
    }

    // === Observation ===

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for setting up positions. Changes made here skip
    /// every rules check.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[must_use]
    pub fn pending_decision(&self) -> Option<&DecisionRequest> {
        self.pending.as_ref().map(|p| &p.request)
    }

    /// What the game is waiting for now.
    #[must_use]
    pub fn progress(&self) -> Progress {
        if let Some(result) = &self.state.result {
            return Progress::GameOver(result.clone());
        }
        if let Some(pending) = &self.pending {
            return Progress::Decision(pending.request.clone());
        }
        Progress::Priority(self.state.priority.holder().unwrap_or(self.state.turn.active))
    }

    pub fn effective_characteristics(&self, object: ObjectId) -> Result<Characteristics> {
        LayerSystem::effective_characteristics(&self.state, object)
    }

    #[must_use]
    pub fn current_zone_contents(&self, zone: ZoneId) -> Vec<ObjectId> {
        self.state.zone_contents(zone)
    }

    // === Setup ===

    /// Put a new object for `definition` into `zone`.
    pub fn create_object(&mut self, definition: Arc<CardDefinition>, owner: PlayerId, zone: ZoneId) -> Result<ObjectId> {
        self.state.place_new(definition, owner, zone)
    }

    /// Begin the first turn. Runs the untap step and hands the active
    /// player priority in upkeep.
    pub fn start(&mut self) -> Result<Progress> {
        if self.state.priority.holder().is_some() || self.state.turn.number != 1 || self.state.turn.step != Step::Untap {
            return Err(RulesError::InvalidAction("the game has already started".into()));
        }
        info!(players = self.state.player_count(), "game started");
        self.drive(VecDeque::from([Work::BeginStep]), Vec::new())
    }

    // === Queries ===

    /// Every spell, ability and land `player` could use right now, with
    /// X = 0 and automatically chosen cost objects.
    #[must_use]
    pub fn legal_casts_and_activations(&self, player: PlayerId) -> Vec<PlayOption> {
        if self.ensure_can_act(player).is_err() {
            return Vec::new();
        }
        let Ok(table) = self.state.characteristics() else {
            return Vec::new();
        };
        let env = Env::new(&self.state, &table);
        let mut options = Vec::new();

        for card in self.state.zone_contents(ZoneId::Hand(player)) {
            let Some(view) = env.view(card) else {
                continue;
            };
            if view.characteristics.is_land() {
                if self.can_play_land(player) {
                    options.push(PlayOption::PlayLand(card));
                }
                continue;
            }
            if !self.spell_timing_ok(player, view.characteristics) {
                continue;
            }
            let ctx = EffectContext::new(player).with_source(card);
            let cost = spell_cost(view.characteristics);
            if CostPaymentEngine::can_pay(&cost, player, Some(card), &self.state)
                && TargetValidator::has_legal_choices(&spell_targets(&view.object.definition), &env, &ctx)
            {
                options.push(PlayOption::Cast(card));
            }
        }

        for view in env.battlefield().filter(|v| v.controller == player) {
            for (index, ability) in view.characteristics.abilities.iter().enumerate() {
                let Some(ability) = ability.as_activated() else {
                    continue;
                };
                if ability.timing == ActivationTiming::Sorcery && !self.sorcery_timing(player) {
                    continue;
                }
                let ctx = EffectContext::new(player).with_source(view.id());
                if CostPaymentEngine::can_pay(&ability.cost, player, Some(view.id()), &self.state)
                    && TargetValidator::has_legal_choices(&ability.targets, &env, &ctx)
                {
                    options.push(PlayOption::Activate {
                        source: view.id(),
                        index,
                    });
                }
            }
        }
        options
    }

    // === Player actions ===

    /// Cast a spell from `player`'s hand.
    ///
    /// Targets, modes and the cost are all checked before anything
    /// changes. On success the spell is on the stack and the caster keeps
    /// priority.
    pub fn cast_spell(&mut self, player: PlayerId, card: ObjectId, request: CastRequest) -> Result<Progress> {
        self.ensure_can_act(player)?;
        let table = self.state.characteristics()?;
        let env = Env::new(&self.state, &table);

        let view = env
            .view(card)
            .filter(|v| v.zone() == ZoneId::Hand(player))
            .ok_or_else(|| RulesError::InvalidAction(format!("{card} is not in {player}'s hand")))?;
        let chars = view.characteristics;
        if chars.is_land() {
            return Err(RulesError::InvalidAction(format!("{card} is a land; play it instead")));
        }
        if !self.spell_timing_ok(player, chars) {
            return Err(RulesError::InvalidAction(format!("{card} cannot be cast now")));
        }

        let definition = Arc::clone(&view.object.definition);
        let specs = spell_targets(&definition);
        let effect = definition
            .spell
            .as_ref()
            .map_or_else(Effect::nothing, |spell| spell.effect.clone());
        let x = request.payment.x;
        let ctx = EffectContext::new(player).with_source(card).with_x(i64::from(x));
        let (effect, modes) = choose_modes(player, Some(card), effect, &request.modes)?;
        TargetValidator::validate_declaration(&specs, &request.targets, &env, &ctx)?;

        let cost = spell_cost(chars);
        CostPaymentEngine::validate(&cost, player, Some(card), &request.payment, &self.state)?;

        let mut working = self.state.clone();
        let spell = ZoneMover::move_object(
            &mut working,
            &mut Choices::defaulting(),
            ZoneMove::new(card, ZoneKind::Stack).under_control_of(player),
        )
        .map_err(Interrupt::into_error)?
        .ok_or_else(|| RulesError::invariant(format!("{card} did not reach the stack")))?;
        CostPaymentEngine::pay(&cost, player, Some(spell), &request.payment, &mut working)?;

        let ctx = EffectContext::new(player).with_source(spell).with_x(i64::from(x));
        let effect = lock_on_stack(&working, effect, &ctx)?;
        let entry = StackEntry::new(StackEntryKind::Spell, player, effect)
            .with_source(spell)
            .with_targets(specs, request.targets)
            .with_modes(modes)
            .with_x(i64::from(x));
        let id = working.stack.push(entry);
        working.emit(GameEvent::SpellCast {
            spell,
            controller: player,
        });
        debug!(%player, %spell, entry = %id, name = definition.name(), "spell cast");

        self.state = working;
        self.drive(VecDeque::from([Work::Settle { priority_to: player }]), Vec::new())
    }

    /// Activate the `index`-th ability of `source`. Mana abilities resolve
    /// immediately; everything else goes on the stack.
    pub fn activate_ability(
        &mut self,
        player: PlayerId,
        source: ObjectId,
        index: usize,
        request: CastRequest,
    ) -> Result<Progress> {
        self.ensure_can_act(player)?;
        let table = self.state.characteristics()?;
        let env = Env::new(&self.state, &table);

        let view = env
            .view(source)
            .filter(|v| v.zone().is_battlefield() && v.controller == player)
            .ok_or_else(|| RulesError::InvalidAction(format!("{player} does not control {source}")))?;
        let ability: ActivatedAbility = view
            .characteristics
            .abilities
            .get(index)
            .and_then(Ability::as_activated)
            .cloned()
            .ok_or_else(|| RulesError::InvalidAction(format!("{source} has no activated ability {index}")))?;
        if ability.timing == ActivationTiming::Sorcery && !self.sorcery_timing(player) {
            return Err(RulesError::InvalidAction(format!(
                "ability {index} of {source} can only be activated at sorcery speed"
            )));
        }

        let x = request.payment.x;
        let ctx = EffectContext::new(player).with_source(source).with_x(i64::from(x));
        let (effect, modes) = choose_modes(player, Some(source), ability.effect.clone(), &request.modes)?;
        TargetValidator::validate_declaration(&ability.targets, &request.targets, &env, &ctx)?;
        CostPaymentEngine::validate(&ability.cost, player, Some(source), &request.payment, &self.state)?;

        let mut working = self.state.clone();
        CostPaymentEngine::pay(&ability.cost, player, Some(source), &request.payment, &mut working)?;

        if ability.mana_ability {
            EffectResolver::resolve(&mut working, &mut Choices::defaulting(), &effect, &ctx)
                .map_err(Interrupt::into_error)?;
            trace!(%player, %source, "mana ability resolved");
        } else {
            let effect = lock_on_stack(&working, effect, &ctx)?;
            let entry = StackEntry::new(StackEntryKind::ActivatedAbility, player, effect)
                .with_source(source)
                .with_targets(ability.targets.clone(), request.targets)
                .with_modes(modes)
                .with_x(i64::from(x))
                .requiring_source(ability.requires_source);
            let id = working.stack.push(entry);
            debug!(%player, %source, entry = %id, "ability activated");
        }
        working.emit(GameEvent::AbilityActivated {
            source,
            controller: player,
        });

        self.state = working;
        self.drive(VecDeque::from([Work::Settle { priority_to: player }]), Vec::new())
    }

    /// Play a land from `player`'s hand.
    pub fn play_land(&mut self, player: PlayerId, card: ObjectId) -> Result<Progress> {
        self.ensure_can_act(player)?;
        let is_land_in_hand = self
            .state
            .object(card)
            .is_some_and(|o| o.zone == ZoneId::Hand(player) && o.definition.characteristics.is_land());
        if !is_land_in_hand {
            return Err(RulesError::InvalidAction(format!("{card} is not a land in {player}'s hand")));
        }
        if !self.can_play_land(player) {
            return Err(RulesError::InvalidAction(format!("{player} cannot play a land now")));
        }
        self.drive(VecDeque::from([Work::PlayLand { player, card }]), Vec::new())
    }

    /// The priority holder passes. When every player has passed in
    /// succession the top of the stack resolves, or the game moves to the
    /// next step if the stack is empty.
    pub fn pass_priority(&mut self, player: PlayerId) -> Result<Progress> {
        self.ensure_can_act(player)?;
        let in_game = self.state.players_in_turn_order();
        if !self.state.priority.pass(&in_game) {
            trace!(%player, "priority passed");
            return Ok(self.progress());
        }
        let work = if self.state.stack.is_empty() {
            Work::AdvanceStep
        } else {
            Work::Resolve
        };
        self.drive(VecDeque::from([work]), Vec::new())
    }

    /// Resolve the top of the stack without waiting for passes.
    pub fn resolve_top_of_stack(&mut self) -> Result<Progress> {
        self.ensure_no_pending()?;
        if self.state.stack.is_empty() {
            return Ok(self.progress());
        }
        self.drive(VecDeque::from([Work::Resolve]), Vec::new())
    }

    /// Pay a cost outside of casting, all or nothing.
    pub fn pay_cost(
        &mut self,
        player: PlayerId,
        cost: &Cost,
        source: Option<ObjectId>,
        payment: &CostPayment,
    ) -> Result<()> {
        self.ensure_no_pending()?;
        CostPaymentEngine::pay(cost, player, source, payment, &mut self.state)
    }

    /// Move an object under the rules: replacement effects apply, the
    /// object gets a new identity, and triggers are checked.
    pub fn move_object(&mut self, mv: ZoneMove) -> Result<Progress> {
        self.ensure_no_pending()?;
        if self.state.object(mv.object).is_none() {
            return Err(RulesError::InvalidAction(format!("{} does not exist", mv.object)));
        }
        let priority_to = self.state.priority.holder().unwrap_or(self.state.turn.active);
        self.drive(VecDeque::from([Work::Move(mv), Work::Settle { priority_to }]), Vec::new())
    }

    /// Answer the pending decision.
    ///
    /// An answer that does not fit the request is rejected with
    /// `InvalidAction` and the decision stays pending.
    pub fn submit_decision(&mut self, player: PlayerId, response: DecisionResponse) -> Result<Progress> {
        let Some(pending) = &self.pending else {
            return Err(RulesError::InvalidAction("no decision is pending".into()));
        };
        if pending.request.player() != player {
            return Err(RulesError::InvalidAction(format!(
                "{} must decide, not {player}",
                pending.request.player()
            )));
        }
        pending.request.validate(&response)?;

        let Some(mut pending) = self.pending.take() else {
            return Err(RulesError::invariant("pending decision vanished"));
        };
        pending.answers.push(response);
        let mut queue = pending.queue;
        queue.push_front(pending.work);
        self.drive(queue, pending.answers)
    }

    // === Driver ===

    /// Run work items in order. `answers` belong to the first item.
    fn drive(&mut self, mut queue: VecDeque<Work>, mut answers: Vec<DecisionResponse>) -> Result<Progress> {
        while let Some(work) = queue.pop_front() {
            if self.state.is_over() {
                break;
            }
            let given = std::mem::take(&mut answers);
            let mut working = self.state.clone();
            let mut choices = Choices::new(given.clone());
            match perform(&mut working, &mut choices, &work) {
                Ok(follow_up) => {
                    self.state = working;
                    for next in follow_up.into_iter().rev() {
                        queue.push_front(next);
                    }
                }
                Err(Interrupt::Decision(request)) => {
                    debug!(player = %request.player(), ?work, "waiting for a decision");
                    self.pending = Some(Pending {
                        work,
                        answers: given,
                        request,
                        queue,
                    });
                    return Ok(self.progress());
                }
                Err(Interrupt::Error(err)) => return Err(err),
            }
        }
        Ok(self.progress())
    }

    // === Checks ===

    fn ensure_no_pending(&self) -> Result<()> {
        if self.pending.is_some() {
            return Err(RulesError::InvalidAction("a decision is pending".into()));
        }
        if self.state.is_over() {
            return Err(RulesError::InvalidAction("the game is over".into()));
        }
        Ok(())
    }

    fn ensure_can_act(&self, player: PlayerId) -> Result<()> {
        self.ensure_no_pending()?;
        if self.state.priority.holder() != Some(player) {
            return Err(RulesError::InvalidAction(format!("{player} does not have priority")));
        }
        Ok(())
    }

    /// Own main phase with an empty stack.
    fn sorcery_timing(&self, player: PlayerId) -> bool {
        self.state.turn.active == player && self.state.turn.step.is_main() && self.state.stack.is_empty()
    }

    fn spell_timing_ok(&self, player: PlayerId, chars: &Characteristics) -> bool {
        chars.has_type(CardType::Instant) || chars.has_keyword(&Keyword::Flash) || self.sorcery_timing(player)
    }

    fn can_play_land(&self, player: PlayerId) -> bool {
        self.sorcery_timing(player) && self.state.players[player].lands_played == 0
    }
}

/// The targets a spell declares: its spell ability's, or for an Aura
/// without one, the object it will enchant.
fn spell_targets(definition: &CardDefinition) -> Vec<TargetSpec> {
    match (&definition.spell, &definition.enchant) {
        (Some(spell), _) if !spell.targets.is_empty() => spell.targets.clone(),
        (_, Some(enchant)) => vec![TargetSpec::object(enchant.clone())],
        _ => Vec::new(),
    }
}

fn spell_cost(chars: &Characteristics) -> Cost {
    chars.mana_cost.clone().map_or_else(Cost::free, Cost::mana)
}

/// Replace a modal root by the chosen modes, checking the choice.
fn choose_modes(
    player: PlayerId,
    source: Option<ObjectId>,
    effect: Effect,
    chosen: &[usize],
) -> Result<(Effect, Vec<usize>)> {
    match effect {
        Effect::Modal { modes, min, max } => {
            let request = DecisionRequest::ChooseModes {
                player,
                source,
                count: modes.len(),
                min,
                max,
            };
            request.validate(&DecisionResponse::Modes(chosen.to_vec()))?;
            let mut chosen = chosen.to_vec();
            chosen.sort_unstable();
            let parts = chosen.iter().filter_map(|&i| modes.get(i).cloned()).collect();
            Ok((Effect::Composite(parts), chosen))
        }
        other if chosen.is_empty() => Ok((other, Vec::new())),
        _ => Err(RulesError::InvalidAction("modes chosen for a non-modal effect".into())),
    }
}

/// Fix every on-stack amount in `effect` to its current value.
fn lock_on_stack(state: &GameState, mut effect: Effect, ctx: &EffectContext) -> Result<Effect> {
    let table = state.characteristics()?;
    let env = Env::new(state, &table);
    effect.map_amounts(&mut |amount| AmountEvaluator::lock_in_place(amount, &env, ctx));
    Ok(effect)
}

// === Work ===

fn perform(state: &mut GameState, choices: &mut Choices, work: &Work) -> Flow<Vec<Work>> {
    match work {
        Work::Resolve => {
            resolve_top(state, choices)?;
            Ok(vec![Work::Settle {
                priority_to: state.turn.active,
            }])
        }
        Work::Settle { priority_to } => {
            settle(state, choices, *priority_to)?;
            Ok(Vec::new())
        }
        Work::AdvanceStep => {
            advance_step(state);
            Ok(vec![Work::BeginStep])
        }
        Work::BeginStep => begin_step(state, choices),
        Work::Move(mv) => {
            ZoneMover::move_object(state, choices, mv.clone())?;
            Ok(Vec::new())
        }
        Work::PlayLand { player, card } => {
            ZoneMover::move_object(
                state,
                choices,
                ZoneMove::new(*card, ZoneKind::Battlefield).under_control_of(*player),
            )?;
            state.players[*player].lands_played += 1;
            debug!(%player, %card, "land played");
            Ok(vec![Work::Settle { priority_to: *player }])
        }
    }
}

/// State-based actions, then pending triggers onto the stack in APNAP
/// order, then priority.
fn settle(state: &mut GameState, choices: &mut Choices, priority_to: PlayerId) -> Flow<()> {
    state.priority.clear();
    StateBasedActions::check(state, choices)?;
    if state.is_over() {
        return Ok(());
    }
    TriggerDetector::collect(state)?;
    place_triggers(state, choices)?;

    let holder = if state.players[priority_to].lost {
        state.players_in_apnap_order().into_iter().next()
    } else {
        Some(priority_to)
    };
    if let Some(holder) = holder {
        state.priority.give(holder);
        trace!(%holder, "priority given");
    }
    Ok(())
}

fn place_triggers(state: &mut GameState, choices: &mut Choices) -> Flow<()> {
    if state.pending_triggers.is_empty() {
        return Ok(());
    }
    let pending: Vec<PendingTrigger> = std::mem::take(&mut state.pending_triggers).into_iter().collect();
    for player in state.players_in_apnap_order() {
        let mine: Vec<&PendingTrigger> = pending.iter().filter(|t| t.controller == player).collect();
        if mine.is_empty() {
            continue;
        }
        let order = if mine.len() > 1 && !state.config.auto_order_triggers {
            choices.order(player, mine.iter().map(|t| t.source).collect())?
        } else {
            (0..mine.len()).collect()
        };
        for index in order {
            if let Some(trigger) = mine.get(index) {
                place_trigger(state, choices, trigger)?;
            }
        }
    }
    Ok(())
}

/// Choose targets and modes for a trigger and put it on the stack. A
/// trigger whose required targets cannot be chosen is removed.
fn place_trigger(state: &mut GameState, choices: &mut Choices, trigger: &PendingTrigger) -> Flow<()> {
    let mut ctx = EffectContext::new(trigger.controller).with_trigger(trigger.trigger.clone());
    if let Some(source) = trigger.source {
        ctx = ctx.with_source(source);
    }

    let slots: Vec<TargetSlot> = {
        let table = state.characteristics()?;
        let env = Env::new(state, &table);
        trigger
            .targets
            .iter()
            .map(|spec| {
                let candidates = TargetValidator::candidates(spec, &env, &ctx);
                TargetSlot {
                    min: spec.min,
                    max: spec.max.min(candidates.len()),
                    candidates,
                }
            })
            .collect()
    };
    if slots.iter().any(|slot| slot.candidates.len() < slot.min) {
        debug!(source = ?trigger.source, "trigger removed: no legal target");
        return Ok(());
    }
    let chosen = if slots.iter().all(|slot| slot.candidates.len() == slot.min) {
        slots.into_iter().map(|slot| slot.candidates).collect()
    } else {
        choices.targets(trigger.controller, trigger.source, slots)?
    };

    let (effect, modes) = match &trigger.effect {
        Effect::Modal { modes, min, max } => {
            let picked = choices.modes(trigger.controller, trigger.source, modes.len(), *min, *max)?;
            let parts = picked.iter().filter_map(|&i| modes.get(i).cloned()).collect();
            (Effect::Composite(parts), picked)
        }
        other => (other.clone(), Vec::new()),
    };
    let ctx = ctx.with_targets(chosen.clone());
    let effect = lock_on_stack(state, effect, &ctx)?;

    let mut entry = StackEntry::new(StackEntryKind::TriggeredAbility, trigger.controller, effect)
        .with_targets(trigger.targets.clone(), chosen)
        .with_modes(modes)
        .with_trigger(trigger.trigger.clone())
        .with_condition(trigger.condition.clone())
        .requiring_source(trigger.requires_source);
    if let Some(source) = trigger.source {
        entry = entry.with_source(source);
    }
    let id = state.stack.push(entry);
    debug!(controller = %trigger.controller, source = ?trigger.source, entry = %id, "trigger put on the stack");
    Ok(())
}

fn resolve_top(state: &mut GameState, choices: &mut Choices) -> Flow<()> {
    let entry = state
        .stack
        .pop()
        .ok_or_else(|| RulesError::invariant("resolving an empty stack"))?;
    state.priority.clear();
    state.stack.set_resolving(true);
    let result = resolve_entry(state, choices, &entry);
    state.stack.set_resolving(false);
    result
}

fn resolve_entry(state: &mut GameState, choices: &mut Choices, entry: &StackEntry) -> Flow<()> {
    let mut ctx = EffectContext::new(entry.controller).with_x(entry.x);
    if let Some(source) = entry.source {
        ctx = ctx.with_source(source);
    }
    if let Some(trigger) = &entry.trigger {
        ctx = ctx.with_trigger(trigger.clone());
    }

    if entry.requires_source && entry.source.is_some_and(|s| state.object(s).is_none()) {
        debug!(entry = %entry.id, "abandoned: source left");
        return Ok(());
    }

    let recheck = {
        let table = state.characteristics()?;
        let env = Env::new(state, &table);
        if let Some(condition) = &entry.condition {
            let ctx = ctx.clone().with_targets(entry.chosen.clone());
            if !AmountEvaluator::evaluate_condition(condition, &env, &ctx) {
                debug!(entry = %entry.id, "abandoned: condition no longer true");
                return Ok(());
            }
        }
        TargetValidator::recheck(&entry.targets, &entry.chosen, &env, &ctx)
    };
    if recheck.all_illegal {
        debug!(entry = %entry.id, "fizzled: every target is illegal");
        if entry.is_spell() {
            if let Some(card) = entry.source.filter(|&s| state.object(s).is_some()) {
                ZoneMover::move_object(state, choices, ZoneMove::new(card, ZoneKind::Graveyard))?;
            }
        }
        return Ok(());
    }
    let ctx = ctx.with_targets(recheck.targets);
    trace!(entry = %entry.id, kind = ?entry.kind, "resolving");
    EffectResolver::resolve(state, choices, &entry.effect, &ctx)?;

    if entry.is_spell() {
        finish_spell(state, choices, entry, &ctx)?;
    }
    Ok(())
}

/// A resolved permanent spell enters the battlefield; anything else goes
/// to the graveyard.
fn finish_spell(state: &mut GameState, choices: &mut Choices, entry: &StackEntry, ctx: &EffectContext) -> Flow<()> {
    let Some(card) = entry.source.filter(|&s| state.object(s).is_some_and(|o| o.zone == ZoneId::Stack)) else {
        return Ok(());
    };
    let is_permanent = {
        let table = state.characteristics()?;
        table.characteristics(card).is_some_and(Characteristics::is_permanent)
    };
    if !is_permanent {
        ZoneMover::move_object(state, choices, ZoneMove::new(card, ZoneKind::Graveyard))?;
        return Ok(());
    }

    let entered = ZoneMover::move_object(
        state,
        choices,
        ZoneMove::new(card, ZoneKind::Battlefield).under_control_of(entry.controller),
    )?;
    if let Some(permanent) = entered {
        let aura_target = state
            .object(permanent)
            .filter(|o| o.definition.enchant.is_some())
            .and_then(|_| ctx.targets.first())
            .and_then(|slot| slot.iter().find_map(TargetRef::object));
        if let Some(host) = aura_target {
            if let Some(object) = state.object_mut(permanent) {
                object.attached_to = Some(host);
            }
        }
        debug!(%permanent, "permanent spell resolved");
    }
    Ok(())
}

fn advance_step(state: &mut GameState) {
    for (_, player) in state.players.iter_mut() {
        player.mana_pool.clear();
    }
    match state.turn.step.next() {
        Some(step) => state.turn.step = step,
        None => {
            let next = next_in_turn_order(state, state.turn.active);
            state.turn = TurnState {
                number: state.turn.number + 1,
                active: next,
                step: Step::Untap,
            };
            for (_, player) in state.players.iter_mut() {
                player.lands_played = 0;
            }
            info!(turn = state.turn.number, active = %next, "turn began");
        }
    }
}

fn next_in_turn_order(state: &GameState, after: PlayerId) -> PlayerId {
    let count = state.player_count();
    let mut next = after.next(count);
    for _ in 0..count {
        if !state.players[next].lost {
            break;
        }
        next = next.next(count);
    }
    next
}

fn begin_step(state: &mut GameState, choices: &mut Choices) -> Flow<Vec<Work>> {
    let active = state.turn.active;
    let step = state.turn.step;
    state.emit(GameEvent::StepBegan { step, active });
    debug!(%step, %active, "step began");

    match step {
        Step::Untap => {
            let table = state.characteristics()?;
            let mine: Vec<ObjectId> = state
                .zone_contents(ZoneId::Battlefield)
                .into_iter()
                .filter(|&id| table.controller(id) == Some(active))
                .collect();
            for id in mine {
                let Some(object) = state.object_mut(id) else {
                    continue;
                };
                object.summoning_sick = false;
                if object.tapped {
                    object.tapped = false;
                    state.emit(GameEvent::Untapped { object: id });
                }
            }
            Ok(vec![Work::AdvanceStep])
        }
        Step::Draw => {
            let skip = state.turn.number == 1 && state.config.skip_first_draw;
            if !skip {
                let draw = Effect::simple(Action::DrawCards {
                    player: PlayerRef::You,
                    amount: DynamicAmount::Fixed(1),
                });
                EffectResolver::resolve(state, choices, &draw, &EffectContext::new(active))?;
            }
            Ok(vec![Work::Settle { priority_to: active }])
        }
        Step::Cleanup => {
            let hand = state.zone_contents(ZoneId::Hand(active));
            let excess = hand.len().saturating_sub(state.config.max_hand_size);
            if excess > 0 {
                let discarded = choices.objects(active, hand, excess, excess, ChoiceReason::CleanupDiscard)?;
                for card in discarded {
                    ZoneMover::move_object(state, choices, ZoneMove::new(card, ZoneKind::Graveyard))?;
                    state.emit(GameEvent::Discarded { player: active, card });
                }
            }
            state.end_of_turn_cleanup();
            let acted = StateBasedActions::check(state, choices)?;
            TriggerDetector::collect(state)?;
            if acted || !state.pending_triggers.is_empty() {
                Ok(vec![Work::Settle { priority_to: active }])
            } else {
                Ok(vec![Work::AdvanceStep])
            }
        }
        _ => Ok(vec![Work::Settle { priority_to: active }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardId;
    use crate::costs::{ManaCost, ManaType};
    use crate::cards::Color;
    use crate::effects::{ObjectFilter, Recipient};

    fn card(id: u32, chars: Characteristics) -> Arc<CardDefinition> {
        Arc::new(CardDefinition::new(CardId::new(id), chars))
    }

    fn shock() -> Arc<CardDefinition> {
        Arc::new(
            CardDefinition::new(
                CardId::new(10),
                Characteristics::new("Shock")
                    .with_type(CardType::Instant)
                    .with_mana_cost(ManaCost::parse("{R}").unwrap()),
            )
            .with_spell(
                crate::cards::SpellAbility::new(Effect::simple(Action::DealDamage {
                    amount: DynamicAmount::Fixed(2),
                    to: Recipient::Target(0),
                }))
                .with_target(TargetSpec::any()),
            ),
        )
    }

    fn started() -> Game {
        let mut game = Game::new(EngineConfig::new(2));
        game.start().unwrap();
        game
    }

    #[test]
    fn test_start_gives_active_player_priority_in_upkeep() {
        let game = started();
        assert_eq!(game.progress(), Progress::Priority(PlayerId(0)));
        assert_eq!(game.state().turn.step, Step::Upkeep);
    }

    #[test]
    fn test_all_passing_advances_step() {
        let mut game = started();
        game.pass_priority(PlayerId(0)).unwrap();
        assert_eq!(game.progress(), Progress::Priority(PlayerId(1)));
        game.pass_priority(PlayerId(1)).unwrap();
        assert_eq!(game.state().turn.step, Step::Draw);
        assert_eq!(game.progress(), Progress::Priority(PlayerId(0)));
    }

    #[test]
    fn test_wrong_player_cannot_pass() {
        let mut game = started();
        let err = game.pass_priority(PlayerId(1)).unwrap_err();
        assert!(matches!(err, RulesError::InvalidAction(_)));
    }

    #[test]
    fn test_cast_and_resolve_shock() {
        let mut game = started();
        let p0 = PlayerId(0);
        let p1 = PlayerId(1);
        let shock = game.create_object(shock(), p0, ZoneId::Hand(p0)).unwrap();
        game.state_mut().players[p0].mana_pool.add(ManaType::Colored(Color::Red), 1);

        let progress = game
            .cast_spell(p0, shock, CastRequest::new().targeting(TargetRef::Player(p1)))
            .unwrap();
        assert_eq!(progress, Progress::Priority(p0));
        assert_eq!(game.state().stack.len(), 1);

        game.pass_priority(p0).unwrap();
        game.pass_priority(p1).unwrap();
        assert!(game.state().stack.is_empty());
        assert_eq!(game.state().players[p1].life, 18);
        assert_eq!(game.current_zone_contents(ZoneId::Graveyard(p0)).len(), 1);
    }

    #[test]
    fn test_failed_cast_changes_nothing() {
        let mut game = started();
        let p0 = PlayerId(0);
        let shock = game.create_object(shock(), p0, ZoneId::Hand(p0)).unwrap();
        let before = game.state().snapshot().unwrap();

        let err = game
            .cast_spell(p0, shock, CastRequest::new().targeting(TargetRef::Player(PlayerId(1))))
            .unwrap_err();
        assert!(matches!(err, RulesError::UnpayableCost(_)));
        assert_eq!(game.state().snapshot().unwrap(), before);
    }

    #[test]
    fn test_sorcery_speed_permanent_needs_main_phase() {
        let mut game = started();
        let p0 = PlayerId(0);
        let bears = game
            .create_object(card(1, Characteristics::creature("Bears", 2, 2)), p0, ZoneId::Hand(p0))
            .unwrap();
        let err = game.cast_spell(p0, bears, CastRequest::new()).unwrap_err();
        assert!(matches!(err, RulesError::InvalidAction(_)));
        assert!(game.legal_casts_and_activations(p0).is_empty());
    }

    #[test]
    fn test_submit_without_pending_decision() {
        let mut game = started();
        let err = game.submit_decision(PlayerId(0), DecisionResponse::Bool(true)).unwrap_err();
        assert!(matches!(err, RulesError::InvalidAction(_)));
    }

    #[test]
    fn test_destroy_all_creatures_empties_battlefield() {
        let mut game = started();
        let p0 = PlayerId(0);
        for owner in [0, 1] {
            game.create_object(card(1, Characteristics::creature("Bears", 2, 2)), PlayerId(owner), ZoneId::Battlefield)
                .unwrap();
        }
        let wrath = Arc::new(
            CardDefinition::new(CardId::new(2), Characteristics::new("Wrath").with_type(CardType::Instant)).with_spell(
                crate::cards::SpellAbility::new(Effect::for_each(
                    crate::effects::Group::Objects(ObjectFilter::creature()),
                    Effect::simple(Action::Destroy(crate::effects::ObjectRef::Current)),
                )),
            ),
        );
        let wrath = game.create_object(wrath, p0, ZoneId::Hand(p0)).unwrap();
        game.cast_spell(p0, wrath, CastRequest::new()).unwrap();
        game.resolve_top_of_stack().unwrap();
        assert!(game.current_zone_contents(ZoneId::Battlefield).is_empty());
    }
}

//! Stack and priority integration tests.
//!
//! These tests drive a [`Game`] through casting, responding and resolving,
//! and check last-in-first-out resolution, countering, targets that become
//! illegal, modes and when amounts are locked in.

use std::sync::Arc;

use proptest::prelude::*;

use ccg_rules::abilities::{Ability, ActivatedAbility};
use ccg_rules::cards::{CardDefinition, CardId, CardType, Characteristics, Color, SpellAbility};
use ccg_rules::core::{EngineConfig, ObjectId, PlayerId};
use ccg_rules::costs::{Cost, ManaCost, ManaType};
use ccg_rules::effects::{
    Action, DynamicAmount, Effect, ObjectFilter, ObjectRef, PlayerFilter, PlayerRef, Recipient, TargetRef, TargetSpec,
};
use ccg_rules::rules::{CastRequest, Game, Progress};
use ccg_rules::stack::StackEntryId;
use ccg_rules::zones::{ZoneId, ZoneKind, ZoneMove};
use ccg_rules::RulesError;

const P0: PlayerId = PlayerId(0);
const P1: PlayerId = PlayerId(1);

fn started() -> Game {
    let mut game = Game::new(EngineConfig::new(2).with_skip_first_draw(true));
    game.start().unwrap();
    game
}

fn instant(name: &str, cost: Option<&str>, spell: SpellAbility) -> Arc<CardDefinition> {
    let mut chars = Characteristics::new(name).with_type(CardType::Instant);
    if let Some(cost) = cost {
        chars = chars.with_mana_cost(ManaCost::parse(cost).unwrap());
    }
    Arc::new(CardDefinition::new(CardId::new(100), chars).with_spell(spell))
}

fn damage(amount: i64, slot: usize) -> Effect {
    Effect::simple(Action::DealDamage {
        amount: DynamicAmount::Fixed(amount),
        to: Recipient::Target(slot),
    })
}

fn gain(amount: DynamicAmount) -> Effect {
    Effect::simple(Action::GainLife {
        player: PlayerRef::You,
        amount,
    })
}

fn shock() -> Arc<CardDefinition> {
    instant("Shock", Some("{R}"), SpellAbility::new(damage(2, 0)).with_target(TargetSpec::any()))
}

fn creature(game: &mut Game, owner: PlayerId, name: &str) -> ObjectId {
    let definition = Arc::new(CardDefinition::new(CardId::new(1), Characteristics::creature(name, 2, 2)));
    game.create_object(definition, owner, ZoneId::Battlefield).unwrap()
}

fn add_mana(game: &mut Game, player: PlayerId, color: Color, amount: u32) {
    game.state_mut().players[player].mana_pool.add(ManaType::Colored(color), amount);
}

/// Everyone passes once, resolving the top of the stack.
fn pass_round(game: &mut Game) {
    for player in [P0, P1] {
        let progress = game.pass_priority(player).unwrap();
        if matches!(progress, Progress::Decision(_)) {
            return;
        }
    }
}

// =============================================================================
// Resolution Order
// =============================================================================

/// Test that the last spell cast resolves first.
#[test]
fn test_last_in_first_out() {
    let mut game = started();
    add_mana(&mut game, P0, Color::Red, 2);
    let lava = instant(
        "Lava Spike",
        Some("{R}"),
        SpellAbility::new(damage(3, 0)).with_target(TargetSpec::player(PlayerFilter::Opponent)),
    );
    let lava = game.create_object(lava, P0, ZoneId::Hand(P0)).unwrap();
    let shock = game.create_object(shock(), P0, ZoneId::Hand(P0)).unwrap();

    game.cast_spell(P0, lava, CastRequest::new().targeting(TargetRef::Player(P1)))
        .unwrap();
    let progress = game
        .cast_spell(P0, shock, CastRequest::new().targeting(TargetRef::Player(P1)))
        .unwrap();
    assert_eq!(progress, Progress::Priority(P0));
    assert_eq!(game.state().stack.len(), 2);

    pass_round(&mut game);
    assert_eq!(game.state().players[P1].life, 18);
    assert_eq!(game.state().stack.len(), 1);
    assert_eq!(game.progress(), Progress::Priority(P0));

    pass_round(&mut game);
    assert_eq!(game.state().players[P1].life, 15);
    assert!(game.state().stack.is_empty());
}

/// Test that passing with an empty stack moves to the next step, while
/// passing with a spell on the stack does not.
#[test]
fn test_passing_resolves_before_advancing() {
    let mut game = started();
    add_mana(&mut game, P0, Color::Red, 1);
    let shock = game.create_object(shock(), P0, ZoneId::Hand(P0)).unwrap();
    game.cast_spell(P0, shock, CastRequest::new().targeting(TargetRef::Player(P1)))
        .unwrap();
    let step = game.state().turn.step;

    pass_round(&mut game);
    assert_eq!(game.state().turn.step, step);

    pass_round(&mut game);
    assert_ne!(game.state().turn.step, step);
}

/// Test that a player without priority cannot cast.
#[test]
fn test_cast_requires_priority() {
    let mut game = started();
    add_mana(&mut game, P1, Color::Red, 1);
    let shock = game.create_object(shock(), P1, ZoneId::Hand(P1)).unwrap();
    let err = game
        .cast_spell(P1, shock, CastRequest::new().targeting(TargetRef::Player(P0)))
        .unwrap_err();
    assert!(matches!(err, RulesError::InvalidAction(_)));
}

// =============================================================================
// Countering and Fizzling
// =============================================================================

/// Test that a counterspell removes the spell, which goes to its owner's
/// graveyard without resolving.
#[test]
fn test_counterspell() {
    let mut game = started();
    add_mana(&mut game, P0, Color::Red, 1);
    add_mana(&mut game, P1, Color::Blue, 1);
    let shock = game.create_object(shock(), P0, ZoneId::Hand(P0)).unwrap();
    let counter = instant(
        "Force Spike",
        Some("{U}"),
        SpellAbility::new(Effect::simple(Action::CounterSpell(ObjectRef::Target(0))))
            .with_target(TargetSpec::spell(ObjectFilter::Any)),
    );
    let counter = game.create_object(counter, P1, ZoneId::Hand(P1)).unwrap();

    game.cast_spell(P0, shock, CastRequest::new().targeting(TargetRef::Player(P1)))
        .unwrap();
    let on_stack = game.state().stack.top().and_then(|e| e.source).unwrap();
    assert_eq!(game.pass_priority(P0).unwrap(), Progress::Priority(P1));

    game.cast_spell(P1, counter, CastRequest::new().targeting(TargetRef::Object(on_stack)))
        .unwrap();
    game.pass_priority(P1).unwrap();
    game.pass_priority(P0).unwrap();

    assert!(game.state().stack.is_empty());
    assert_eq!(game.state().players[P1].life, 20);
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P0)).len(), 1);
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P1)).len(), 1);
}

/// Test that a spell whose only target is gone does nothing and goes to
/// the graveyard.
#[test]
fn test_spell_with_no_legal_targets_fizzles() {
    let mut game = started();
    let bears = creature(&mut game, P1, "Bears");
    let murder = instant(
        "Murder",
        None,
        SpellAbility::new(Effect::simple(Action::Destroy(ObjectRef::Target(0))))
            .with_target(TargetSpec::object(ObjectFilter::creature())),
    );
    let murder = game.create_object(murder, P0, ZoneId::Hand(P0)).unwrap();
    game.cast_spell(P0, murder, CastRequest::new().targeting(TargetRef::Object(bears)))
        .unwrap();

    game.move_object(ZoneMove::new(bears, ZoneKind::Hand)).unwrap();
    game.resolve_top_of_stack().unwrap();

    assert!(game.state().stack.is_empty());
    assert_eq!(game.current_zone_contents(ZoneId::Hand(P1)).len(), 1);
    assert!(game.current_zone_contents(ZoneId::Graveyard(P1)).is_empty());
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P0)).len(), 1);
}

/// Test that a spell with one illegal target still affects the legal one.
#[test]
fn test_partially_illegal_targets() {
    let mut game = started();
    let bears = creature(&mut game, P1, "Bears");
    let spell = instant(
        "Arc Lightning",
        None,
        SpellAbility::new(damage(2, 0).then(damage(2, 1)))
            .with_target(TargetSpec::object(ObjectFilter::creature()))
            .with_target(TargetSpec::player(PlayerFilter::Any)),
    );
    let spell = game.create_object(spell, P0, ZoneId::Hand(P0)).unwrap();
    game.cast_spell(
        P0,
        spell,
        CastRequest::new().with_targets(vec![vec![TargetRef::Object(bears)], vec![TargetRef::Player(P1)]]),
    )
    .unwrap();

    game.move_object(ZoneMove::new(bears, ZoneKind::Exile)).unwrap();
    game.resolve_top_of_stack().unwrap();

    assert_eq!(game.state().players[P1].life, 18);
    assert_eq!(game.current_zone_contents(ZoneId::Exile).len(), 1);
}

/// Test that targets are checked when the spell is cast.
#[test]
fn test_illegal_declared_target_is_rejected() {
    let mut game = started();
    let bears = creature(&mut game, P1, "Bears");
    let drain = instant(
        "Drain",
        None,
        SpellAbility::new(Effect::simple(Action::LoseLife {
            player: PlayerRef::Target(0),
            amount: DynamicAmount::Fixed(2),
        }))
        .with_target(TargetSpec::player(PlayerFilter::Any)),
    );
    let drain = game.create_object(drain, P0, ZoneId::Hand(P0)).unwrap();

    let err = game
        .cast_spell(P0, drain, CastRequest::new().targeting(TargetRef::Object(bears)))
        .unwrap_err();
    assert!(matches!(err, RulesError::IllegalTarget(_)));
    assert!(game.state().stack.is_empty());
    assert_eq!(game.current_zone_contents(ZoneId::Hand(P0)), vec![drain]);
}

// =============================================================================
// Modes and Amounts
// =============================================================================

/// Test that only the chosen mode of a modal spell happens.
#[test]
fn test_modal_spell_uses_chosen_mode() {
    let mut game = started();
    let charm = instant(
        "Charm",
        None,
        SpellAbility::new(Effect::choose_one(vec![
            gain(DynamicAmount::Fixed(3)),
            Effect::simple(Action::LoseLife {
                player: PlayerRef::Opponents,
                amount: DynamicAmount::Fixed(3),
            }),
        ])),
    );
    let charm = game.create_object(charm, P0, ZoneId::Hand(P0)).unwrap();

    let err = game
        .cast_spell(P0, charm, CastRequest::new().with_modes(vec![0, 1]))
        .unwrap_err();
    assert!(matches!(err, RulesError::InvalidAction(_)));

    game.cast_spell(P0, charm, CastRequest::new().with_modes(vec![1])).unwrap();
    assert_eq!(game.state().stack.top().unwrap().modes, vec![1]);
    game.resolve_top_of_stack().unwrap();

    assert_eq!(game.state().players[P0].life, 20);
    assert_eq!(game.state().players[P1].life, 17);
}

/// Test that an amount marked as fixed on the stack ignores later changes,
/// while an ordinary amount is counted on resolution.
#[test]
fn test_on_stack_and_resolution_amounts() {
    let count = || DynamicAmount::Count(ObjectFilter::creature_you_control());
    let mut game = started();
    creature(&mut game, P0, "Bears");
    let locked = instant("Locked", None, SpellAbility::new(gain(count().on_stack())));
    let live = instant("Live", None, SpellAbility::new(gain(count())));
    let locked = game.create_object(locked, P0, ZoneId::Hand(P0)).unwrap();
    let live = game.create_object(live, P0, ZoneId::Hand(P0)).unwrap();

    game.cast_spell(P0, locked, CastRequest::new()).unwrap();
    creature(&mut game, P0, "Wolf");
    game.resolve_top_of_stack().unwrap();
    assert_eq!(game.state().players[P0].life, 21);

    game.cast_spell(P0, live, CastRequest::new()).unwrap();
    creature(&mut game, P0, "Boar");
    game.resolve_top_of_stack().unwrap();
    assert_eq!(game.state().players[P0].life, 24);
}

/// Test that X is carried from casting to resolution.
#[test]
fn test_x_spell() {
    let mut game = started();
    add_mana(&mut game, P0, Color::Red, 4);
    let blaze = instant(
        "Blaze",
        Some("{X}{R}"),
        SpellAbility::new(Effect::simple(Action::DealDamage {
            amount: DynamicAmount::X,
            to: Recipient::Target(0),
        }))
        .with_target(TargetSpec::any()),
    );
    let blaze = game.create_object(blaze, P0, ZoneId::Hand(P0)).unwrap();
    game.cast_spell(
        P0,
        blaze,
        CastRequest::new()
            .targeting(TargetRef::Player(P1))
            .with_payment(ccg_rules::costs::CostPayment::new().with_x(3)),
    )
    .unwrap();
    assert!(game.state().players[P0].mana_pool.is_empty());

    game.resolve_top_of_stack().unwrap();
    assert_eq!(game.state().players[P1].life, 17);
}

// =============================================================================
// Activated Abilities
// =============================================================================

fn relic(requires_source: bool) -> Arc<CardDefinition> {
    let mut ability = ActivatedAbility::new(Cost::tap(), gain(DynamicAmount::Fixed(2)));
    ability.requires_source = requires_source;
    Arc::new(CardDefinition::new(
        CardId::new(5),
        Characteristics::new("Relic")
            .with_type(CardType::Artifact)
            .with_ability(Ability::Activated(ability)),
    ))
}

/// Test that an ability resolves after its source has left, unless it
/// needs the source.
#[test]
fn test_ability_independent_of_source() {
    for (requires_source, life) in [(false, 22), (true, 20)] {
        let mut game = started();
        let relic = game.create_object(relic(requires_source), P0, ZoneId::Battlefield).unwrap();

        game.activate_ability(P0, relic, 0, CastRequest::new()).unwrap();
        assert!(game.state().object(relic).unwrap().tapped);
        assert_eq!(game.state().stack.len(), 1);

        game.move_object(ZoneMove::new(relic, ZoneKind::Graveyard)).unwrap();
        game.resolve_top_of_stack().unwrap();
        assert_eq!(game.state().players[P0].life, life);
    }
}

/// Test that a tapped source cannot pay its tap cost again.
#[test]
fn test_tap_cost_only_once() {
    let mut game = started();
    let relic = game.create_object(relic(false), P0, ZoneId::Battlefield).unwrap();
    game.activate_ability(P0, relic, 0, CastRequest::new()).unwrap();

    let err = game.activate_ability(P0, relic, 0, CastRequest::new()).unwrap_err();
    assert!(matches!(err, RulesError::UnpayableCost(_)));
    assert_eq!(game.state().stack.len(), 1);
}

/// Test that a mana ability resolves at once without using the stack.
#[test]
fn test_mana_ability_skips_the_stack() {
    let mut game = started();
    let land = Arc::new(CardDefinition::new(
        CardId::new(6),
        Characteristics::new("Mountain")
            .with_type(CardType::Land)
            .with_ability(Ability::Activated(ActivatedAbility::mana(
                Cost::tap(),
                Effect::simple(Action::AddMana {
                    player: PlayerRef::You,
                    mana: ManaType::Colored(Color::Red),
                    amount: DynamicAmount::Fixed(1),
                }),
            ))),
    ));
    let land = game.create_object(land, P0, ZoneId::Battlefield).unwrap();
    let shock = game.create_object(shock(), P0, ZoneId::Hand(P0)).unwrap();

    game.activate_ability(P0, land, 0, CastRequest::new()).unwrap();
    assert!(game.state().stack.is_empty());
    assert_eq!(game.state().players[P0].mana_pool.total(), 1);

    game.cast_spell(P0, shock, CastRequest::new().targeting(TargetRef::Player(P1)))
        .unwrap();
    assert_eq!(game.state().stack.len(), 1);
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    /// However many spells are stacked up, each resolution removes the
    /// most recent one.
    #[test]
    fn prop_stack_is_lifo(count in 1usize..6) {
        let mut game = started();
        let mut pushed: Vec<StackEntryId> = Vec::new();
        for _ in 0..count {
            let spell = instant("Healing Salve", None, SpellAbility::new(gain(DynamicAmount::Fixed(1))));
            let card = game.create_object(spell, P0, ZoneId::Hand(P0)).unwrap();
            game.cast_spell(P0, card, CastRequest::new()).unwrap();
            pushed.push(game.state().stack.top().unwrap().id);
        }

        while let Some(expected) = pushed.pop() {
            prop_assert_eq!(game.state().stack.top().map(|e| e.id), Some(expected));
            game.resolve_top_of_stack().unwrap();
            let remaining: Vec<StackEntryId> = game.state().stack.iter().map(|e| e.id).collect();
            prop_assert_eq!(&remaining, &pushed);
        }
        prop_assert_eq!(game.state().players[P0].life, 20 + count as i64);
    }
}

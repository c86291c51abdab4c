//! Zone change integration tests.
//!
//! These tests verify replacement effects on zone changes, object identity
//! across zones, tokens, state-based actions seen through the game, and
//! snapshots.

use std::sync::Arc;

use ccg_rules::abilities::{Ability, ReplacementAction, ReplacementSpec};
use ccg_rules::cards::{CardDefinition, CardId, CardType, Characteristics, CounterKind, SpellAbility, Supertype};
use ccg_rules::core::{EngineConfig, GameState, ObjectId, PlayerId};
use ccg_rules::effects::{Action, DynamicAmount, Effect, ObjectFilter, PlayerRef};
use ccg_rules::layers::{Affected, Duration, Modification};
use ccg_rules::rules::{CastRequest, ChoiceReason, DecisionRequest, DecisionResponse, Game, GameResult, Progress, Step};
use ccg_rules::zones::{ZoneId, ZoneKind, ZoneMove};
use ccg_rules::RulesError;

const P0: PlayerId = PlayerId(0);
const P1: PlayerId = PlayerId(1);

fn started() -> Game {
    let mut game = Game::new(EngineConfig::new(2).with_skip_first_draw(true));
    game.start().unwrap();
    game
}

fn definition(chars: Characteristics) -> Arc<CardDefinition> {
    Arc::new(CardDefinition::new(CardId::new(1), chars))
}

fn bears() -> Arc<CardDefinition> {
    definition(Characteristics::creature("Bears", 2, 2))
}

fn replacement_enchantment(name: &str, spec: ReplacementSpec) -> Arc<CardDefinition> {
    definition(
        Characteristics::new(name)
            .with_type(CardType::Enchantment)
            .with_ability(Ability::Replacement(spec)),
    )
}

fn to_main_phase(game: &mut Game) {
    while game.state().turn.step != Step::PrecombatMain {
        game.pass_priority(P0).unwrap();
        game.pass_priority(P1).unwrap();
    }
}

// =============================================================================
// Replacement Effects
// =============================================================================

/// Test that a land that enters tapped is tapped when played.
#[test]
fn test_land_enters_tapped() {
    let mut game = started();
    to_main_phase(&mut game);
    let tapland = definition(
        Characteristics::new("Guildgate")
            .with_type(CardType::Land)
            .with_ability(Ability::Replacement(ReplacementSpec::enters_tapped())),
    );
    let card = game.create_object(tapland, P0, ZoneId::Hand(P0)).unwrap();

    game.play_land(P0, card).unwrap();
    let land = game.current_zone_contents(ZoneId::Battlefield)[0];
    assert!(game.state().object(land).unwrap().tapped);

    let second = game
        .create_object(definition(Characteristics::new("Forest").with_type(CardType::Land)), P0, ZoneId::Hand(P0))
        .unwrap();
    let err = game.play_land(P0, second).unwrap_err();
    assert!(matches!(err, RulesError::InvalidAction(_)));
}

/// Test that a creature entering with counters survives as a 0/0.
#[test]
fn test_enters_with_counters() {
    let mut game = started();
    let hydra = definition(
        Characteristics::creature("Hydra", 0, 0).with_ability(Ability::Replacement(
            ReplacementSpec::enters_with_counters(CounterKind::PlusOnePlusOne, 2),
        )),
    );
    let card = game.create_object(hydra, P0, ZoneId::Hand(P0)).unwrap();
    game.move_object(ZoneMove::new(card, ZoneKind::Battlefield)).unwrap();

    let hydra = game.current_zone_contents(ZoneId::Battlefield)[0];
    assert_eq!(game.state().object(hydra).unwrap().counters.get(&CounterKind::PlusOnePlusOne), 2);
    let chars = game.effective_characteristics(hydra).unwrap();
    assert_eq!((chars.power, chars.toughness), (Some(2), Some(2)));
}

/// Test that a creature that would die is exiled instead.
#[test]
fn test_exile_instead_of_dying() {
    let mut game = started();
    game.create_object(
        replacement_enchantment("Rest in Peace", ReplacementSpec::exile_instead_of_dying(ObjectFilter::creature())),
        P0,
        ZoneId::Battlefield,
    )
    .unwrap();
    let bears = game.create_object(bears(), P1, ZoneId::Battlefield).unwrap();

    game.state_mut().object_mut(bears).unwrap().damage = 3;
    game.pass_priority(P0).unwrap();
    game.pass_priority(P1).unwrap();

    assert!(game.current_zone_contents(ZoneId::Graveyard(P1)).is_empty());
    assert_eq!(game.current_zone_contents(ZoneId::Exile).len(), 1);
}

/// Test that the affected player chooses between competing replacements.
#[test]
fn test_competing_replacements_ask_controller() {
    let mut game = started();
    game.create_object(
        replacement_enchantment("Rest in Peace", ReplacementSpec::exile_instead_of_dying(ObjectFilter::creature())),
        P0,
        ZoneId::Battlefield,
    )
    .unwrap();
    game.create_object(
        replacement_enchantment(
            "Homing",
            ReplacementSpec {
                affected: ObjectFilter::creature(),
                from: Some(ZoneKind::Battlefield),
                to: Some(ZoneKind::Graveyard),
                action: ReplacementAction::ChangeDestination(ZoneKind::Hand),
            },
        ),
        P0,
        ZoneId::Battlefield,
    )
    .unwrap();
    let bears = game.create_object(bears(), P1, ZoneId::Battlefield).unwrap();

    let progress = game.move_object(ZoneMove::new(bears, ZoneKind::Graveyard)).unwrap();
    match progress {
        Progress::Decision(DecisionRequest::ChooseReplacement { player, object, options }) => {
            assert_eq!(player, P1);
            assert_eq!(object, bears);
            assert_eq!(options, 2);
        }
        other => panic!("expected a replacement choice, got {other:?}"),
    }
    assert!(game.state().object(bears).is_some());

    let err = game.submit_decision(P1, DecisionResponse::Index(2)).unwrap_err();
    assert!(matches!(err, RulesError::InvalidAction(_)));

    game.submit_decision(P1, DecisionResponse::Index(1)).unwrap();
    assert_eq!(game.current_zone_contents(ZoneId::Hand(P1)).len(), 1);
    assert!(game.current_zone_contents(ZoneId::Exile).is_empty());
}

/// Test that a clone entering asks what to copy and becomes a copy of it.
#[test]
fn test_enters_as_copy() {
    let mut game = started();
    let giant = game
        .create_object(definition(Characteristics::creature("Hill Giant", 3, 3)), P1, ZoneId::Battlefield)
        .unwrap();
    let clone = definition(
        Characteristics::creature("Clone", 0, 0)
            .with_ability(Ability::Replacement(ReplacementSpec::enters_as_copy_of(ObjectFilter::creature()))),
    );
    let card = game.create_object(clone, P0, ZoneId::Hand(P0)).unwrap();

    let progress = game.move_object(ZoneMove::new(card, ZoneKind::Battlefield)).unwrap();
    match progress {
        Progress::Decision(DecisionRequest::ChooseObjects { player, candidates, reason, .. }) => {
            assert_eq!(player, P0);
            assert_eq!(candidates, vec![giant]);
            assert_eq!(reason, ChoiceReason::CopyTarget);
        }
        other => panic!("expected a copy choice, got {other:?}"),
    }

    game.submit_decision(P0, DecisionResponse::Objects(vec![giant])).unwrap();
    let copy = game
        .current_zone_contents(ZoneId::Battlefield)
        .into_iter()
        .find(|&id| id != giant)
        .unwrap();
    let chars = game.effective_characteristics(copy).unwrap();
    assert_eq!(chars.name, "Hill Giant");
    assert_eq!(chars.power, Some(3));
    assert_eq!(game.state().object(copy).unwrap().controller, P0);
}

// =============================================================================
// Identity
// =============================================================================

/// Test that an object changing zones becomes a new object.
#[test]
fn test_zone_change_creates_new_identity() {
    let mut game = started();
    let card = game.create_object(bears(), P0, ZoneId::Hand(P0)).unwrap();
    game.move_object(ZoneMove::new(card, ZoneKind::Battlefield)).unwrap();

    assert!(game.state().object(card).is_none());
    let permanent = game.state().new_identity_of(card).unwrap();
    assert_ne!(permanent, card);
    assert_eq!(game.state().object(permanent).unwrap().zone, ZoneId::Battlefield);
    assert_eq!(game.state().last_known(card).unwrap().object.zone, ZoneId::Hand(P0));
}

/// Test that a creature exiled and returned comes back without its
/// counters, damage, tapped state or the effects locked to its old self.
#[test]
fn test_flicker_resets_the_object() {
    let mut game = started();
    let bears = game.create_object(bears(), P0, ZoneId::Battlefield).unwrap();
    {
        let object = game.state_mut().object_mut(bears).unwrap();
        object.counters.add(CounterKind::PlusOnePlusOne, 1);
        object.damage = 1;
        object.tapped = true;
    }
    game.state_mut().add_continuous_effect(
        None,
        P0,
        Affected::Objects(vec![bears]),
        vec![Modification::pump(2, 2)],
        Duration::Permanent,
    );
    assert_eq!(game.effective_characteristics(bears).unwrap().power, Some(5));

    game.move_object(ZoneMove::new(bears, ZoneKind::Exile)).unwrap();
    let exiled = game.state().new_identity_of(bears).unwrap();
    game.move_object(ZoneMove::new(exiled, ZoneKind::Battlefield)).unwrap();
    let returned = game.state().new_identity_of(exiled).unwrap();

    let object = game.state().object(returned).unwrap();
    assert_eq!(object.zone, ZoneId::Battlefield);
    assert_eq!(object.counters.get(&CounterKind::PlusOnePlusOne), 0);
    assert_eq!(object.damage, 0);
    assert!(!object.tapped);
    let chars = game.effective_characteristics(returned).unwrap();
    assert_eq!((chars.power, chars.toughness), (Some(2), Some(2)));
}

/// Test that a card always goes to its owner's zones, whoever controls it.
#[test]
fn test_stolen_creature_goes_to_owners_graveyard() {
    let mut game = started();
    let bears = game.create_object(bears(), P1, ZoneId::Battlefield).unwrap();
    game.state_mut().add_continuous_effect(
        None,
        P0,
        Affected::Objects(vec![bears]),
        vec![Modification::GainControl],
        Duration::Permanent,
    );
    let table = game.state().characteristics().unwrap();
    assert_eq!(table.controller(bears), Some(P0));

    game.move_object(ZoneMove::new(bears, ZoneKind::Graveyard)).unwrap();
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P1)).len(), 1);
    assert!(game.current_zone_contents(ZoneId::Graveyard(P0)).is_empty());
}

// =============================================================================
// Tokens
// =============================================================================

/// Test that tokens are created on the battlefield and cease to exist when
/// they leave it.
#[test]
fn test_tokens() {
    let mut game = started();
    let soldier = definition(Characteristics::creature("Soldier", 1, 1));
    let alarm = Arc::new(
        CardDefinition::new(CardId::new(3), Characteristics::new("Raise the Alarm").with_type(CardType::Instant))
            .with_spell(SpellAbility::new(Effect::simple(Action::CreateTokens {
                token: soldier,
                amount: DynamicAmount::Fixed(2),
                controller: PlayerRef::You,
                tapped: false,
            }))),
    );
    let alarm = game.create_object(alarm, P0, ZoneId::Hand(P0)).unwrap();
    game.cast_spell(P0, alarm, CastRequest::new()).unwrap();
    game.resolve_top_of_stack().unwrap();

    let tokens = game.current_zone_contents(ZoneId::Battlefield);
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|&id| game.state().object(id).unwrap().is_token));

    game.move_object(ZoneMove::new(tokens[0], ZoneKind::Graveyard)).unwrap();
    assert_eq!(game.current_zone_contents(ZoneId::Battlefield).len(), 1);
    // Only the spell itself.
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P0)).len(), 1);
}

// =============================================================================
// State-Based Actions
// =============================================================================

/// Test that a creature shrunk to 0 toughness dies when a player would next
/// get priority.
#[test]
fn test_zero_toughness_dies() {
    let mut game = started();
    let bears = game.create_object(bears(), P0, ZoneId::Battlefield).unwrap();
    game.state_mut().add_continuous_effect(
        None,
        P1,
        Affected::Objects(vec![bears]),
        vec![Modification::pump(-2, -2)],
        Duration::EndOfTurn,
    );
    game.pass_priority(P0).unwrap();
    game.pass_priority(P1).unwrap();

    assert!(game.state().object(bears).is_none());
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P0)).len(), 1);
}

/// Test the legend rule through the game: the controller keeps one.
#[test]
fn test_legend_rule() {
    let mut game = started();
    let legend = || {
        definition(Characteristics::creature("Isamaru", 2, 2).with_supertype(Supertype::Legendary))
    };
    let first = game.create_object(legend(), P0, ZoneId::Battlefield).unwrap();
    let card = game.create_object(legend(), P0, ZoneId::Hand(P0)).unwrap();

    let progress = game.move_object(ZoneMove::new(card, ZoneKind::Battlefield)).unwrap();
    let candidates = match progress {
        Progress::Decision(DecisionRequest::ChooseObjects { player, candidates, reason, min, max }) => {
            assert_eq!(player, P0);
            assert_eq!(reason, ChoiceReason::LegendRule);
            assert_eq!((min, max), (1, 1));
            candidates
        }
        other => panic!("expected a legend rule choice, got {other:?}"),
    };
    assert_eq!(candidates.len(), 2);
    assert!(candidates.contains(&first));

    game.submit_decision(P0, DecisionResponse::Objects(vec![first])).unwrap();
    assert_eq!(game.current_zone_contents(ZoneId::Battlefield), vec![first]);
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P0)).len(), 1);
}

/// Test that a player at 0 life loses and the game reports the winner.
#[test]
fn test_player_at_zero_life_loses() {
    let mut game = started();
    game.state_mut().players[P1].life = 0;
    game.pass_priority(P0).unwrap();
    let progress = game.pass_priority(P1).unwrap();

    assert_eq!(progress, Progress::GameOver(GameResult::Winner(P0)));
    assert!(game.state().players[P1].lost);
    let err = game.pass_priority(P0).unwrap_err();
    assert!(matches!(err, RulesError::InvalidAction(_)));
}

/// Test that a player who drew from an empty library loses.
#[test]
fn test_drawing_from_empty_library_loses() {
    let mut game = Game::new(EngineConfig::new(2).with_skip_first_draw(false));
    let progress = game.start().unwrap();
    assert_eq!(progress, Progress::Priority(P0));
    game.pass_priority(P0).unwrap();
    let progress = game.pass_priority(P1).unwrap();

    assert_eq!(progress, Progress::GameOver(GameResult::Winner(P1)));
}

// =============================================================================
// Snapshots
// =============================================================================

/// Test that a restored snapshot continues exactly like the original.
#[test]
fn test_snapshot_round_trip() {
    let mut game = started();
    let bear = game.create_object(bears(), P0, ZoneId::Battlefield).unwrap();
    for _ in 0..3 {
        game.create_object(bears(), P1, ZoneId::Library(P1)).unwrap();
    }
    game.state_mut().add_continuous_effect(
        None,
        P0,
        Affected::Objects(vec![bear]),
        vec![Modification::pump(1, 1)],
        Duration::EndOfTurn,
    );

    let bytes = game.state().snapshot().unwrap();
    let restored = GameState::restore(&bytes).unwrap();
    assert_eq!(restored.snapshot().unwrap(), bytes);

    let mut copy = Game::from_state(restored);
    assert_eq!(copy.effective_characteristics(bear).unwrap().power, Some(3));
    for player in [P0, P1, P0, P1] {
        game.pass_priority(player).unwrap();
        copy.pass_priority(player).unwrap();
    }
    assert_eq!(game.state().snapshot().unwrap(), copy.state().snapshot().unwrap());
}

/// Test that a failed action leaves the snapshot byte-identical.
#[test]
fn test_rejected_action_changes_nothing() {
    let mut game = started();
    let card = game.create_object(bears(), P0, ZoneId::Hand(P0)).unwrap();
    let before = game.state().snapshot().unwrap();

    assert!(game.play_land(P0, card).is_err());
    assert!(game.cast_spell(P0, card, CastRequest::new()).is_err());
    assert!(game.pass_priority(P1).is_err());
    assert!(game.move_object(ZoneMove::new(ObjectId(999), ZoneKind::Exile)).is_err());

    assert_eq!(game.state().snapshot().unwrap(), before);
}

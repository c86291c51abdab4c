//! Cost payment integration tests.
//!
//! Costs are paid all or nothing: a payment that fails for any component
//! must leave the state exactly as it was.

use std::sync::Arc;

use proptest::prelude::*;

use ccg_rules::cards::{CardDefinition, CardId, CardType, Characteristics, Color, CounterKind};
use ccg_rules::core::{EngineConfig, GameState, ObjectId, PlayerId};
use ccg_rules::costs::{Cost, CostComponent, CostPayment, CostPaymentEngine, ManaCost, ManaType};
use ccg_rules::effects::ObjectFilter;
use ccg_rules::rules::Game;
use ccg_rules::zones::ZoneId;
use ccg_rules::{CostError, RulesError};

const P0: PlayerId = PlayerId(0);

fn place(state: &mut GameState, zone: ZoneId, chars: Characteristics) -> ObjectId {
    let definition = Arc::new(CardDefinition::new(CardId::new(1), chars));
    state.place_new(definition, P0, zone).unwrap()
}

fn pool(state: &mut GameState, red: u32, green: u32, colorless: u32) {
    let pool = &mut state.players[P0].mana_pool;
    pool.add(ManaType::Colored(Color::Red), red);
    pool.add(ManaType::Colored(Color::Green), green);
    pool.add(ManaType::Colorless, colorless);
}

fn unpayable(err: RulesError) -> CostError {
    match err {
        RulesError::UnpayableCost(cost) => cost,
        other => panic!("expected an unpayable cost, got {other:?}"),
    }
}

// =============================================================================
// Mana
// =============================================================================

/// Test that generic mana can be paid with any type and colored mana only
/// with its color.
#[test]
fn test_mana_payment() {
    let mut state = GameState::new(EngineConfig::default());
    pool(&mut state, 2, 1, 1);
    let cost = Cost::mana(ManaCost::parse("{2}{R}{G}").unwrap());

    CostPaymentEngine::pay(&cost, P0, None, &CostPayment::new(), &mut state).unwrap();
    assert!(state.players[P0].mana_pool.is_empty());
}

/// Test that a missing color fails even with enough total mana.
#[test]
fn test_missing_color_fails() {
    let mut state = GameState::new(EngineConfig::default());
    pool(&mut state, 4, 0, 0);
    let cost = Cost::mana(ManaCost::parse("{1}{G}").unwrap());

    let err = CostPaymentEngine::pay(&cost, P0, None, &CostPayment::new(), &mut state).unwrap_err();
    assert!(matches!(unpayable(err), CostError::InsufficientMana(_)));
    assert_eq!(state.players[P0].mana_pool.total(), 4);
}

/// Test that an X too large to count is an unpayable cost, not a crash.
#[test]
fn test_huge_x_is_unpayable() {
    let mut state = GameState::new(EngineConfig::default());
    pool(&mut state, 3, 3, 3);
    let cost = Cost::mana(ManaCost::parse("{X}{1}").unwrap());
    let payment = CostPayment::new().with_x(u32::MAX);

    let err = CostPaymentEngine::validate(&cost, P0, None, &payment, &state).unwrap_err();
    assert!(matches!(unpayable(err), CostError::InsufficientMana(_)));
    assert!(CostPaymentEngine::pay(&cost, P0, None, &payment, &mut state).is_err());
    assert_eq!(state.players[P0].mana_pool.total(), 9);
    assert!(ManaCost::parse("{4294967295}{1}").is_none());
}

// =============================================================================
// Objects
// =============================================================================

/// Test that "tap two untapped Elves you control" cannot be paid with one
/// Elf, and can once a second untapped Elf arrives.
#[test]
fn test_tap_two_untapped_elves() {
    let mut state = GameState::new(EngineConfig::default());
    let elf = || Characteristics::creature("Elf", 1, 1).with_subtype("Elf");
    place(&mut state, ZoneId::Battlefield, elf());
    place(&mut state, ZoneId::Battlefield, Characteristics::creature("Bears", 2, 2));
    let cost = Cost::free().and(CostComponent::TapMatching {
        filter: ObjectFilter::subtype("Elf"),
        count: 2,
    });
    assert!(!CostPaymentEngine::can_pay(&cost, P0, None, &state));

    let tapped = place(&mut state, ZoneId::Battlefield, elf());
    state.object_mut(tapped).unwrap().tapped = true;
    assert!(!CostPaymentEngine::can_pay(&cost, P0, None, &state));

    place(&mut state, ZoneId::Battlefield, elf());
    assert!(CostPaymentEngine::can_pay(&cost, P0, None, &state));
}

/// Test that a sacrifice is not made when the mana part of the cost fails.
#[test]
fn test_failed_mana_keeps_sacrifice() {
    let mut state = GameState::new(EngineConfig::default());
    let bears = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Bears", 2, 2));
    let cost = Cost::mana(ManaCost::parse("{R}").unwrap()).and(CostComponent::SacrificeMatching {
        filter: ObjectFilter::creature(),
        count: 1,
    });
    let before = state.snapshot().unwrap();

    let payment = CostPayment::new().sacrificing([bears]);
    assert!(CostPaymentEngine::pay(&cost, P0, None, &payment, &mut state).is_err());
    assert_eq!(state.snapshot().unwrap(), before);
    assert!(state.object(bears).is_some());

    pool(&mut state, 1, 0, 0);
    CostPaymentEngine::pay(&cost, P0, None, &payment, &mut state).unwrap();
    assert!(state.object(bears).is_none());
    assert_eq!(state.zone_contents(ZoneId::Graveyard(P0)).len(), 1);
}

/// Test that automatic payments pick the lowest ids and skip the source.
#[test]
fn test_auto_payment() {
    let mut state = GameState::new(EngineConfig::default());
    let altar = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Altar", 0, 4));
    let first = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Bears", 2, 2));
    let second = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Bears", 2, 2));
    let cost = Cost::free().and(CostComponent::SacrificeMatching {
        filter: ObjectFilter::creature(),
        count: 2,
    });

    let payment = CostPaymentEngine::auto_payment(&cost, P0, Some(altar), 0, &state).unwrap();
    assert_eq!(payment.sacrificed, vec![altar, first]);

    let cost = cost.and(CostComponent::SacrificeSelf);
    let payment = CostPaymentEngine::auto_payment(&cost, P0, Some(altar), 0, &state).unwrap();
    assert_eq!(payment.sacrificed, vec![first, second]);

    let cost = cost.and(CostComponent::SacrificeMatching {
        filter: ObjectFilter::creature(),
        count: 1,
    });
    assert!(CostPaymentEngine::auto_payment(&cost, P0, Some(altar), 0, &state).is_none());
    assert!(!CostPaymentEngine::can_pay(&cost, P0, Some(altar), &state));
}

/// Test that the same object cannot pay for two parts of a cost.
#[test]
fn test_duplicate_choice_rejected() {
    let mut state = GameState::new(EngineConfig::default());
    let bears = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Bears", 2, 2));
    let cost = Cost::free()
        .and(CostComponent::SacrificeMatching {
            filter: ObjectFilter::creature(),
            count: 1,
        })
        .and(CostComponent::SacrificeMatching {
            filter: ObjectFilter::Any,
            count: 1,
        });

    let payment = CostPayment::new().sacrificing([bears, bears]);
    let err = CostPaymentEngine::pay(&cost, P0, None, &payment, &mut state).unwrap_err();
    assert!(matches!(unpayable(err), CostError::DuplicateChoice(id) if id == bears));
}

/// Test that a discard cost only accepts cards from the payer's hand.
#[test]
fn test_discard_cost() {
    let mut state = GameState::new(EngineConfig::default());
    let in_hand = place(&mut state, ZoneId::Hand(P0), Characteristics::new("Card").with_type(CardType::Sorcery));
    let on_field = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Bears", 2, 2));
    let cost = Cost::free().and(CostComponent::Discard {
        filter: ObjectFilter::Any,
        count: 1,
    });

    let err = CostPaymentEngine::validate(&cost, P0, None, &CostPayment::new().discarding([on_field]), &state)
        .unwrap_err();
    assert!(matches!(unpayable(err), CostError::InvalidChoice(_)));

    let mut game = Game::from_state(state);
    game.pay_cost(P0, &cost, None, &CostPayment::new().discarding([in_hand]))
        .unwrap();
    assert!(game.current_zone_contents(ZoneId::Hand(P0)).is_empty());
    assert_eq!(game.current_zone_contents(ZoneId::Graveyard(P0)).len(), 1);
}

/// Test life and counter costs.
#[test]
fn test_life_and_counter_costs() {
    let mut state = GameState::new(EngineConfig::default());
    let walker = place(
        &mut state,
        ZoneId::Battlefield,
        Characteristics::new("Planeswalker").with_type(CardType::Planeswalker),
    );
    state.object_mut(walker).unwrap().counters.add(CounterKind::Loyalty, 3);

    let cost = Cost::free()
        .and(CostComponent::PayLife(2))
        .and(CostComponent::RemoveCounters {
            kind: CounterKind::Loyalty,
            count: 2,
        });
    CostPaymentEngine::pay(&cost, P0, Some(walker), &CostPayment::new(), &mut state).unwrap();
    assert_eq!(state.players[P0].life, 18);
    assert_eq!(state.object(walker).unwrap().counters.get(&CounterKind::Loyalty), 1);

    let err = CostPaymentEngine::pay(&cost, P0, Some(walker), &CostPayment::new(), &mut state).unwrap_err();
    assert!(matches!(unpayable(err), CostError::NotEnoughCounters { .. }));
    assert_eq!(state.players[P0].life, 18);

    let cost = Cost::free().and(CostComponent::PayLife(30));
    let err = CostPaymentEngine::pay(&cost, P0, None, &CostPayment::new(), &mut state).unwrap_err();
    assert!(matches!(unpayable(err), CostError::InsufficientLife { needed: 30, available: 18 }));
}

/// Test that a tap cost cannot be paid by a summoning-sick creature.
#[test]
fn test_summoning_sick_creature_cannot_tap() {
    let mut state = GameState::new(EngineConfig::default());
    let elf = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Elf", 1, 1));
    state.object_mut(elf).unwrap().summoning_sick = true;

    let err = CostPaymentEngine::pay(&Cost::tap(), P0, Some(elf), &CostPayment::new(), &mut state).unwrap_err();
    assert!(matches!(unpayable(err), CostError::SummoningSick(_)));
    assert!(!state.object(elf).unwrap().tapped);

    state.object_mut(elf).unwrap().summoning_sick = false;
    CostPaymentEngine::pay(&Cost::tap(), P0, Some(elf), &CostPayment::new(), &mut state).unwrap();
    assert!(state.object(elf).unwrap().tapped);
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    /// Paying either succeeds and spends exactly the cost, or fails and
    /// leaves the state byte-identical.
    #[test]
    fn prop_payment_is_atomic(
        red in 0u32..4,
        green in 0u32..4,
        colorless in 0u32..4,
        x in 0u32..3,
        with_sacrifice in any::<bool>(),
    ) {
        let mut state = GameState::new(EngineConfig::default());
        pool(&mut state, red, green, colorless);
        let bears = place(&mut state, ZoneId::Battlefield, Characteristics::creature("Bears", 2, 2));
        let mut cost = Cost::mana(ManaCost::parse("{X}{1}{R}{G}").unwrap());
        let mut payment = CostPayment::new().with_x(x);
        if with_sacrifice {
            cost = cost.and(CostComponent::SacrificeMatching { filter: ObjectFilter::creature(), count: 1 });
            payment = payment.sacrificing([bears]);
        }
        let before = state.snapshot().unwrap();
        let total = red + green + colorless;

        let affordable = red >= 1 && green >= 1 && total >= 3 + x;
        match CostPaymentEngine::pay(&cost, P0, None, &payment, &mut state) {
            Ok(()) => {
                prop_assert!(affordable);
                prop_assert_eq!(state.players[P0].mana_pool.total(), total - 3 - x);
                prop_assert_eq!(state.object(bears).is_none(), with_sacrifice);
            }
            Err(_) => {
                prop_assert!(!affordable);
                prop_assert_eq!(state.snapshot().unwrap(), before);
            }
        }
    }

    /// Repeated life and counter components are checked against their sum:
    /// an unaffordable total fails cleanly and changes nothing.
    #[test]
    fn prop_repeated_components_are_summed(
        life in 1i64..10,
        payments in prop::collection::vec(0i64..5, 1..4),
        charge in 0u32..5,
        removals in prop::collection::vec(0u32..3, 1..4),
    ) {
        let mut state = GameState::new(EngineConfig::default());
        state.players[P0].life = life;
        let relic = place(&mut state, ZoneId::Battlefield, Characteristics::new("Relic").with_type(CardType::Artifact));
        state.object_mut(relic).unwrap().counters.add(CounterKind::Charge, charge);

        let mut cost = Cost::free();
        for &amount in &payments {
            cost = cost.and(CostComponent::PayLife(amount));
        }
        for &count in &removals {
            cost = cost.and(CostComponent::RemoveCounters { kind: CounterKind::Charge, count });
        }
        let before = state.snapshot().unwrap();
        let life_total: i64 = payments.iter().sum();
        let counter_total: u32 = removals.iter().sum();

        let affordable = life_total <= life && counter_total <= charge;
        prop_assert_eq!(CostPaymentEngine::can_pay(&cost, P0, Some(relic), &state), affordable);
        match CostPaymentEngine::pay(&cost, P0, Some(relic), &CostPayment::new(), &mut state) {
            Ok(()) => {
                prop_assert!(affordable);
                prop_assert_eq!(state.players[P0].life, life - life_total);
                prop_assert_eq!(state.object(relic).unwrap().counters.get(&CounterKind::Charge), charge - counter_total);
            }
            Err(err) => {
                prop_assert!(!affordable);
                prop_assert!(matches!(err, RulesError::UnpayableCost(_)));
                prop_assert_eq!(state.snapshot().unwrap(), before);
            }
        }
    }
}

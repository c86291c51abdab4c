//! Benchmark for effective characteristics under many continuous effects

use std::sync::Arc;

use ccg_rules::abilities::{Ability, StaticAbility};
use ccg_rules::cards::{CardDefinition, CardId, CardRegistry, CardType, Characteristics};
use ccg_rules::core::{EngineConfig, GameState, ObjectId, PlayerId};
use ccg_rules::effects::ObjectFilter;
use ccg_rules::layers::{Affected, Duration, LayerSystem, Modification};
use ccg_rules::zones::ZoneId;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A board of `creatures` creatures per player, two anthems each and one
/// pump effect per creature.
fn catalog() -> CardRegistry {
    let mut registry = CardRegistry::new();
    registry
        .register(CardDefinition::new(
            CardId::new(1),
            Characteristics::new("Anthem")
                .with_type(CardType::Enchantment)
                .with_ability(Ability::Static(StaticAbility::new(
                    ObjectFilter::creature_you_control(),
                    vec![Modification::pump(1, 1)],
                ))),
        ))
        .unwrap();
    registry
        .register(CardDefinition::new(CardId::new(2), Characteristics::creature("Bears", 2, 2)))
        .unwrap();
    registry
}

fn board(creatures: usize) -> (GameState, ObjectId) {
    let catalog = catalog();
    let mut state = GameState::new(EngineConfig::new(2));
    let anthem = catalog.find_by_name("Anthem").unwrap();
    let bears = catalog.get(CardId::new(2)).unwrap();

    let mut first = None;
    for player in PlayerId::all(2) {
        for _ in 0..2 {
            state.place_new(Arc::clone(&anthem), player, ZoneId::Battlefield).unwrap();
        }
        for _ in 0..creatures {
            let id = state.place_new(Arc::clone(&bears), player, ZoneId::Battlefield).unwrap();
            state.add_continuous_effect(
                None,
                player,
                Affected::Objects(vec![id]),
                vec![Modification::pump(1, 0)],
                Duration::EndOfTurn,
            );
            first.get_or_insert(id);
        }
    }
    (state, first.unwrap())
}

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("layers");
    for creatures in [4, 16, 64] {
        let (state, _) = board(creatures);
        group.bench_with_input(BenchmarkId::new("compute", creatures), &state, |b, state| {
            b.iter(|| LayerSystem::compute(black_box(state)).unwrap())
        });
    }
    group.finish();
}

fn bench_effective_characteristics(c: &mut Criterion) {
    let (state, object) = board(16);
    c.bench_function("effective_characteristics", |b| {
        b.iter(|| LayerSystem::effective_characteristics(black_box(&state), black_box(object)).unwrap())
    });
}

criterion_group!(benches, bench_compute, bench_effective_characteristics);
criterion_main!(benches);

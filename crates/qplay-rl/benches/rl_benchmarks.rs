//! RL Hot-Path Benchmarks
//!
//! Benchmarks for the per-tick decision and learning path:
//! - State encoding
//! - Greedy action selection over a populated table
//! - The Bellman update
//!
//! ## Performance Targets
//! - Encoding: < 10ns per observation
//! - Selection: < 200ns per decision
//! - Update: < 200ns per transition

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use qplay_core::Observation;
use qplay_rl::{EpsilonGreedy, LearningRule, QLearning, StateEncoder, Transition, ValueStore};

fn populated_store(states: u32, rng: &mut StdRng) -> ValueStore {
    let mut store = ValueStore::new(6);
    for state in 0..states {
        for action in 0..6 {
            store
                .update(state, action, rng.gen_range(-100.0..100.0))
                .expect("action in range");
        }
    }
    store
}

fn bench_encoding(c: &mut Criterion) {
    let encoder = StateEncoder::default();
    let obs = Observation {
        scroll_x: 173,
        scroll_page: 4,
        score: 1200,
        dead: false,
    };

    c.bench_function("encoder/encode", |b| {
        b.iter(|| encoder.encode(black_box(&obs)));
    });
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy/choose");
    let mut rng = StdRng::seed_from_u64(1);

    for states in [100u32, 1_000, 10_000] {
        let mut store = populated_store(states, &mut rng);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("greedy", states), &states, |b, &states| {
            let mut state = 0;
            b.iter(|| {
                state = (state + 7) % states;
                EpsilonGreedy.choose(&mut store, black_box(state), 0.0, &mut rng)
            });
        });
    }
    group.finish();
}

fn bench_learning(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let mut store = populated_store(1_000, &mut rng);
    let learner = QLearning::default();

    c.bench_function("q_learning/learn", |b| {
        let mut state = 0u32;
        b.iter(|| {
            state = (state + 1) % 999;
            let transition = Transition::new(state, (state % 6) as usize, 15.0, state + 1);
            learner.learn(&mut store, black_box(&transition))
        });
    });
}

criterion_group!(benches, bench_encoding, bench_selection, bench_learning);
criterion_main!(benches);

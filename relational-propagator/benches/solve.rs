//! Benchmarks for end-to-end solving.
//!
//! Measures the three costs that dominate real goals: conjunction
//! with constraint replay, bijection propagation through a
//! decomposition, and wide fair disjunction.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relational_propagator::all;
use relational_propagator::distinct;
use relational_propagator::solve;
use relational_propagator::solve_vars;
use relational_propagator::State;
use relational_propagator::Variable;

/// Enumerates every permutation of four values: a conjunction of
/// membership goals with a `distinct` constraint replayed after each
/// binding.
fn bench_distinct_permutations(c: &mut Criterion) {
    c.bench_function("permutations_of_four", |b| {
        b.iter(|| {
            let solutions = solve_vars(|variables: &mut Vec<Variable<i32>>| {
                for _ in 0..4 {
                    variables.push(Variable::new());
                }
                let handles: Vec<&Variable<i32>> = variables.iter().collect();
                let domains = all(variables
                    .iter()
                    .map(|slot| slot.one_of(vec![1, 2, 3, 4]))
                    .collect());
                domains.and(distinct(&handles))
            });
            assert_eq!(black_box(solutions.count()), 24);
        });
    });
}

#[derive(Clone, Debug, PartialEq)]
struct Pair {
    left: i64,
    right: i64,
}

/// Binds the two halves of a decomposed pair and reads the
/// reconstructed whole, exercising the propagation closures both
/// ways.
fn bench_pair_reconstruction(c: &mut Criterion) {
    c.bench_function("pair_reconstruction", |b| {
        let pair = Variable::<Pair>::new();
        let (left, right) = pair.bimap2(
            "pair.halves",
            |pair| (pair.left, pair.right),
            |(left, right)| Pair { left, right },
        );

        b.iter(|| {
            let state = State::new()
                .bind(&left, black_box(3))
                .expect("ok")
                .bind(&right, black_box(4))
                .expect("ok");
            assert_eq!(state.value(&pair), Some(Pair { left: 3, right: 4 }));
        });
    });
}

/// Drains a thirty-two way disjunction, dominated by the round-robin
/// interleaving queue.
fn bench_wide_disjunction(c: &mut Criterion) {
    c.bench_function("disjunction_fanout_32", |b| {
        b.iter(|| {
            let solutions = solve(|slot: &Variable<i32>| slot.one_of(1..=32));
            assert_eq!(black_box(solutions.count()), 32);
        });
    });
}

criterion_group!(
    benches,
    bench_distinct_permutations,
    bench_pair_reconstruction,
    bench_wide_disjunction
);
criterion_main!(benches);

// In benches/solver_bench.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use puan_rspy::theory::{AtLeast, Statement, Theory};
use puan_rspy::types::Variable;

/// A three level theory: leaves grouped into conjunctions, pairs of conjunctions
/// joined by a disjunction, and one root requiring all disjunctions.
fn generate_layered_theory(groups: u32) -> Theory {
    let leaf_count = groups * 3;
    let mut statements: Vec<Statement> = (0..leaf_count)
        .map(|id| Statement::leaf(Variable::boolean(id)))
        .collect();

    let mut next = leaf_count;
    let mut conjunctions = Vec::new();
    for g in 0..groups {
        let ids = vec![g * 3, g * 3 + 1, g * 3 + 2];
        statements.push(Statement::compound(Variable::boolean(next), AtLeast::new(ids, -3)));
        conjunctions.push(next);
        next += 1;
    }

    let mut disjunctions = Vec::new();
    for pair in conjunctions.chunks(2) {
        statements.push(Statement::compound(
            Variable::boolean(next),
            AtLeast::new(pair.to_vec(), -1),
        ));
        disjunctions.push(next);
        next += 1;
    }

    let bias = -(disjunctions.len() as i64);
    statements.push(Statement::compound(
        Variable::boolean(next),
        AtLeast::new(disjunctions, bias),
    ));
    Theory::new("bench", statements)
}

fn generate_objectives(leaf_count: u32, count: usize) -> Vec<HashMap<u32, f64>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            (0..leaf_count)
                .map(|id| (id, rng.random_range(-5..=5) as f64))
                .collect()
        })
        .collect()
}

const BENCH_GROUPS: u32 = 8;

fn bench_theory(c: &mut Criterion) {
    let theory = generate_layered_theory(BENCH_GROUPS);
    let objectives = generate_objectives(BENCH_GROUPS * 3, 4);

    let mut group = c.benchmark_group("Theory");

    group.bench_function("Compile (unreduced)", |b| {
        b.iter(|| black_box(theory.to_ge_polyhedron(true, false)))
    });
    group.bench_function("Compile (reduced)", |b| {
        b.iter(|| black_box(theory.to_ge_polyhedron(true, true)))
    });

    group.bench_function("Solve (unreduced)", |b| {
        b.iter(|| black_box(theory.solve(black_box(objectives.clone()), false)))
    });
    group.bench_function("Solve (reduced)", |b| {
        b.iter(|| black_box(theory.solve(black_box(objectives.clone()), true)))
    });

    group.finish();
}

criterion_group!(benches, bench_theory);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use structsvm::{BcfwSolver, ChainOracle, Dataset, StructuredOracle};

// Deterministic pseudo-data; the values only need to be non-degenerate.
fn chain_dataset(num_states: usize, per_unit_dim: usize, seq_len: usize, count: usize) -> Dataset {
    let mut dataset = Dataset::new();
    for i in 0..count {
        let labels: Vec<usize> = (0..seq_len).map(|t| (i + t) % num_states).collect();
        let covariate: Vec<f64> = (0..seq_len * per_unit_dim)
            .map(|k| ((i * 31 + k * 17) % 13) as f64 / 13.0 - 0.5)
            .collect();
        dataset.append(covariate, labels).unwrap();
    }
    dataset
}

fn benchmark_max_oracle_by_states(c: &mut Criterion) {
    let mut group = c.benchmark_group("max_oracle_by_states");

    let seq_len = 10;
    let per_unit_dim = 16;

    for num_states in [2, 4, 8, 16, 26] {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_states),
            &num_states,
            |b, &num_states| {
                let oracle = ChainOracle::new(num_states, per_unit_dim).unwrap();
                let weights: Vec<f64> = (0..oracle.dimensions())
                    .map(|k| ((k % 7) as f64 - 3.0) * 0.1)
                    .collect();
                let dataset = chain_dataset(num_states, per_unit_dim, seq_len, 1);
                let inst = dataset.get(0).unwrap();

                b.iter(|| {
                    let path = oracle
                        .max_oracle(&weights, &inst.covariate, &inst.labels)
                        .unwrap();
                    black_box(path);
                });
            },
        );
    }

    group.finish();
}

fn benchmark_solver_steps(c: &mut Criterion) {
    c.bench_function("bcfw_100_steps", |b| {
        b.iter(|| {
            let oracle = ChainOracle::new(4, 8).unwrap();
            let dataset = chain_dataset(4, 8, 8, 20);
            let mut solver = BcfwSolver::new(oracle, dataset).unwrap().with_seed(1);
            let gap = solver.run_steps(100).unwrap();
            black_box(gap);
        });
    });
}

criterion_group!(benches, benchmark_max_oracle_by_states, benchmark_solver_steps);
criterion_main!(benches);

use simequiv::*;
use simequiv::equivalence::{reduce, Equivalence};

use criterion::{criterion_group, criterion_main, Criterion, BatchSize, BenchmarkId,
                PlotConfiguration, AxisScale};

// Deterministic system with three labels and two outgoing transitions per state
fn generated_lts(n_states: u32) -> TransitionSystem {
    (0..n_states)
        .flat_map(|s| [
            (s, (s * 7 + 3) % n_states, s % 3),
            (s, (s * 13 + 5) % n_states, (s + 1) % 3),
        ])
        .collect()
}

fn simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    group.sample_size(10);

    for n_states in [100, 400, 1600] {
        let lts = generated_lts(n_states);
        group.bench_with_input(BenchmarkId::new("sim", n_states), &lts,
            |b, lts| b.iter_batched(|| lts.clone(),
                |mut lts| {
                    let mut partitioner = SimPartitioner::new(&mut lts);
                    partitioner.run();
                    partitioner.num_classes()
                },
                BatchSize::LargeInput,
            ),
        );
        group.bench_with_input(BenchmarkId::new("ready-sim", n_states), &lts,
            |b, lts| b.iter_batched(|| lts.clone(),
                |mut lts| {
                    let mut partitioner = ReadySimPartitioner::new(&mut lts);
                    partitioner.run();
                    partitioner.num_classes()
                },
                BatchSize::LargeInput,
            ),
        );
        group.bench_with_input(BenchmarkId::new("reduce", n_states), &lts,
            |b, lts| b.iter_batched(|| lts.clone(),
                |mut lts| reduce(&mut lts, Equivalence::Simulation).unwrap(),
                BatchSize::LargeInput,
            ),
        );
    }
    group.finish();
}

criterion_group!(benches, simulation);
criterion_main!(benches);

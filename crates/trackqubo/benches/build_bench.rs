//! Criterion benches for graph construction, pruning and QUBO encoding on
//! synthetic events of increasing size.
//! Results live under `target/criterion`.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use trackqubo::api::{build_graph, draw_event, Config, EventToken, Model, Pruning, SynthCfg};

fn event(n_tracks: usize) -> trackqubo::api::SynthEvent {
    let cfg = SynthCfg {
        n_tracks,
        fake_ratio: 1.0,
        fake_max_dphi: 0.1,
        ..SynthCfg::default()
    };
    draw_event(&cfg, EventToken::new(42))
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[20usize, 100, 400] {
        let ev = event(n);
        let cfg = Config::default();
        group.bench_with_input(BenchmarkId::new("build_graph", n), &ev, |b, ev| {
            b.iter(|| build_graph(&ev.hits, &ev.doublets, &cfg).unwrap())
        });
        for pruning in [Pruning::MaxPath { min_qplet_path: 2 }, Pruning::DisjointSets] {
            let name = match pruning {
                Pruning::MaxPath { .. } => "prune_max_path",
                _ => "prune_disjoint_sets",
            };
            group.bench_with_input(BenchmarkId::new(name, n), &ev, |b, ev| {
                b.iter_batched(
                    || build_graph(&ev.hits, &ev.doublets, &cfg).unwrap().0,
                    |g| pruning.prune(g).unwrap(),
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for preset in ["base", "mp", "d0", "all"] {
        let ev = event(100);
        let model = Model::build(Config::preset(preset).unwrap(), &ev.hits, &ev.doublets).unwrap();
        group.bench_function(BenchmarkId::new("to_qubo", preset), |b| {
            b.iter(|| model.to_qubo().unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_encode);
criterion_main!(benches);

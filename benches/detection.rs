use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use overlap_resolver::{
    run, FeatureInput, FeatureStore, LayerInput, OverlapDetector, OverlapScope, ResolutionPolicy, ResolverConfig,
    RunContext, SpatialIndex,
};

fn grid(id: &str, n: usize, offset: f64) -> LayerInput {
    LayerInput::new(id, "EPSG:2193").features((0..n * n).map(|i| {
        let (x, y) = ((i % n) as f64 * 10.0 + offset, (i / n) as f64 * 10.0 + offset);
        FeatureInput::new(
            i as u64,
            geo::polygon![(x: x, y: y), (x: x + 10.0, y: y), (x: x + 10.0, y: y + 10.0), (x: x, y: y + 10.0)],
            vec![],
        )
    }))
}

fn layers(n: usize) -> Vec<LayerInput> {
    vec![grid("base", n, 0.0), grid("shifted", n, 3.0), grid("fine", n, 7.5)]
}

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection");

    for n in [16usize, 32] {
        let store = FeatureStore::ingest(layers(n)).unwrap();
        let index = SpatialIndex::build(&store);
        group.throughput(Throughput::Elements(store.len() as u64));

        for parallel in [false, true] {
            let config = ResolverConfig {
                parallel_detection: parallel,
                ..ResolverConfig::default()
            };
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, n), &config, |b, config| {
                b.iter(|| {
                    OverlapDetector::new(&store, &index, config)
                        .detect(&RunContext::default())
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let config = ResolverConfig {
        overlap_scope: OverlapScope::AllOverlaps,
        ..ResolverConfig::default()
    };
    let policy = ResolutionPolicy::priority([("fine", 1), ("shifted", 2), ("base", 3)]).unwrap();

    c.bench_function("run/priority_grid_16", |b| {
        b.iter(|| run(config.clone(), policy.clone(), layers(16), &RunContext::default()));
    });
}

criterion_group!(detection, bench_detection, bench_full_run);
criterion_main!(detection);

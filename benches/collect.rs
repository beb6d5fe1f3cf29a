use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pool_stats_exporter::{CollectorOpts, Exporter, PoolConfig, SimulatedPool, StatsCollector};
use std::sync::Arc;

fn bench_collect(c: &mut Criterion) {
    let pool = Arc::new(SimulatedPool::new(PoolConfig::default()));
    pool.acquire().expect("pool has capacity");
    let collector = StatsCollector::new(pool, &CollectorOpts::with_driver("bench"))
        .expect("valid driver name");

    c.bench_function("try_collect", |b| {
        b.iter(|| black_box(collector.try_collect().expect("pool is open")))
    });

    let mut exporter = Exporter::new();
    exporter
        .register_stats(collector.clone())
        .expect("unique metric names");

    c.bench_function("encode_text", |b| {
        b.iter(|| black_box(exporter.encode().expect("pool is open")))
    });
}

criterion_group!(benches, bench_collect);
criterion_main!(benches);

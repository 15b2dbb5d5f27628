use clause_retrieve::fusion::{rrf, RrfConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn ranked_list(n: u32, offset: u32) -> Vec<(u32, f32)> {
    (0..n)
        .map(|i| (i + offset, 1.0 / (i as f32 + 1.0)))
        .collect()
}

fn bench_rrf(c: &mut Criterion) {
    let sparse = ranked_list(1_000, 0);
    let dense = ranked_list(1_000, 500);
    let config = RrfConfig::default();

    c.bench_function("rrf_fuse_1000_each_top10", |b| {
        b.iter(|| rrf(black_box(&sparse), black_box(&dense), black_box(10), config, |id| id))
    });
}

criterion_group!(benches, bench_rrf);
criterion_main!(benches);

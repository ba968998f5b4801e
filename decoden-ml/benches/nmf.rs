use criterion::{black_box, criterion_group, criterion_main, Criterion};
use decoden_ml::{nmf, nmf_fixed, FixedFactor, NmfConfig, NmfInit};

fn random_f64(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

fn bench_nmf(c: &mut Criterion) {
    let mut group = c.benchmark_group("nmf");

    // 10k bins × 4 control replicates, single background component
    let data = random_f64(40_000, 42);
    let config = NmfConfig {
        alpha_w: 0.01,
        alpha_h: 0.001,
        ..NmfConfig::default()
    };
    group.bench_function("10k_x4_rank1", |b| {
        b.iter(|| nmf(black_box(&data), 4, &config))
    });

    let nndsvda = NmfConfig {
        init: NmfInit::Nndsvda,
        ..config.clone()
    };
    group.bench_function("10k_x4_rank1_nndsvda", |b| {
        b.iter(|| nmf(black_box(&data), 4, &nndsvda))
    });

    group.finish();
}

fn bench_nmf_fixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("nmf_fixed");

    // Project 10k bins × 8 samples onto a frozen 3-component mixing matrix
    let data = random_f64(80_000, 7);
    let mixing = random_f64(24, 11);
    let config = NmfConfig {
        n_components: 3,
        max_iter: 500,
        init: NmfInit::Uniform { high: 0.1 },
        ..NmfConfig::default()
    };
    group.bench_function("10k_x8_k3_mixing", |b| {
        b.iter(|| nmf_fixed(black_box(&data), 8, FixedFactor::Mixing(&mixing), None, &config))
    });

    group.finish();
}

criterion_group!(benches, bench_nmf, bench_nmf_fixed);
criterion_main!(benches);

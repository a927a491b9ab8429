use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rlwe_kex::kex::{respond, Initiator, KexContext};
use rlwe_kex::math::{noise_from_seed, sample_uniform_ntt};
use rlwe_kex::params::RingParams;

fn sampling_benchmark(c: &mut Criterion) {
    let params = RingParams::calibrated();
    let seed = [7u8; 34];

    let mut group = c.benchmark_group("sampling");

    group.bench_function("uniform_ntt", |b| {
        b.iter(|| sample_uniform_ntt(&seed, params.ring_dim, params.q).unwrap());
    });

    group.bench_function("cbd_eta3", |b| {
        b.iter(|| noise_from_seed(&seed, &params).unwrap());
    });

    let eta2 = RingParams::new(params.ring_dim, params.q, 2).unwrap();
    group.bench_function("cbd_eta2", |b| {
        b.iter(|| noise_from_seed(&seed, &eta2).unwrap());
    });

    group.finish();
}

fn exchange_benchmark(c: &mut Criterion) {
    let ctx = KexContext::new(RingParams::calibrated()).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(42);

    c.bench_function("full_exchange", |b| {
        b.iter(|| {
            let (initiator, hello) = Initiator::start(&ctx, &mut rng, "bench").unwrap();
            let (reply, _) = respond(&ctx, &mut rng, &hello).unwrap();
            initiator.finish(&ctx, &mut rng, &reply).unwrap()
        });
    });
}

criterion_group!(benches, sampling_benchmark, exchange_benchmark);
criterion_main!(benches);

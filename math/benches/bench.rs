use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pink_math::Uint256;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{RngCore, SeedableRng},
};

const ITERS: usize = 64 * 1024;

fn bench_compact(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    // Realistic exponents (0x1b..=0x1f) with random mantissas
    let bits: Vec<u32> = (0..ITERS).map(|_| ((0x1b + rng.next_u32() % 5) << 24) | (rng.next_u32() & 0x007f_ffff)).collect();
    let targets: Vec<Uint256> = bits.iter().map(|&b| Uint256::from_compact_target_bits(b)).collect();

    let mut group = c.benchmark_group("compact");
    group.bench_function("decode", |b| {
        b.iter(|| {
            for &bits in bits.iter() {
                black_box(Uint256::decode_compact_target_bits(bits));
            }
        });
    });
    group.bench_function("encode", |b| {
        b.iter(|| {
            for &target in targets.iter() {
                black_box(target.compact_target_bits());
            }
        });
    });
    group.bench_function("block proof", |b| {
        b.iter(|| {
            for &target in targets.iter() {
                black_box(target.inverse_plus_one());
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_compact);
criterion_main!(benches);

//! # Crosslock Benchmarks
//!
//! Hot paths of swap creation:
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Hashlock (SHA-256) | < 1µs |
//! | Swap id derivation (keccak / sha256) | < 2µs |
//! | Commitment generation | < 50µs |

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use htlc_swap::adapters::LedgerProfile;
use htlc_swap::algorithms::{derive_swap_id, LedgerClock};
use htlc_swap::{
    create_hashlock, generate_secret, CommitmentGenerator, LedgerKind, LedgerSide, PayoutHash,
    PerLedger, TimelockRequest, MIN_SAFETY_MARGIN_SECS,
};

const NOW: u64 = 1_700_000_000;

fn bench_hashlock(c: &mut Criterion) {
    let secret = generate_secret();
    c.bench_function("hashlock_sha256", |b| {
        b.iter(|| create_hashlock(black_box(&secret), PayoutHash::Sha256))
    });
}

fn bench_swap_id(c: &mut Criterion) {
    let mut group = c.benchmark_group("swap_id");
    let hashlock = [0xAB; 32];
    let evm_initiator = [0x11; 20];
    let near_initiator = [0x22; 32];
    group.bench_function("evm_keccak_packed", |b| {
        b.iter(|| {
            derive_swap_id(
                LedgerKind::Evm,
                black_box(&hashlock),
                black_box(&evm_initiator),
                NOW + 3_600,
            )
        })
    });
    group.bench_function("near_sha256_borsh", |b| {
        b.iter(|| {
            derive_swap_id(
                LedgerKind::Near,
                black_box(&hashlock),
                black_box(&near_initiator),
                NOW + 3_600,
            )
        })
    });
    group.finish();
}

fn bench_commitment(c: &mut Criterion) {
    let generator = CommitmentGenerator::new(PayoutHash::Sha256, MIN_SAFETY_MARGIN_SECS);
    let clocks = PerLedger::new(
        LedgerClock {
            now: NOW,
            bounds: LedgerProfile::evm(LedgerSide::Source).bounds,
        },
        LedgerClock {
            now: NOW,
            bounds: LedgerProfile::near(LedgerSide::Destination).bounds,
        },
    );
    let latencies = PerLedger::new(180, 5);
    let request = TimelockRequest::Relative {
        source_secs: 3 * 3_600,
        destination_secs: 2 * 3_600,
    };
    c.bench_function("commitment_generate", |b| {
        b.iter(|| generator.generate(black_box(request), &clocks, &latencies))
    });
}

criterion_group!(benches, bench_hashlock, bench_swap_id, bench_commitment);
criterion_main!(benches);

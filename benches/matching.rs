//! Benchmarks for index placement and the crossing walk.
//!
//! Run with: `cargo bench`
//!
//! The interesting costs are the O(n) placement scan when no usable hint
//! is given, its O(1)-ish counterpart with a good hint, and a taker
//! sweeping a deep book.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use otcbook::types::price::SCALE;
use otcbook::{Book, Market, MemoryLedger, Offer, Pair, SingleAdmin};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ADMIN: u64 = 1;
const ALICE: u64 = 2;
const BOB: u64 = 3;
const ESCROW: u64 = 99;
const GOLD: u64 = 10;
const USD: u64 = 20;

/// Book with `depth` randomly priced resting offers on one pair
fn seeded_book(depth: usize) -> Book {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut book = Book::with_capacity(depth);
    for i in 0..depth {
        let sell = rng.gen_range(1_000..1_000_000u64);
        let buy = rng.gen_range(1_000..1_000_000u64);
        let id = book.create(ALICE, sell, GOLD, buy, USD, i as u64);
        book.insert_sorted(id, None).expect("fresh offer ranks");
    }
    book
}

/// Market with `depth` one-GOLD offers resting at a 2.0 ask
fn seeded_market(depth: u64) -> Market<MemoryLedger, SingleAdmin> {
    let mut ledger = MemoryLedger::new();
    ledger.deposit(GOLD, ALICE, (depth + 1) * SCALE);
    ledger.deposit(USD, BOB, 10_000 * SCALE);

    let mut market = Market::new(ledger, SingleAdmin::new(ADMIN), ESCROW);
    for _ in 0..depth {
        let rested = market
            .offer_at(ALICE, SCALE, GOLD, 2 * SCALE, USD, None)
            .expect("maker offer rests");
        assert!(rested.is_some());
    }
    market
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");

    for depth in [100usize, 1_000] {
        let book = seeded_book(depth);
        // Mid-book probe price
        let probe = Offer::new(0, BOB, 500_000, GOLD, 500_000, USD, 0);

        group.bench_function(format!("scan_depth_{}", depth), |b| {
            b.iter(|| black_box(book.locate(black_box(&probe), None)))
        });

        // A neighbor hint turns the scan into a local walk
        let hint = book.locate(&probe, None);
        group.bench_function(format!("hint_depth_{}", depth), |b| {
            b.iter(|| black_box(book.locate(black_box(&probe), hint)))
        });
    }

    group.finish();
}

fn bench_crossing_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("crossing");
    group.sample_size(20);

    for depth in [10u64, 100] {
        group.bench_function(format!("sweep_depth_{}", depth), |b| {
            b.iter_batched(
                || seeded_market(depth),
                |mut market| {
                    // Crosses every resting offer, then rests the residual
                    let residual = market
                        .offer_at(BOB, 4 * depth * SCALE, USD, 2 * depth * SCALE, GOLD, None)
                        .expect("sweep matches");
                    black_box(residual);
                    market
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_locate, bench_crossing_walk);
criterion_main!(benches);

//! Book registry benchmarks (Criterion).
//!
//! Run: `cargo bench` or `cargo bench --bench engine`.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use ladder_exchange::market_data_gen::{replay_into_registry, Generator, GeneratorConfig};
use ladder_exchange::{BookRegistry, OrderId};
use rust_decimal::Decimal;

fn registry() -> BookRegistry {
    let mut registry = BookRegistry::new();
    registry
        .add_symbol("AAPL", Decimal::from(1000), Decimal::new(1, 2))
        .unwrap();
    registry
}

/// Registry with `n` replayed orders and the ids of those still resting.
fn seeded(seed: u64, n: usize) -> (BookRegistry, Vec<OrderId>) {
    let mut registry = registry();
    let orders = Generator::new(GeneratorConfig {
        seed,
        num_orders: n,
        ..Default::default()
    })
    .all_orders();
    replay_into_registry(&mut registry, orders).unwrap();
    let resting = (1..=n as u64)
        .map(OrderId)
        .filter(|id| registry.get_order(*id).is_some())
        .collect();
    (registry, resting)
}

fn bench_add_order_throughput(c: &mut Criterion) {
    const N: usize = 1000;
    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(N as u64));
    group.bench_function("add_order_1000", |b| {
        b.iter_batched(
            || {
                let orders = Generator::new(GeneratorConfig {
                    seed: 42,
                    num_orders: N,
                    ..Default::default()
                })
                .all_orders();
                (registry(), orders)
            },
            |(mut registry, orders)| {
                for order in orders {
                    registry.submit(order).unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_cancel_order(c: &mut Criterion) {
    const RESTING: usize = 500;
    const CANCELS_PER_ITER: usize = 100;
    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(CANCELS_PER_ITER as u64));
    group.bench_function("cancel_order_100_after_500", |b| {
        b.iter_batched(
            || {
                let (registry, mut resting) = seeded(123, RESTING);
                resting.truncate(CANCELS_PER_ITER);
                (registry, resting)
            },
            |(mut registry, ids)| {
                for id in ids {
                    registry.cancel_order("AAPL", id).unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_edit_order(c: &mut Criterion) {
    const RESTING: usize = 200;
    const EDITS: usize = 50;
    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(EDITS as u64));
    group.bench_function("edit_order_50_after_200", |b| {
        b.iter_batched(
            || {
                let (registry, mut resting) = seeded(456, RESTING);
                resting.truncate(EDITS);
                (registry, resting)
            },
            |(mut registry, ids)| {
                for id in ids {
                    let volume = registry.get_order(id).map(|o| o.volume / 2).unwrap_or(0);
                    registry.edit_order("AAPL", id, volume).unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_add_order_throughput, bench_cancel_order, bench_edit_order);
criterion_main!(benches);

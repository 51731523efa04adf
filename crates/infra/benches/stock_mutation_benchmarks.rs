use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use partstock_catalog::{NewSparepart, NewWarehouse, Sparepart, Warehouse};
use partstock_infra::{
    BalanceMutator, InMemoryLedgerStore, InMemoryRegistry, MovementRequest, MutationPolicy,
    SparepartRegistry, WarehouseRegistry,
};
use partstock_stock::StockPair;
use tokio::runtime::Runtime;

type Mutator = BalanceMutator<
    InMemoryLedgerStore,
    Arc<InMemoryRegistry<Warehouse>>,
    Arc<InMemoryRegistry<Sparepart>>,
>;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

/// A mutator with `pairs` registered pairs (one warehouse per pair, one shared part).
fn setup(rt: &Runtime, pairs: usize) -> (Arc<Mutator>, Vec<StockPair>) {
    rt.block_on(async {
        let warehouses = Arc::new(InMemoryRegistry::<Warehouse>::new());
        let spareparts = Arc::new(InMemoryRegistry::<Sparepart>::new());
        let part = spareparts
            .register_sparepart(NewSparepart::new("Bench Part", "BENCH-1").unwrap())
            .await
            .unwrap();

        let mut keys = Vec::with_capacity(pairs);
        for i in 0..pairs {
            let wh = warehouses
                .register_warehouse(
                    NewWarehouse::new(&format!("Bench {i}"), &format!("WH-{i}")).unwrap(),
                )
                .await
                .unwrap();
            keys.push(StockPair::new(wh.id, part.id));
        }

        let mutator = BalanceMutator::new(
            InMemoryLedgerStore::new(),
            warehouses,
            spareparts,
            MutationPolicy::default(),
        );
        (Arc::new(mutator), keys)
    })
}

fn request(pair: StockPair, quantity: i64) -> MovementRequest {
    MovementRequest::new(pair.warehouse_id, pair.sparepart_id, quantity)
}

fn bench_single_movement_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_movement_latency");
    let rt = runtime();

    group.bench_function("credit", |b| {
        let (mutator, pairs) = setup(&rt, 1);
        b.iter(|| {
            rt.block_on(mutator.credit(request(pairs[0], black_box(1))))
                .unwrap();
        });
    });

    group.bench_function("credit_then_debit", |b| {
        let (mutator, pairs) = setup(&rt, 1);
        b.iter(|| {
            rt.block_on(async {
                mutator.credit(request(pairs[0], 5)).await.unwrap();
                mutator.debit(request(pairs[0], black_box(5))).await.unwrap();
            });
        });
    });

    group.finish();
}

/// Same number of concurrent movements spread over 1 pair (fully serialized)
/// versus many pairs (independent).
fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_credits");
    let rt = runtime();
    const OPS: usize = 64;
    group.throughput(Throughput::Elements(OPS as u64));

    for pairs in [1_usize, 8, 64] {
        group.bench_with_input(BenchmarkId::new("pairs", pairs), &pairs, |b, &pairs| {
            let (mutator, keys) = setup(&rt, pairs);
            b.iter(|| {
                rt.block_on(async {
                    let handles: Vec<_> = (0..OPS)
                        .map(|i| {
                            let mutator = Arc::clone(&mutator);
                            let pair = keys[i % keys.len()];
                            tokio::spawn(async move { mutator.credit(request(pair, 1)).await })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap().unwrap();
                    }
                });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_movement_latency, bench_contention);
criterion_main!(benches);
